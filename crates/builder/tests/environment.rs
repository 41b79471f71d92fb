//! Environment assembly: base configuration, board augmentation and the
//! final assembler-flag copy, end to end.

use board::BoardConfig;
use builder::board_flags::{augment, MathLibrary};
use builder::configure::{configure, finalize};
use builder::env::Define;
use proptest::prelude::*;
use std::path::Path;

fn board(variant: &str) -> BoardConfig {
    let json = board_json(variant);
    BoardConfig::from_json(&json).unwrap()
}

fn board_json(variant: &str) -> String {
    format!(
        r#"{{
            "name": "test",
            "build": {{ "cpu": "cortex-m4", "family": "XMC4700", "variant": "{variant}", "f_cpu": "144000000L" }},
            "debug": {{ "jlink_device": "XMC4700-2048" }}
        }}"#
    )
}

#[test]
fn without_board_no_board_flags_appear() {
    let mut env = configure("build", "framework-arduinoxmc");
    finalize(&mut env);

    let all_flags: Vec<&String> = env
        .flags
        .cc
        .iter()
        .chain(&env.flags.link)
        .chain(&env.flags.asm)
        .collect();
    assert!(!all_flags.iter().any(|f| f.starts_with("-mcpu=")));
    assert!(!all_flags.iter().any(|f| f.starts_with("-T")));
    assert!(env.defines.is_empty());
    assert!(env.size_print.is_none());
}

#[test]
fn assembler_receives_board_cpu_flag_after_finalize() {
    let mut env = configure("build", "framework-arduinoxmc");
    augment(&mut env, &board("XMC4700")).unwrap();
    finalize(&mut env);
    assert!(env.flags.asm.contains(&"-mcpu=cortex-m4".to_string()));
    assert!(env.flags.asm.starts_with(&[
        "-c".to_string(),
        "-g".to_string(),
        "-w".to_string(),
        "-x".to_string(),
        "assembler-with-cpp".to_string(),
        "-mthumb".to_string(),
    ]));
}

#[test]
fn compile_command_carries_board_defines() {
    let mut env = configure("build", "framework-arduinoxmc");
    augment(&mut env, &board("XMC4700")).unwrap();
    finalize(&mut env);
    let cmd = env.compile_c(Path::new("src/main.c"), Path::new("build/obj/main.o"));
    assert_eq!(cmd.program, "arm-none-eabi-gcc");
    for define in ["-DXMC4700", "-DARM_MATH_CM4", "-DARM_MATH_DSP", "-D_INIT_DECLARATION_REQUIRED"] {
        assert!(cmd.args.iter().any(|a| a == define), "missing {define}");
    }
}

proptest! {
    /// The 4th character from the end alone decides the math library.
    #[test]
    fn fourth_from_last_character_selects_math(
        head in "[A-Z]{0,6}",
        pick in "[0-9A-Za-z]",
        tail in "[0-9]{3}",
    ) {
        let variant = format!("{head}{pick}{tail}");
        let mut env = configure("build", "pkg");
        let math = augment(&mut env, &board(&variant)).unwrap();
        let defines: Vec<String> = env.defines.iter().map(Define::to_flag).collect();

        if pick == "4" {
            prop_assert_eq!(math, MathLibrary::CortexM4);
            prop_assert!(defines.contains(&"-DARM_MATH_CM4".to_string()));
            prop_assert!(defines.contains(&"-DARM_MATH_DSP".to_string()));
        } else {
            prop_assert_eq!(math, MathLibrary::CortexM0);
            prop_assert!(defines.contains(&"-DARM_MATH_CM0".to_string()));
            prop_assert!(!defines.iter().any(|d| d.contains("DSP")));
        }
    }

    /// Variants shorter than four characters are rejected, never indexed.
    #[test]
    fn short_variants_fail_closed(variant in "[A-Z0-9]{0,3}") {
        let mut env = configure("build", "pkg");
        prop_assert!(augment(&mut env, &board(&variant)).is_err());
        prop_assert!(env.defines.is_empty());
    }
}
