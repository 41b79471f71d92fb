//! Base environment for the `arm-none-eabi` GCC toolchain.

use std::path::PathBuf;

use crate::env::{BuildEnv, Flags, Toolchain};

/// Compiler-driver prefix shared by every tool.
pub const TOOLCHAIN_PREFIX: &str = "arm-none-eabi-";

/// Executable suffix of the linked program.
pub const PROG_SUFFIX: &str = ".elf";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

impl Toolchain {
    /// The `arm-none-eabi-*` binaries.
    pub fn arm_none_eabi() -> Self {
        let tool = |name: &str| format!("{TOOLCHAIN_PREFIX}{name}");
        Self {
            ar: tool("ar"),
            asm: tool("as"),
            cc: tool("gcc"),
            cxx: tool("g++"),
            gdb: tool("gdb"),
            objcopy: tool("objcopy"),
            ranlib: tool("gcc-ranlib"),
            size: tool("size"),
        }
    }
}

/// Build the board-independent environment.
///
/// The link map lands at `<build_dir>/hi.map`.
pub fn configure(build_dir: impl Into<PathBuf>, framework_dir: impl Into<PathBuf>) -> BuildEnv {
    let mut env = BuildEnv {
        toolchain: Toolchain::arm_none_eabi(),
        build_dir: build_dir.into(),
        framework_dir: framework_dir.into(),
        prog_suffix: PROG_SUFFIX.to_owned(),
        libs: strings(&["m", "gcc", "c", "stdc++"]),
        ..BuildEnv::default()
    };

    env.flags = Flags {
        ar: strings(&["rcs"]),
        asm: strings(&["-c", "-g", "-w", "-x", "assembler-with-cpp", "-mthumb"]),
        c: strings(&["-MMD"]),
        cc: strings(&[
            "-Os", // optimize for size
            "-c",
            "-g",
            "-w", // disables compiler warnings
            "-nostdlib",
            "-Wall",
            "-ffunction-sections", // one section per function, for --gc-sections
            "-fdata-sections",
            "-mthumb",
        ]),
        cxx: strings(&[
            "-fno-exceptions",
            "-fno-threadsafe-statics",
            "-fpermissive",
            "-mthumb",
        ]),
        link: strings(&[
            "-Os",
            "-nostartfiles",
            "-nostdlib",
            "-Wl,--gc-sections",
            "-mthumb",
            "--specs=nano.specs",
            "--specs=nosys.specs",
        ]),
    };
    let map = format!("-Wl,-Map,{}", env.map_file().display());
    env.flags.link.push(map);

    tracing::debug!(build_dir = %env.build_dir.display(), "configured arm-none-eabi environment");
    env
}

/// Last configuration step: the assembler also receives the common C/C++
/// flags, including any CPU flags a board added.
pub fn finalize(env: &mut BuildEnv) {
    let common = env.flags.cc.clone();
    env.flags.asm.extend(common);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn toolchain_names_are_prefixed() {
        let env = configure("build", "pkg");
        assert_eq!(env.toolchain.cc, "arm-none-eabi-gcc");
        assert_eq!(env.toolchain.cxx, "arm-none-eabi-g++");
        assert_eq!(env.toolchain.ranlib, "arm-none-eabi-gcc-ranlib");
        assert_eq!(env.toolchain.size, "arm-none-eabi-size");
        assert_eq!(env.toolchain.objcopy, "arm-none-eabi-objcopy");
    }

    #[test]
    fn link_flags_end_with_map_file() {
        let env = configure(Path::new("out").join("xmc"), "pkg");
        let last = env.flags.link.last().unwrap();
        assert_eq!(*last, format!("-Wl,-Map,{}", Path::new("out").join("xmc").join("hi.map").display()));
        assert!(env.flags.link.contains(&"--specs=nano.specs".to_string()));
    }

    #[test]
    fn base_environment_has_no_board_defines() {
        let env = configure("build", "pkg");
        assert!(env.defines.is_empty());
        assert!(env.size_print.is_none());
        assert_eq!(env.libs, vec!["m", "gcc", "c", "stdc++"]);
        assert_eq!(env.prog_suffix, ".elf");
    }

    #[test]
    fn finalize_appends_common_flags_to_assembler() {
        let mut env = configure("build", "pkg");
        let asm_before = env.flags.asm.len();
        env.flags.cc.push("-mcpu=cortex-m0".into());
        finalize(&mut env);
        assert_eq!(env.flags.asm.len(), asm_before + env.flags.cc.len());
        assert_eq!(env.flags.asm.last().map(String::as_str), Some("-mcpu=cortex-m0"));
    }
}
