//! CPU-specific flags, defines and linker script derived from a board manifest.

use std::path::PathBuf;

use board::BoardConfig;

use crate::env::{BuildEnv, Define};

/// Name of the linker script inside `variants/<family>/`.
pub const LINKER_SCRIPT: &str = "linker_script.ld";

/// CMSIS-DSP math library selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathLibrary {
    /// `ARM_MATH_CM0`, no DSP extension.
    CortexM0,
    /// `ARM_MATH_CM4` with `ARM_MATH_DSP`.
    CortexM4,
}

/// Board metadata that cannot drive the build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AugmentError {
    /// The variant must have at least four characters to select the math library.
    #[error("board variant `{variant}` is too short to select a CPU family")]
    VariantTooShort {
        /// The offending variant string.
        variant: String,
    },
}

impl MathLibrary {
    /// Select by the fourth character from the end of the variant
    /// (`XMC4700` → `4` → Cortex-M4).
    pub fn from_variant(variant: &str) -> Result<Self, AugmentError> {
        match variant.chars().rev().nth(3) {
            Some('4') => Ok(Self::CortexM4),
            Some(_) => Ok(Self::CortexM0),
            None => Err(AugmentError::VariantTooShort {
                variant: variant.to_owned(),
            }),
        }
    }

    /// `ARM_MATH_CM*` define.
    pub fn math_define(self) -> &'static str {
        match self {
            Self::CortexM0 => "ARM_MATH_CM0",
            Self::CortexM4 => "ARM_MATH_CM4",
        }
    }

    /// `ARM_MATH_DSP` when the core has the DSP extension.
    pub fn dsp_define(self) -> Option<&'static str> {
        match self {
            Self::CortexM0 => None,
            Self::CortexM4 => Some("ARM_MATH_DSP"),
        }
    }
}

/// Path of the board family's linker script under the framework package.
pub fn linker_script(env: &BuildEnv, board: &BoardConfig) -> PathBuf {
    env.framework_dir
        .join("variants")
        .join(&board.build.family)
        .join(LINKER_SCRIPT)
}

/// Append the board's CPU flags, defines, linker script and size command.
///
/// Nothing is written to `env` when the variant is rejected.
pub fn augment(env: &mut BuildEnv, board: &BoardConfig) -> Result<MathLibrary, AugmentError> {
    let math = MathLibrary::from_variant(&board.build.variant)?;
    let mcpu = format!("-mcpu={}", board.build.cpu);

    env.flags.cc.push(mcpu.clone());

    if let Some(f_cpu) = &board.build.f_cpu {
        env.defines.push(Define::value("F_CPU", f_cpu));
    }
    env.defines.push(Define::flag(&board.build.family));
    if let Some(dsp) = math.dsp_define() {
        env.defines.push(Define::flag(dsp));
    }
    env.defines.push(Define::flag(math.math_define()));
    env.defines.push(Define::flag("_INIT_DECLARATION_REQUIRED"));

    let script = linker_script(env, board);
    env.flags.link.push(mcpu);
    env.flags.link.push(format!("-T{}", script.display()));

    env.size_print = Some(vec![
        env.toolchain.size.clone(),
        "-B".to_owned(),
        "-d".to_owned(),
    ]);

    tracing::debug!(
        family = %board.build.family,
        cpu = %board.build.cpu,
        math = math.math_define(),
        "applied board flags"
    );
    Ok(math)
}
