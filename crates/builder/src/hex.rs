//! ELF → Intel HEX conversion rule.

use std::path::{Path, PathBuf};

use crate::command::ToolCommand;
use crate::env::BuildEnv;

/// Named conversion rule, `objcopy -O ihex <elf> <hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexRule {
    /// Output suffix, `.hex`.
    pub suffix: &'static str,
}

impl Default for HexRule {
    fn default() -> Self {
        Self::HEX
    }
}

impl HexRule {
    /// The only rule this build registers.
    pub const HEX: Self = Self { suffix: ".hex" };

    /// Output path for `stem` inside `build_dir`.
    pub fn target(&self, build_dir: &Path, stem: &str) -> PathBuf {
        build_dir.join(format!("{stem}{}", self.suffix))
    }

    /// The conversion command.
    pub fn command(&self, env: &BuildEnv, elf: &Path, hex: &Path) -> ToolCommand {
        ToolCommand::new(&env.toolchain.objcopy)
            .args(["-O", "ihex"])
            .path(elf)
            .path(hex)
    }

    /// Progress line printed before the conversion runs.
    pub fn describe(&self, hex: &Path) -> String {
        format!("Building {}", hex.display())
    }
}
