//! Project file (`xmcbuild.toml`) and command-line overrides.
//!
//! ```toml
//! board = "xmc4700_relax_kit"
//! boards_dir = "boards"
//! framework_dir = "framework-arduinoxmc"
//! sources = ["src/main.cpp", "src/startup.S"]
//!
//! [upload]
//! protocol = "jlink"
//! port = "/dev/ttyACM0"
//! port_wait_timeout_ms = 5000
//! ```
//!
//! Relative paths are resolved against the directory holding the project file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default project file name.
pub const PROJECT_FILE: &str = "xmcbuild.toml";

/// Protocol used when neither the project nor the board names one.
pub const DEFAULT_PROTOCOL: &str = "jlink";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default = "default_boards_dir")]
    pub boards_dir: PathBuf,
    #[serde(default = "default_framework_dir")]
    pub framework_dir: PathBuf,
    /// Defaults to `.xmcbuild/<board>`.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub upload: UploadConfig,
    /// Directory holding the project file.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub speed: Option<u32>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub port_wait_timeout_ms: Option<u64>,
    /// Serial uploader (avrdude-compatible flags) for non-J-Link protocols.
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub uploader_flags: Vec<String>,
}

fn default_boards_dir() -> PathBuf {
    PathBuf::from("boards")
}

fn default_framework_dir() -> PathBuf {
    PathBuf::from("framework-arduinoxmc")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            board: None,
            boards_dir: default_boards_dir(),
            framework_dir: default_framework_dir(),
            build_dir: None,
            sources: Vec::new(),
            upload: UploadConfig::default(),
            root: PathBuf::new(),
        }
    }
}

/// Values given on the command line; each wins over the project file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub board: Option<String>,
    pub upload_port: Option<String>,
    pub upload_protocol: Option<String>,
    pub upload_speed: Option<u32>,
}

impl ProjectConfig {
    /// Parse TOML text; relative paths are resolved against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text).context("invalid project file")?;
        config.resolve(base);
        Ok(config)
    }

    /// Load `path`. A missing file is only an error when it was asked for
    /// explicitly; otherwise the defaults are used.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no project file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base)
            .with_context(|| format!("Failed to load {}", path.display()))
    }

    fn resolve(&mut self, base: &Path) {
        self.root = base.to_path_buf();
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.boards_dir);
        join(&mut self.framework_dir);
        if let Some(dir) = self.build_dir.as_mut() {
            join(dir);
        }
        self.sources.iter_mut().for_each(join);
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.board.is_some() {
            self.board = overrides.board;
        }
        if overrides.upload_port.is_some() {
            self.upload.port = overrides.upload_port;
        }
        if overrides.upload_protocol.is_some() {
            self.upload.protocol = overrides.upload_protocol;
        }
        if overrides.upload_speed.is_some() {
            self.upload.speed = overrides.upload_speed;
        }
    }

    /// Build directory, `<root>/.xmcbuild/<board>` unless configured.
    pub fn build_dir(&self) -> PathBuf {
        match &self.build_dir {
            Some(dir) => dir.clone(),
            None => self
                .root
                .join(".xmcbuild")
                .join(self.board.as_deref().unwrap_or("default")),
        }
    }

    /// Bound on waiting for a re-enumerated upload port.
    pub fn port_wait(&self) -> Duration {
        self.upload
            .port_wait_timeout_ms
            .map_or(builder::serial::DEFAULT_PORT_WAIT, Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_full_project_and_resolves_paths() {
        let text = r#"
            board = "xmc1100_xmc2go"
            sources = ["src/main.c"]

            [upload]
            protocol = "serial"
            speed = 57600
            port_wait_timeout_ms = 2000
        "#;
        let config = ProjectConfig::parse(text, Path::new("/work/app")).unwrap();
        assert_eq!(config.board.as_deref(), Some("xmc1100_xmc2go"));
        assert_eq!(config.boards_dir, Path::new("/work/app/boards"));
        assert_eq!(config.sources, vec![PathBuf::from("/work/app/src/main.c")]);
        assert_eq!(config.upload.speed, Some(57_600));
        assert_eq!(config.port_wait(), Duration::from_secs(2));
        assert_eq!(config.build_dir(), Path::new("/work/app/.xmcbuild/xmc1100_xmc2go"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ProjectConfig::parse("bord = \"typo\"", Path::new("")).unwrap_err();
        assert!(format!("{err:#}").contains("bord"));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = ProjectConfig::parse(
            "board = \"a\"\n[upload]\nport = \"COM1\"\n",
            Path::new(""),
        )
        .unwrap();
        config.apply(Overrides {
            board: Some("b".into()),
            upload_port: None,
            upload_protocol: Some("serial".into()),
            upload_speed: Some(115_200),
        });
        assert_eq!(config.board.as_deref(), Some("b"));
        assert_eq!(config.upload.port.as_deref(), Some("COM1"));
        assert_eq!(config.upload.protocol.as_deref(), Some("serial"));
        assert_eq!(config.upload.speed, Some(115_200));
    }

    #[test]
    fn missing_default_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = ProjectConfig::load(&tmp.path().join(PROJECT_FILE), false).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(ProjectConfig::load(&tmp.path().join(PROJECT_FILE), true).is_err());
        assert_eq!(config.port_wait(), Duration::from_secs(5));
    }
}
