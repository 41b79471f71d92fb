//! A loaded project: configuration, board and the assembled build environment.

use anyhow::{Context, Result};
use board::{BoardConfig, BoardRegistry};
use builder::{board_flags, configure, BuildEnv, UploadContext};

use crate::config::{ProjectConfig, DEFAULT_PROTOCOL};

pub struct Project {
    pub config: ProjectConfig,
    pub board_id: Option<String>,
    pub board: Option<BoardConfig>,
    pub env: BuildEnv,
}

impl Project {
    /// Resolve the board and assemble the environment.
    pub fn assemble(config: ProjectConfig) -> Result<Self> {
        let mut env = configure::configure(config.build_dir(), &config.framework_dir);

        let board = match &config.board {
            Some(id) => {
                let registry = BoardRegistry::open(&config.boards_dir).with_context(|| {
                    format!("Failed to load boards from {}", config.boards_dir.display())
                })?;
                let board = registry.get(id)?.clone();
                board_flags::augment(&mut env, &board)
                    .with_context(|| format!("Board `{id}` cannot be built"))?;
                Some(board)
            }
            None => None,
        };
        configure::finalize(&mut env);

        let board_upload = board.as_ref().map(|b| &b.upload);
        env.upload.protocol = config
            .upload
            .protocol
            .clone()
            .or_else(|| board_upload.and_then(|u| u.protocol.clone()))
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_owned());
        env.upload.speed = config
            .upload
            .speed
            .or_else(|| board_upload.and_then(|u| u.speed));
        env.upload.port = config.upload.port.clone();

        Ok(Self {
            board_id: config.board.clone(),
            config,
            board,
            env,
        })
    }

    /// Whether uploads go through the J-Link debug probe.
    pub fn uses_jlink(&self) -> bool {
        self.env.upload.protocol == DEFAULT_PROTOCOL
    }

    /// Inputs for upload preparation.
    pub fn upload_context(&self, requested_targets: &[String]) -> UploadContext {
        UploadContext {
            requested_targets: requested_targets.to_vec(),
            board_id: self.board_id.clone(),
            options: self.board.as_ref().map(|b| b.upload.clone()),
            protocol: self.env.upload.protocol.clone(),
            speed: self.env.upload.speed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("boards")).unwrap();
        fs::write(
            tmp.path().join("boards").join("xmc1100_xmc2go.json"),
            r#"{
                "name": "XMC1100 XMC2Go",
                "build": { "cpu": "cortex-m0", "family": "XMC1100", "variant": "XMC1100", "f_cpu": "32000000L" },
                "debug": { "jlink_device": "XMC1100-0064" },
                "upload": { "maximum_size": 65536, "speed": 115200 }
            }"#,
        )
        .unwrap();
        tmp
    }

    #[test]
    fn board_settings_feed_environment_and_upload() {
        let tmp = project_dir();
        let config =
            ProjectConfig::parse("board = \"xmc1100_xmc2go\"\n", tmp.path()).unwrap();
        let project = Project::assemble(config).unwrap();

        assert!(project.env.flags.cc.contains(&"-mcpu=cortex-m0".to_string()));
        assert!(project.uses_jlink());
        assert_eq!(project.env.upload.speed, Some(115_200));

        let ctx = project.upload_context(&["upload".into()]);
        assert_eq!(ctx.board_id.as_deref(), Some("xmc1100_xmc2go"));
        assert_eq!(ctx.options.unwrap().maximum_size, Some(65_536));
    }

    #[test]
    fn project_protocol_overrides_board() {
        let tmp = project_dir();
        let config = ProjectConfig::parse(
            "board = \"xmc1100_xmc2go\"\n[upload]\nprotocol = \"serial\"\nspeed = 9600\n",
            tmp.path(),
        )
        .unwrap();
        let project = Project::assemble(config).unwrap();
        assert!(!project.uses_jlink());
        assert_eq!(project.env.upload.speed, Some(9_600));
    }

    #[test]
    fn no_board_leaves_board_flags_out() {
        let project = Project::assemble(ProjectConfig::default()).unwrap();
        assert!(project.board.is_none());
        assert!(project.env.defines.is_empty());
        assert_eq!(project.upload_context(&[]).options, None);
        assert_eq!(project.env.build_dir, Path::new(".xmcbuild").join("default"));
    }

    #[test]
    fn unknown_board_is_reported() {
        let tmp = project_dir();
        let config = ProjectConfig::parse("board = \"uno\"\n", tmp.path()).unwrap();
        let err = Project::assemble(config).err().unwrap();
        assert!(format!("{err:#}").contains("unknown board `uno`"));
    }
}
