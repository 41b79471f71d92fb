use anyhow::{Context, Result};
use builder::{execute, jlink, prepare, SysfsGpio, SystemPorts, ToolCommand};
use colored::Colorize;
use std::path::Path;
use std::time::Instant;

use crate::exec;
use crate::project::Project;

/// Flash `hex` to the board.
///
/// J-Link uploads go straight to the commander with the generated script.
/// Serial uploaders get the prepared flags (speed, extra flags, `-D`,
/// `-P <port>`) after the board has been reset into its bootloader.
pub fn run(project: &mut Project, hex: &Path, requested: &[String]) -> Result<()> {
    println!();
    println!("{}", format!("📡 Uploading {}", hex.display()).cyan().bold());

    let start = Instant::now();
    let cmd = if project.uses_jlink() {
        jlink_command(project, hex)?
    } else {
        serial_command(project, hex, requested)?
    };

    exec::stream(&cmd, "Upload")?;

    println!(
        "{}",
        format!("✓ Upload complete in {:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

fn jlink_command(project: &mut Project, hex: &Path) -> Result<ToolCommand> {
    let board = project
        .board
        .as_ref()
        .context("J-Link upload needs a board; pass --board or set `board` in xmcbuild.toml")?;
    let device = jlink::device(board)?;
    let flags = jlink::uploader_flags(device);

    let script = match project.env.upload.jlink_script.clone() {
        Some(script) => script,
        None => {
            let script = jlink::write_script(&project.env.build_dir, hex)?;
            project.env.upload.jlink_script = Some(script.clone());
            script
        }
    };
    Ok(jlink::upload_command(jlink::uploader_name(), &flags, &script))
}

fn serial_command(project: &mut Project, hex: &Path, requested: &[String]) -> Result<ToolCommand> {
    let uploader = project.config.upload.uploader.clone().with_context(|| {
        format!(
            "Protocol `{}` needs an uploader; set `upload.uploader` in xmcbuild.toml",
            project.env.upload.protocol
        )
    })?;

    let plan = prepare(&project.upload_context(requested));
    tracing::debug!(plan = ?plan, "upload plan");

    let mut ports = SystemPorts;
    let prepared = execute(
        plan,
        project.env.upload.port.as_deref(),
        &mut ports,
        &SysfsGpio::default(),
        project.config.port_wait(),
    )
    .context("Failed to prepare the board for upload")?;

    if let Some(port) = &prepared.port {
        println!("   {}", format!("Port: {port}").dimmed());
    }
    project.env.upload.port = prepared.port;

    Ok(serial_upload_command(
        &uploader,
        &project.config.upload.uploader_flags,
        &prepared.flags,
        hex,
    ))
}

/// `<uploader> <configured flags> <prepared flags> -U flash:w:<hex>:i`
fn serial_upload_command(
    uploader: &str,
    configured: &[String],
    prepared: &[String],
    hex: &Path,
) -> ToolCommand {
    ToolCommand::new(uploader)
        .args(configured.iter().cloned())
        .args(prepared.iter().cloned())
        .arg("-U")
        .arg(format!("flash:w:{}:i", hex.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn serial_command_orders_flags() {
        let cmd = serial_upload_command(
            "avrdude",
            &["-p".into(), "atmega328p".into()],
            &["-b".into(), "57600".into(), "-D".into(), "-P".into(), "/dev/ttyUSB0".into()],
            Path::new("build/firmware.hex"),
        );
        assert_eq!(cmd.program, "avrdude");
        assert_eq!(
            cmd.args,
            [
                "-p",
                "atmega328p",
                "-b",
                "57600",
                "-D",
                "-P",
                "/dev/ttyUSB0",
                "-U",
                "flash:w:build/firmware.hex:i"
            ]
        );
    }

    #[test]
    fn jlink_command_writes_script_once() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("boards")).unwrap();
        fs::write(
            tmp.path().join("boards").join("xmc4700_relax_kit.json"),
            r#"{
                "name": "XMC4700 Relax Kit",
                "build": { "cpu": "cortex-m4", "family": "XMC4700", "variant": "XMC4700" },
                "debug": { "jlink_device": "XMC4700-2048" }
            }"#,
        )
        .unwrap();
        let config = ProjectConfig::parse("board = \"xmc4700_relax_kit\"\n", tmp.path()).unwrap();
        let mut project = Project::assemble(config).unwrap();

        let hex = project.env.build_dir.join("firmware.hex");
        let cmd = jlink_command(&mut project, &hex).unwrap();
        let script = project.env.upload.jlink_script.clone().unwrap();

        assert!(script.exists());
        assert_eq!(cmd.args.get(1).map(String::as_str), Some("XMC4700-2048"));
        assert_eq!(cmd.args.last(), Some(&script.display().to_string()));
    }

    #[test]
    fn jlink_command_uses_script_from_settings() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("boards")).unwrap();
        fs::write(
            tmp.path().join("boards").join("xmc1100_xmc2go.json"),
            r#"{
                "build": { "cpu": "cortex-m0", "family": "XMC1100", "variant": "XMC1100" },
                "debug": { "jlink_device": "XMC1100-0064" }
            }"#,
        )
        .unwrap();
        let config = ProjectConfig::parse("board = \"xmc1100_xmc2go\"\n", tmp.path()).unwrap();
        let mut project = Project::assemble(config).unwrap();
        let custom = tmp.path().join("custom.jlink");
        project.env.upload.jlink_script = Some(custom.clone());

        let cmd = jlink_command(&mut project, Path::new("firmware.hex")).unwrap();
        assert_eq!(cmd.args.last(), Some(&custom.display().to_string()));
        assert!(!project.env.build_dir.join(jlink::SCRIPT_NAME).exists());
    }

    #[test]
    fn jlink_without_board_is_an_error() {
        let mut project = Project::assemble(ProjectConfig::default()).unwrap();
        let err = jlink_command(&mut project, Path::new("firmware.hex")).unwrap_err();
        assert!(err.to_string().contains("needs a board"));
    }

    #[test]
    fn serial_protocol_without_uploader_is_an_error() {
        let mut config = ProjectConfig::default();
        config.upload.protocol = Some("serial".into());
        let mut project = Project::assemble(config).unwrap();
        let err = serial_command(&mut project, Path::new("firmware.hex"), &[]).unwrap_err();
        assert!(err.to_string().contains("needs an uploader"));
    }
}
