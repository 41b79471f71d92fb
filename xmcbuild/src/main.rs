// Binary crate; its items are not a public API.
#![allow(missing_docs)]

mod boards;
mod build;
mod config;
mod exec;
mod project;
mod run;
mod script;
mod size;
mod upload;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{Overrides, ProjectConfig, PROJECT_FILE};
use project::Project;

#[derive(Parser)]
#[command(name = "xmcbuild")]
#[command(about = "Build, size and upload firmware for Infineon XMC boards", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Project file [default: ./xmcbuild.toml]
    #[arg(long, global = true)]
    project: Option<PathBuf>,
    /// Board identifier (a manifest in the boards directory)
    #[arg(long, global = true, env = "XMCBUILD_BOARD")]
    board: Option<String>,
    /// Serial port or `net:` address to upload through
    #[arg(long, global = true, env = "XMCBUILD_UPLOAD_PORT")]
    upload_port: Option<String>,
    /// Upload protocol (`jlink`, or a serial protocol)
    #[arg(long, global = true)]
    upload_protocol: Option<String>,
    /// Serial upload baud rate
    #[arg(long, global = true)]
    upload_speed: Option<u32>,
    /// Additional target name; repeatable. `program` skips upload preparation.
    #[arg(short = 't', long = "target", global = true)]
    targets: Vec<String>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the requested targets (hex and size by default)
    Build,
    /// Build the firmware and print flash/RAM usage
    Size,
    /// Build the hex image and flash it to the board
    Upload,
    /// List known boards
    Boards,
    /// Regenerate the J-Link commander script only
    Script,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "xmcbuild=debug,builder=debug,board=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(global: &GlobalArgs) -> Result<ProjectConfig> {
    let explicit = global.project.is_some();
    let path = global
        .project
        .clone()
        .unwrap_or_else(|| PathBuf::from(PROJECT_FILE));
    let mut config = ProjectConfig::load(&path, explicit)?;
    config.apply(Overrides {
        board: global.board.clone(),
        upload_port: global.upload_port.clone(),
        upload_protocol: global.upload_protocol.clone(),
        upload_speed: global.upload_speed,
    });
    Ok(config)
}

/// Requested target names: the subcommand's own target, then `-t` extras.
fn target_names(command: &Commands, extra: &[String]) -> Vec<String> {
    let own = match command {
        Commands::Size => Some("size"),
        Commands::Upload => Some("upload"),
        Commands::Build | Commands::Boards | Commands::Script => None,
    };
    own.map(str::to_owned)
        .into_iter()
        .chain(extra.iter().cloned())
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let config = load_config(&cli.global)?;
    match cli.command {
        Commands::Boards => boards::run(&config.boards_dir),
        Commands::Script => script::run(&mut Project::assemble(config)?),
        ref command => {
            let names = target_names(command, &cli.global.targets);
            run::run(&mut Project::assemble(config)?, &names)
        }
    }
}
