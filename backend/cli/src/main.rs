mod config;
mod plugins_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{error, info};

use plugsmith_config::{config_file_path, write_config, PlugsmithConfig, CONFIG_FILE_NAME};
use plugsmith_logging::{init_logger, init_stderr_logger};
use plugsmith_plugins::{serve, PluginService};

use plugins_cmd::PluginCommands;
use terminal_output::{note_error, note_success, note_warn};

#[derive(Parser)]
#[command(name = "plugsmith")]
#[command(about = "Plugsmith: scaffold and register workspace plugins")]
#[command(version)]
struct Cli {
    /// Config file (default: ./plugsmith.yaml, then ~/.plugsmith/plugsmith.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root (overrides config and PLUGSMITH_WORKSPACE)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default plugsmith.yaml into the workspace
    Init,
    /// Serve the JSON line protocol on stdin/stdout
    Serve,
    #[command(flatten)]
    Plugins(PluginCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    if let Commands::Init = cli.command {
        return init_workspace(cli.workspace).await;
    }

    let config = config::resolve(cli.config.as_deref(), cli.workspace.as_deref()).await?;
    let level = config::log_level(&config).to_string();
    match &cli.command {
        Commands::Serve => init_stderr_logger(&level),
        _ => init_logger(config::log_dir(&config).as_deref(), &level),
    }

    let service = PluginService::from_config(&config)?;
    info!(root = %service.layout().root.display(), "Workspace resolved");

    match cli.command {
        Commands::Init => Ok(true),
        Commands::Serve => {
            let stdin = BufReader::new(tokio::io::stdin());
            serve(&service, stdin, tokio::io::stdout()).await?;
            Ok(true)
        }
        Commands::Plugins(cmd) => plugins_cmd::run(&service, cmd).await,
    }
}

async fn init_workspace(workspace: Option<PathBuf>) -> Result<bool> {
    let root = match workspace {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let path = config_file_path(&root);
    if path.exists() {
        note_warn(&format!("{} already exists; leaving it alone", path.display()));
        return Ok(true);
    }
    let config = plugsmith_config::apply_all_defaults(PlugsmithConfig::default());
    write_config(&config, &path).await?;
    note_success(&format!("Wrote {CONFIG_FILE_NAME} to {}", root.display()));
    Ok(true)
}
