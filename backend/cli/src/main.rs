mod bundle_cmd;
mod config_cmd;
mod dev_cmd;
mod manifest_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use braindrive_config::{config_dir, config_file_path, load_and_prepare, KitConfig};
use braindrive_logging::init_logger;

#[derive(Parser)]
#[command(name = "braindrive")]
#[command(about = "BrainDrive plugin kit: dev harness and packaging checks")]
#[command(version)]
struct Cli {
    /// Config file (default: $BRAINDRIVE_CONFIG_DIR/plugin-kit.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the plugin against mock host services and print what it renders
    Dev {
        /// Run without the API capability (local sample data)
        #[arg(long)]
        no_api: bool,
        /// Fail this many initial data requests
        #[arg(long)]
        fail_first: Option<usize>,
    },
    /// Plugin manifest tools
    Manifest {
        #[command(subcommand)]
        command: ManifestCommand,
    },
    /// Check that a package manager is available and the bundle was built
    CheckBundle {
        /// Build output directory
        #[arg(long)]
        dist: Option<PathBuf>,
        /// Entry bundle file name
        #[arg(long)]
        entry: Option<String>,
    },
    /// Kit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ManifestCommand {
    /// Validate a manifest and list every problem
    Validate { path: Option<PathBuf> },
    /// Write the template manifest
    Init {
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    /// Print the module-federation exposes map
    Exposes { path: Option<PathBuf> },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective config (defaults and env applied)
    Show,
    /// Validate the effective config
    Check,
    /// Print the config file location
    Path,
    /// Apply a JSON merge patch to the config file
    Set { patch: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&config_path).await?;

    let logging = config.logging.clone().unwrap_or_default();
    let level = logging.level.as_deref().unwrap_or("info");
    // Only the dev harness writes a log file.
    let log_dir = match cli.command {
        Commands::Dev { .. } => Some(PathBuf::from(logging.dir.as_deref().unwrap_or("logs"))),
        _ => None,
    };
    init_logger(log_dir.as_deref(), level);
    debug!(path = %config_path.display(), "Config loaded");

    match cli.command {
        Commands::Dev { no_api, fail_first } => {
            dev_cmd::run(&config, dev_cmd::DevOptions { no_api, fail_first }).await?
        }
        Commands::Manifest { command } => {
            let default_path = manifest_path(&config);
            match command {
                ManifestCommand::Validate { path } => manifest_cmd::validate(&path.unwrap_or(default_path))?,
                ManifestCommand::Init { path, force } => {
                    manifest_cmd::init(&path.unwrap_or(default_path), force)?
                }
                ManifestCommand::Exposes { path } => manifest_cmd::exposes(&path.unwrap_or(default_path))?,
            }
        }
        Commands::CheckBundle { dist, entry } => bundle_cmd::run(&config, dist, entry)?,
        Commands::Config { command } => match command {
            ConfigCommand::Show => config_cmd::show(&config)?,
            ConfigCommand::Check => config_cmd::check(&config)?,
            ConfigCommand::Path => println!("{}", config_path.display()),
            ConfigCommand::Set { patch } => config_cmd::set(&config_path, &patch).await?,
        },
    }

    Ok(())
}

fn manifest_path(config: &KitConfig) -> PathBuf {
    config
        .plugin
        .as_ref()
        .and_then(|p| p.manifest_path.as_deref())
        .map(Path::new)
        .unwrap_or_else(|| Path::new("plugin.json"))
        .to_path_buf()
}
