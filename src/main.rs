//! CloudNet Update Server
//!
//! Usage:
//! - Run the server: `cloudnet-update-server` or `cloudnet-update-server serve --port 8080`
//! - Install the latest release of a parent once: `cloudnet-update-server install v3`
//! - List registered versions: `cloudnet-update-server versions [v3]`
//!
//! Configuration is read from the environment (and `.env` if present).

use anyhow::Context;
use clap::{Parser, Subcommand};

use cloudnet_update_server::config::EnvConfig;
use cloudnet_update_server::services::release::install_and_publish;
use cloudnet_update_server::state::{AppState, FileVersionRegistry, VersionRegistry};

#[derive(Debug, Parser)]
#[command(name = "cloudnet-update-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Archives CloudNet releases and serves them over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Install the latest upstream release of a parent and exit
    Install {
        /// Parent version name
        parent: String,
    },
    /// List registered versions
    Versions {
        /// Only list versions of this parent
        parent: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // .env 不存在时忽略
    let _ = dotenvy::dotenv();
    cloudnet_update_server::init_tracing();

    let cli = Cli::parse();
    let mut config = EnvConfig::from_env();

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    rt.block_on(async move {
        match cli.command.unwrap_or(Command::Serve { port: None }) {
            Command::Serve { port } => {
                if let Some(port) = port {
                    config.port = port;
                }
                cloudnet_update_server::run_server(config).await
            }
            Command::Install { parent } => install(config, &parent).await,
            Command::Versions { parent } => list_versions(config, parent.as_deref()).await,
        }
    })
}

async fn install(config: EnvConfig, parent: &str) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;
    let parent = state
        .parent(parent)
        .with_context(|| format!("unknown parent '{}'", parent))?
        .clone();

    let result = install_and_publish(&state, &parent, None).await;
    state.publishers.shutdown_all().await;

    match result {
        Ok(version) => {
            println!(
                "Installed {}/{} ({} files, {} bytes)",
                version.parent,
                version.name,
                version.files.len(),
                version.total_size()
            );
            Ok(())
        }
        Err(e) if e.is_expected() => {
            println!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_versions(config: EnvConfig, parent: Option<&str>) -> anyhow::Result<()> {
    // 只读打开版本库，不触碰归档目录
    let registry = FileVersionRegistry::open(config.registry_path()).await?;
    let versions = match parent {
        Some(parent) => registry.list(parent).await?,
        None => registry.list_all().await?,
    };

    if versions.is_empty() {
        println!("No versions registered");
        return Ok(());
    }

    for version in versions {
        println!(
            "{:<12} {:<24} {:>3} files  {}",
            version.parent,
            version.name,
            version.files.len(),
            version.created_at.to_rfc3339()
        );
    }
    Ok(())
}
