//! Storage node binary

use clap::{Parser, Subcommand};
use minidfs::{common::Config, NodeServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minidfs-node")]
#[command(about = "minidfs storage node: keeps chunks and serves them over HTTP")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./minidfs.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Announce local chunks to the coordinator, then serve
    Serve {
        /// Node ID (unique identifier for this node)
        #[arg(long)]
        id: Option<String>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Address announced to the coordinator (e.g. http://10.0.0.5:6000)
        #[arg(long)]
        advertise: Option<String>,

        /// Data directory for chunk files
        #[arg(long)]
        data: Option<PathBuf>,

        /// Coordinator URL
        #[arg(long)]
        coordinator: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            id,
            bind,
            advertise,
            data,
            coordinator,
        } => {
            let mut node_config = config.node;
            if let Some(id) = id {
                node_config.node_id = id;
            }
            if let Some(bind) = bind {
                node_config.bind_addr = bind;
            }
            if advertise.is_some() {
                node_config.advertise_addr = advertise;
            }
            if let Some(data) = data {
                node_config.data_path = data;
            }
            if let Some(coordinator) = coordinator {
                node_config.coordinator_url = coordinator;
            }
            node_config.validate()?;
            NodeServer::new(node_config).serve().await?;
        }
    }

    Ok(())
}
