//! CLI for file transfers and cluster inspection

use clap::{Parser, Subcommand};
use minidfs::client::{Client, Progress, Transfer};
use minidfs::common::{format_bytes, ChunkId, Config};
use std::io::Write;
use std::path::PathBuf;
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "minidfs")]
#[command(about = "minidfs chunked file store CLI")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./minidfs.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Coordinator URL
    #[arg(long, global = true)]
    coordinator: Option<String>,

    /// Chunk size in bytes
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Put {
        /// Local file
        file: PathBuf,

        /// Name in the store (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a file
    Get {
        /// Name in the store
        name: String,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// List committed files
    Ls,

    /// List registered storage nodes
    Nodes,

    /// Show which node serves a chunk, e.g. `notes.txt_chunk_3`
    Locate { chunk: String },

    /// Show coordinator counters
    Status,
}

/// Print progress on one line while the transfer runs
async fn watch<T: Send + 'static>(mut transfer: Transfer<T>, label: &str) -> minidfs::Result<T> {
    if let Some(mut progress) = transfer.progress() {
        while let Some(Progress { percent, .. }) = progress.next().await {
            print!("\r{} {:>3}%", label, percent);
            let _ = std::io::stdout().flush();
        }
        println!();
    }
    transfer.wait().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let mut client_config = config.client;
    if let Some(url) = cli.coordinator {
        client_config.coordinator_url = url;
    }
    if let Some(chunk_size) = cli.chunk_size {
        client_config.chunk_size = chunk_size;
    }
    if let Some(timeout) = cli.timeout {
        client_config.request_timeout_secs = timeout;
    }
    let client = Client::connect(&client_config)?;

    match cli.command {
        Commands::Put { file, name } => {
            let transfer = match name {
                Some(name) => client.upload_as(file, name),
                None => client.upload(file),
            };
            let report = watch(transfer, "Uploading").await?;
            println!(
                "Stored {} ({}) in {} chunk(s)",
                report.name,
                format_bytes(report.size),
                report.chunks.len()
            );
        }

        Commands::Get { name, out } => {
            let report = watch(client.download(name, out), "Downloading").await?;
            println!(
                "Wrote {} ({}) from {} chunk(s)",
                report.path.display(),
                format_bytes(report.size),
                report.chunks
            );
        }

        Commands::Ls => {
            for name in client.list_files().await? {
                println!("{}", name);
            }
        }

        Commands::Nodes => {
            for node in client.list_nodes().await? {
                println!("{}\t{}", node.id, node.address);
            }
        }

        Commands::Locate { chunk } => {
            let chunk_id: ChunkId = chunk.parse()?;
            let node = client.locate_chunk(&chunk_id).await?;
            println!("{}\t{}\t{}", chunk_id, node.id, node.address);
        }

        Commands::Status => {
            let status = client.status().await?;
            println!("Coordinator status:");
            println!("  Files: {}", status.files);
            println!("  Nodes: {}", status.nodes);
            println!("  Tracked chunks: {}", status.tracked_chunks);
            println!("  Placements: {}", status.placements);
        }
    }

    Ok(())
}
