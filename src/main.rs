use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use coursetrack::config::{ConfigFile, ServerConfig};
use coursetrack::server::{AppState, create_router};
use coursetrack::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "coursetrack")]
#[command(about = "Admin backend for student course progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database in the data directory
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags given on the command line take precedence
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Pause between items of a bulk approval, in milliseconds
        #[arg(long)]
        bulk_pause_ms: Option<u64>,
    },
}

fn run_init(data_dir: PathBuf) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    let db_path = config.db_path();
    if db_path.exists() {
        bail!("Already initialized. Database exists at: {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Database created at: {}", db_path.display());
    Ok(())
}

fn load_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    bulk_pause_ms: Option<u64>,
) -> anyhow::Result<ServerConfig> {
    let file = match config {
        Some(path) => ConfigFile::load(&path)?,
        None => ConfigFile::default(),
    };
    let mut config = ServerConfig::from_file(file);

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(ms) = bulk_pause_ms {
        config.bulk_pause_ms = ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coursetrack=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            run_init(data_dir)?;
        }
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            bulk_pause_ms,
        } => {
            let config = load_config(config, host, port, data_dir, bulk_pause_ms)?;

            let db_path = config.db_path();
            if !db_path.exists() {
                bail!("Not initialized. Run 'coursetrack init' first to create the database.");
            }

            let store = SqliteStore::new(&db_path)?;
            store.initialize()?;

            let state = Arc::new(AppState::new(Arc::new(store), config.bulk_pacer()));
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!(
                "Starting server on {} (bulk pause {}ms)",
                addr, config.bulk_pause_ms
            );

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
