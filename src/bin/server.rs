//! kvlog Server Binary
//!
//! Replays the transaction log, then serves the HTTP API.

use clap::Parser;
use kvlog::config::{BackendConfig, PostgresParams};
use kvlog::network::Server;
use kvlog::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// kvlog Server
#[derive(Parser, Debug)]
#[command(name = "kvlog-server")]
#[command(about = "Key-value store backed by a replayable transaction log")]
#[command(version)]
struct Args {
    /// Listen address (host:port); overrides KVLOG_LISTEN
    #[arg(short, long)]
    listen: Option<String>,

    /// Use the file log at this path; overrides KVLOG_BACKEND/KVLOG_LOG_FILE
    #[arg(short = 'f', long, conflicts_with = "postgres")]
    log_file: Option<String>,

    /// Use the Postgres log described by PG_HOST, DB_NAME, PG_USER, PG_PASSWORD
    #[arg(long)]
    postgres: bool,

    /// Persistence queue capacity; overrides KVLOG_QUEUE_CAPACITY
    #[arg(short, long)]
    queue_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvlog Server v{}", kvlog::VERSION);

    let config = build_config(&args)?;
    tracing::info!(backend = ?config.backend, listen = %config.listen_addr, "Configuration");

    // Logger construction and replay failures are fatal: never serve a partial store.
    let engine = match Engine::open(&config).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to initialize transaction log: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        keys = engine.store().len(),
        last_sequence = engine.logger().last_sequence(),
        "Engine initialized successfully"
    );

    let server = Server::new(&config, engine);
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Environment first, then command-line overrides
fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;

    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity.max(1);
    }

    if let Some(path) = &args.log_file {
        config.backend = BackendConfig::File { path: path.into() };
    } else if args.postgres {
        config.backend = BackendConfig::Postgres(PostgresParams::from_env()?);
    }

    Ok(config)
}
