//! `geots-server`: the time-series HTTP API over a local data directory

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use geots::api::{self, ApiState};
use geots::{Config, Engine, TimeSeriesDb};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "geots-server")]
#[command(about = "Versioned time-series store with an HTTP API")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = "./geots_data")]
    data_dir: String,

    /// host:port to bind
    #[arg(short, long, default_value = "127.0.0.1:8010")]
    listen: String,

    /// Flush the MemTable once it reaches this many MiB
    #[arg(short = 'm', long, default_value = "64")]
    memtable_mb: usize,

    /// Data points returned per GET
    #[arg(short, long, default_value = "50")]
    page_size: usize,
}

impl Args {
    fn config(&self) -> Config {
        Config::builder()
            .data_dir(&self.data_dir)
            .listen_addr(&self.listen)
            .memtable_size_limit(self.memtable_mb << 20)
            .page_size(self.page_size)
            .build()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,geots=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = Args::parse().config();
    tracing::info!(
        version = geots::VERSION,
        data_dir = %config.data_dir.display(),
        "starting geots"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> geots::Result<()> {
    let engine = Engine::open(config.clone())?;
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    let db = Arc::new(TimeSeriesDb::new(engine));
    api::serve(listener, ApiState::new(db.clone(), config.page_size), shutdown_signal()).await?;

    // serve has dropped the router, so this is normally the last handle
    match Arc::try_unwrap(db) {
        Ok(db) => db.into_inner().close(),
        Err(db) => {
            tracing::warn!("engine still shared at shutdown, flushing only");
            db.store().flush()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl+C received, shutting down");
}
