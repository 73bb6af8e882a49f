use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{Level, event};
use tracing_subscriber::EnvFilter;

use inquest_core::EngineInfo;
use inquest_server::api::{self, AppState};
use inquest_server::config::ServerConfig;
use inquest_server::kb::SharedKb;
use inquest_server::sessions::SessionStore;

/// HTTP front end for the guessing engine.
#[derive(Debug, Parser)]
#[command(
    name = "inquest-server",
    author,
    version,
    about = "Character-guessing engine over HTTP"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "configs/server.yaml")]
    config: PathBuf,

    /// Override the listen address.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Override the catalog file.
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Keep learned updates in memory only (never rewrite the catalog file).
    #[arg(long)]
    no_persist: bool,

    /// Exit after validating the configuration (no server is started).
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ServerConfig::from_path(&cli.config)?;

    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    if let Some(catalog) = cli.catalog {
        config.catalog = catalog;
    }

    if cli.no_persist {
        config.persist = false;
    }

    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let kb = Arc::new(SharedKb::open(&config.catalog, config.persist)?);
    let snapshot = kb.snapshot();
    event!(
        target: "inquest_server",
        Level::INFO,
        catalog = %config.catalog.display(),
        characters = snapshot.character_count(),
        questions = snapshot.question_count(),
        persist = config.persist,
        "catalog loaded",
    );

    if cli.validate_only {
        println!("Validation-only mode: server start skipped.");
        return Ok(());
    }

    let sessions = Arc::new(SessionStore::new(config.sessions.clone()));
    let app = api::router(AppState {
        kb,
        sessions,
        engine: config.engine,
    });

    let listener = TcpListener::bind(config.bind).await?;
    event!(
        target: "inquest_server",
        Level::INFO,
        engine = EngineInfo::name(),
        version = EngineInfo::version(),
        addr = %config.bind,
        "listening",
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        event!(
            target: "inquest_server",
            Level::WARN,
            error = %err,
            "shutdown signal listener failed",
        );
    }
}
