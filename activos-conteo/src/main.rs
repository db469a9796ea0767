//! activos-conteo - Annual cyclic count plan service
//!
//! Configuration priority: command line, environment, TOML file, compiled
//! defaults.

use activos_common::config::{resolve_root_folder, TomlConfig};
use activos_common::db::init_database;
use activos_conteo::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Annual count plan service
#[derive(Parser, Debug)]
#[command(name = "activos-conteo")]
#[command(about = "Annual cyclic count plan for tangible fixed assets", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ACTIVOS_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "ACTIVOS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides configuration file)
    #[arg(short, long, env = "ACTIVOS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so the configured level applies; load messages
    // emitted here are lost
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(
        "Starting activos-conteo v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // CLI flag and ACTIVOS_ROOT_FOLDER both arrive through clap
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "ACTIVOS_ROOT_FOLDER", &config);
    let db_path = config.database_path(&root_folder);
    info!("Root folder: {}", root_folder.display());
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("✓ Database ready");

    let state = AppState::new(pool, config.top_areas_limit);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("activos-conteo listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
