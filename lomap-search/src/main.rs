//! lomap-search - Map product search service
//!
//! Serves the product catalog, free-text map search (Gemini-backed with a
//! keyword fallback) and the seller listing assistant.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use lomap_common::config::{LoggingConfig, RootFolderInitializer, RootFolderResolver};
use lomap_search::config::{resolve_gemini_api_key, GeminiSettings};
use lomap_search::search::{DisabledParser, QueryInterpreter};
use lomap_search::{build_router, db, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5740;

/// Command-line arguments for lomap-search
#[derive(Parser, Debug)]
#[command(name = "lomap-search")]
#[command(about = "Map product search service for LOMAP")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5740)
    #[arg(short, long, env = "LOMAP_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "LOMAP_BIND")]
    bind: IpAddr,

    /// Root folder holding lomap.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Do not seed the demo catalog into an empty database
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("map-search").with_cli_override(args.root_folder.clone());
    let toml_config = resolver.load_config();

    init_tracing(&toml_config.logging)?;

    // Log build identification immediately after tracing init
    info!(
        "Starting LOMAP Map Search (lomap-search) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolver.resolve_with(&toml_config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    if initializer.database_exists() {
        info!("Database path: {}", db_path.display());
    } else {
        info!("Creating new database: {}", db_path.display());
    }

    let pool = db::init_database_pool(&db_path).await?;

    if !args.no_seed {
        let seeded = db::products::seed_demo_catalog(&pool)
            .await
            .context("Failed to seed demo catalog")?;
        if seeded > 0 {
            info!("Seeded {} demo products", seeded);
        }
    }

    let gemini = GeminiSettings::from_toml(&toml_config, resolver.config_file_path());
    let state = AppState::new(pool.clone(), QueryInterpreter::new(Arc::new(DisabledParser)), None)
        .with_gemini_settings(gemini);

    match resolve_gemini_api_key(&pool, &toml_config).await {
        Ok(api_key) => {
            let client = state
                .gemini
                .build_client(api_key)
                .context("Failed to create Gemini client")?;
            info!(
                "✓ Gemini query parsing enabled (model {}, image model {})",
                client.model(),
                client.image_model()
            );
            state.install_gemini_client(Arc::new(client)).await;
        }
        Err(e) => {
            warn!("{}", e);
            warn!("Search will use keyword matching only");
        }
    }

    let app = build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::new(args.bind, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("lomap-search listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level; file output disables ANSI colours
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
