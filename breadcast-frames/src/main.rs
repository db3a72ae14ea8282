//! Breadcast frame server - Main entry point
//!
//! Serves recipes as Farcaster frames over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use breadcast_common::config::{CachePolicyKind, ServeMode, Settings, SettingsOverrides};
use breadcast_frames::startup::{build_components, open_store};
use breadcast_frames::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for breadcast-frames
#[derive(Parser, Debug)]
#[command(name = "breadcast-frames")]
#[command(about = "Recipe frame server for Breadcast")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "BREADCAST_PORT")]
    port: Option<u16>,

    /// Base folder holding breadcast.toml and the environment folders
    #[arg(short, long, env = "BREADCAST_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Environment folder under the base folder (e.g. dev, prod)
    #[arg(short, long, env = "BREADCAST_ENV")]
    env: Option<String>,

    /// Where recipes come from: prerendered or live
    #[arg(long, env = "BREADCAST_MODE")]
    mode: Option<ServeMode>,

    /// Frame image cache: pin_once or ttl
    #[arg(long, env = "BREADCAST_CACHE")]
    cache: Option<CachePolicyKind>,

    /// Origin used in button targets, e.g. https://frames.example
    #[arg(long, env = "BREADCAST_PUBLIC_URL")]
    public_url: Option<String>,

    /// IPFS gateway used to build image URLs
    #[arg(long, env = "IPFS_GATEWAY")]
    ipfs_gateway: Option<String>,

    /// Pinata API token
    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pinata_jwt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::resolve(SettingsOverrides {
        base_dir: args.base_dir,
        env_name: args.env,
        port: args.port,
        mode: args.mode,
        cache: args.cache,
        public_url: args.public_url,
        ipfs_gateway: args.ipfs_gateway,
        pinata_jwt: args.pinata_jwt,
    })
    .context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "breadcast_frames={level},breadcast_common={level},tower_http={level}",
                level = settings.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting breadcast-frames v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Environment folder: {}", settings.env_dir.display());
    info!("Mode: {}, cache: {}", settings.mode, settings.cache);

    let store = open_store(&settings).context("Failed to open object store")?;
    let components = build_components(&settings, store)
        .await
        .context("Failed to initialize frame engine")?;

    let state = AppState::new(Arc::new(components.engine), settings.public_url.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.bind_host, settings.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", settings.bind_host, settings.port))?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for reloader in components.reloaders {
        reloader.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
