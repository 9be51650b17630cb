//! piano-server - Main entry point
//!
//! Loads bootstrap config, the persisted secret state and the reward payload,
//! then serves the piano tuning puzzle over HTTP until Ctrl+C / SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use piano_common::config::{load_reward, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use piano_common::secrets::load_or_create;
use piano_common::{StateOrigin, SubmissionJudge};
use piano_server::{build_router, AssetPaths, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for piano-server
#[derive(Parser, Debug)]
#[command(name = "piano-server")]
#[command(about = "Piano tuning puzzle server")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PIANO_TUNER_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long, env = "PIANO_TUNER_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config = TomlConfig::load(config_path.as_deref()).context("Failed to load config")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting piano-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }

    let (secrets, origin) = load_or_create(&config.state_file, config.strict_persistence)
        .with_context(|| {
            format!(
                "Failed to initialize secret state at {}",
                config.state_file.display()
            )
        })?;
    match origin {
        StateOrigin::Loaded => info!("✓ Secret state loaded"),
        StateOrigin::Created => info!("✓ Secret state created (first boot)"),
        StateOrigin::Ephemeral => warn!(
            "Secret state is in memory only; sessions will not survive a restart"
        ),
    }

    let reward = load_reward(&config.reward_file).context("Failed to load reward payload")?;
    info!("✓ Reward payload loaded from {}", config.reward_file.display());

    let judge = SubmissionJudge::with_limits(
        reward,
        Duration::seconds(config.cooldown_secs),
        config.max_tracked_sessions,
    );
    let paths = AssetPaths {
        assets_dir: config.assets_dir.clone(),
        notes_dir: config.notes_dir.clone(),
    };

    let state = AppState::new(secrets, judge, paths);
    let prefix = config.normalized_prefix();
    let app = build_router(state, &prefix);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("piano-server listening on http://{}{}/", addr, prefix);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
