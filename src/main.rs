//! `caserunnerd` — the control plane binary.
//!
//! Parses CLI flags, loads the two JSON config documents, connects to the Docker
//! daemon, builds the engine, and serves the HTTP + WebSocket ingress until
//! SIGINT/SIGTERM, then drains running test cases before exiting.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use caserunner::config::{self, ProcessConfig};
use caserunner::driver::docker::DockerDriver;
use caserunner::engine::Engine;
use caserunner::tool::ToolRegistry;

/// Remote test-runner control plane.
#[derive(Parser, Debug)]
#[command(name = "caserunnerd", version, about)]
struct Cli {
    /// Address to listen on, e.g. ":8080" or "0.0.0.0:8080".
    #[arg(long = "listen", default_value = ":8080")]
    listen: String,

    /// Path to the containers JSON config (type -> container template). Required.
    #[arg(long = "conf")]
    conf: PathBuf,

    /// Path to the log JSON config. Missing or invalid is non-fatal.
    #[arg(long = "log-conf")]
    log_conf: Option<PathBuf>,

    /// Host directory under which per-test-case data directories are created.
    #[arg(long = "data-dir", default_value = "/var/lib/caserunner")]
    data_dir: PathBuf,

    /// Per-test-case timeout, in seconds.
    #[arg(long = "timeout", default_value_t = 600)]
    timeout: u64,

    /// Drain timeout on shutdown, in seconds.
    #[arg(long = "shutdown-timeout", default_value_t = 30)]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let containers = config::load_containers(&cli.conf)
        .context("fatal: could not load containers config")?;

    let log_config = match &cli.log_conf {
        Some(path) => config::load_log_config(path),
        None => Default::default(),
    };

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("could not create data dir {}", cli.data_dir.display()))?;

    let driver = DockerDriver::connect(log_config, cli.data_dir.clone())
        .context("fatal: could not connect to the Docker daemon")?;

    let process_config = ProcessConfig {
        listen: cli.listen.clone(),
        data_dir: cli.data_dir.to_string_lossy().into_owned(),
        timeout: Duration::from_secs(cli.timeout),
        shutdown_timeout: Duration::from_secs(cli.shutdown_timeout),
    };

    let engine = Engine::start(
        ToolRegistry::default(),
        containers,
        Arc::new(driver),
        process_config,
    );

    let app = caserunner::ingress::router(engine.clone());

    let listen_addr = normalize_listen_addr(&cli.listen);
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("could not bind {listen_addr}"))?;
    info!(addr = %listen_addr, "listening");

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_engine))
        .await
        .context("server error")?;

    engine.run_shutdown().await;
    info!("exiting");
    Ok(())
}

/// Accepts bare `:PORT` the way the Go source's flag default does, normalizing it
/// to `0.0.0.0:PORT` for `TcpListener`.
fn normalize_listen_addr(listen: &str) -> String {
    if let Some(port) = listen.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        listen.to_string()
    }
}

async fn shutdown_signal(engine: Arc<Engine>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    engine.shutdown.cancel();
}
