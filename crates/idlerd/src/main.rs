//! idlerd — the faas-idler daemon.
//!
//! Watches scale-to-zero enabled HorizontalPodAutoscalers, scales their
//! workloads to zero once a function has been idle for its cooldown, and
//! restores them as soon as demand returns.
//!
//! # Usage
//!
//! ```text
//! idlerd --config /etc/idler/idler.toml --log-format json
//! idlerd --interval 5s --default-cooldown 1h
//! ```
//!
//! Cluster credentials come from the in-cluster service account or the
//! local kubeconfig.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use idler_core::{IdlerConfig, Settings};
use idler_kube::{KubeCluster, KubeMetrics};
use idler_scale::{Idler, Reconciler};
use idler_state::StateStore;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "idlerd", about = "Scale idle functions to zero")]
struct Cli {
    /// Path to an idler.toml file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay between reconciliation cycles (e.g. "3s").
    #[arg(long)]
    interval: Option<String>,

    /// Cooldown for functions without an override annotation (e.g. "30m").
    #[arg(long)]
    default_cooldown: Option<String>,

    /// Sliding expiration of per-function state (e.g. "20s").
    #[arg(long)]
    state_ttl: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings = resolve_settings(&cli)?;
    info!(
        interval = ?settings.interval,
        default_cooldown = ?settings.default_cooldown,
        state_ttl = ?settings.state_ttl,
        "faas idler starting"
    );

    let client = kube::Client::try_default()
        .await
        .context("failed to create kubernetes client")?;

    let store = StateStore::with_ttl(settings.state_ttl);
    let idler = Idler::new(Arc::new(KubeCluster::new(client.clone())), store)
        .with_default_cooldown(settings.default_cooldown);
    let reconciler = Reconciler::new(idler, Arc::new(KubeMetrics::new(client)))
        .with_interval(settings.interval);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        reconciler.run(shutdown_rx).await;
    });

    shutdown_signal().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    handle.await?;

    info!("faas idler stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,idlerd=debug,idler=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Merge the optional config file with command-line overrides.
fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut config = match &cli.config {
        Some(path) => IdlerConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => IdlerConfig::default(),
    };

    if let Some(interval) = &cli.interval {
        config.interval = interval.clone();
    }
    if let Some(cooldown) = &cli.default_cooldown {
        config.default_cooldown = cooldown.clone();
    }
    if let Some(ttl) = &cli.state_ttl {
        config.state_ttl = ttl.clone();
    }

    Ok(config.settings()?)
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
