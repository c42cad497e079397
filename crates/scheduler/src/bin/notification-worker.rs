//! notification-worker — runs the notification scheduler as a daemon.
//!
//! Skeleton process: the object model (checkables, notifications) is
//! registered by the embedding configuration layer; on its own this
//! binary starts the scheduler against an empty hub, logs every delivery
//! through the tracing transport, and shuts down cleanly on ctrl-c.

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::{info, warn};

use vigil_model::{EventHub, Notification, NotificationKind};
use vigil_scheduler::{
    NotificationScheduler, NotificationTransport, SchedulerConfig, TransportError,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Notification scheduler worker — fires and repeats alert notifications.
#[derive(Parser, Debug)]
#[command(name = "notification-worker", version, about)]
struct Cli {
    /// Path to the scheduler TOML config file.
    #[arg(long, env = "VIGIL_CONFIG", default_value = "config/scheduler.toml")]
    config: String,

    /// Shutdown timeout in seconds (overrides the config file).
    #[arg(long, env = "VIGIL_SHUTDOWN_TIMEOUT")]
    shutdown_timeout: Option<u64>,
}

// ── Transport ───────────────────────────────────────────────────────

/// Transport that only logs deliveries. Stands in for the real delivery
/// layer (notification commands, mail, ...) in the skeleton daemon.
struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send(
        &self,
        notification: &Arc<Notification>,
        kind: NotificationKind,
        renotification: bool,
    ) -> Result<(), TransportError> {
        let output = notification
            .checkable()
            .and_then(|c| c.last_check_result())
            .map(|r| r.output)
            .unwrap_or_default();
        info!(
            notification = %notification.name(),
            %kind,
            renotification,
            %output,
            "delivering notification"
        );
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "log"
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match SchedulerConfig::from_file(&cli.config) {
        Ok(cfg) => {
            info!(path = %cli.config, "loaded scheduler config");
            cfg
        }
        Err(e) => {
            warn!(path = %cli.config, error = %e, "config not loaded, using defaults");
            SchedulerConfig::default()
        }
    };
    if let Some(secs) = cli.shutdown_timeout {
        config.shutdown_timeout_secs = secs;
    }

    let hub = EventHub::new();
    let scheduler = NotificationScheduler::new(config, Arc::new(LogTransport));
    scheduler.start(&hub)?;

    info!("notification worker running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    scheduler.stop().await?;
    Ok(())
}
