use anyhow::Result;
use axum::serve;
use metrics_exporter_prometheus::PrometheusBuilder;
use node::{create_router, AppState, RequestStore};
use oracle_core::{config::AppConfig, cycle::CycleRunner, rpc::HttpClient};
use std::{net::SocketAddr, sync::Arc};
use tokio::{signal, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,oracle_core={level},node={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

fn init_metrics(config: &AppConfig) -> Result<()> {
    if !config.metrics.enabled {
        return Ok(());
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.prometheus_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {e}"))?;
    info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration load failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting oracle node");
    debug!(
        chains_count = config.chains.len(),
        signing_enabled = config.signing.enabled,
        cycle_interval_seconds = config.node.cycle_interval_seconds,
        "Configuration loaded"
    );

    init_metrics(&config)?;

    let signer = config.signing_key()?;
    info!(address = %signer.address(), "Transaction signer loaded");

    let http = Arc::new(HttpClient::new()?);
    let runner = CycleRunner::from_config(&config, &signer, http)?;
    let store = RequestStore::new(&config.node.requests_path);

    let signing_server = if config.signing.enabled {
        let addr = config.signing.socket_addr()?;
        let app = create_router(AppState::new(config.signing.consensus_settings()));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(address = %addr, "Signing server listening");
        Some(tokio::spawn(async move {
            if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
                error!(error = %e, "Signing server error occurred");
            }
        }))
    } else {
        None
    };

    let mut interval = tokio::time::interval(config.cycle_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = interval.tick() => run_once(&runner, &store).await,
        }
    }

    if let Some(handle) = signing_server {
        handle.abort();
    }
    info!("Oracle node shutdown complete");

    Ok(())
}

async fn run_once(runner: &CycleRunner, store: &RequestStore) {
    let batches = match store.load() {
        Ok(batches) => batches,
        Err(e) => {
            error!(error = %e, path = %store.path().display(), "Failed to load pending requests");
            return;
        }
    };

    let requests: usize = batches.iter().map(|batch| batch.len()).sum();
    info!(providers = batches.len(), requests, "Starting cycle");

    let report = runner.run_cycle(batches).await;
    if !report.deferred.is_empty() {
        warn!(deferred = report.deferred.len(), "Requests deferred by chain limits");
    }

    if let Err(e) = store.save(&report) {
        error!(error = %e, path = %store.path().display(), "Failed to write cycle results");
        return;
    }
    info!(log_entries = report.log.len(), "Cycle complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
