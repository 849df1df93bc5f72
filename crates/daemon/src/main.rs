// SPDX-License-Identifier: MIT

//! RCA benchmarking control-plane daemon (`rcabd`).
//!
//! Loads configuration, wires a `Service` against the real Kubernetes Job
//! Adapter and system clock, then runs the scheduler until SIGTERM/SIGINT.

use std::sync::Arc;

use rcab_adapters::{InjectionResourceKind, KubeJobAdapter};
use rcab_core::{Config, SystemClock};
use rcab_daemon::Service;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load()?;

    let _log_guard = setup_logging(&config)?;

    info!("starting rcabd");

    let injection_kind = InjectionResourceKind {
        group: config.injection_group.clone(),
        version: config.injection_version.clone(),
        kind: config.injection_kind.clone(),
    };
    let adapter = Arc::new(
        KubeJobAdapter::new(config.kube_namespace.clone(), injection_kind, config.log_dir.clone())
            .await
            .map_err(|err| {
                error!(%err, "failed to construct Kubernetes job adapter");
                anyhow::Error::from(err)
            })?,
    );
    adapter.spawn_reconciler();

    let service = Arc::new(Service::new(config, adapter, SystemClock));

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(err) => {
                error!(%err, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(sig) => sig,
            Err(err) => {
                error!(%err, "failed to install SIGINT handler");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        signal_shutdown.cancel();
    });

    info!("rcabd ready");
    service.run(shutdown).await;
    info!("rcabd shut down cleanly");

    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, anyhow::Error> {
    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "rcabd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
