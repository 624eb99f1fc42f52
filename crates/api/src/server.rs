//! Process lifecycle: config, pool, listener, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use catalog_infra::config::DEFAULT_CONFIG_PATH;
use catalog_infra::db::{connect_with_retry, ensure_schema};
use catalog_infra::{Config, PostgresCatalogRepository};

use crate::app::build_app;

#[derive(Debug, Parser)]
#[command(name = "catalog-api", about = "Product and package catalog HTTP service")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Start the service and block until a termination signal arrives.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    catalog_observability::init(config.is_debug);
    info!(config = %cli.config.display(), "configuration loaded");

    let pool = connect_with_retry(&config.storage)
        .await
        .context("opening storage pool")?;
    ensure_schema(&pool, &config.storage.schema)
        .await
        .context("bootstrapping catalog schema")?;

    let repo = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let app = build_app(repo);

    let addr = config.listen.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("shutting down; closing storage pool");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
