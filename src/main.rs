mod clients;
mod config;
mod error;
mod helpers;
mod models;
mod routes;
#[cfg(test)]
mod testutil;
mod topology;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use clients::aggregator::Aggregator;
use clients::{ApiClient, DashboardApi};
use topology::icons::IconCache;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub icons: Arc<IconCache>,
}

impl AppState {
    pub fn new(api: Arc<dyn DashboardApi>, panel_width: u32, icons: IconCache) -> Self {
        Self {
            aggregator: Arc::new(Aggregator::new(api, panel_width)),
            icons: Arc::new(icons),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("topology_console=info")),
        )
        .init();

    let config_path = std::env::args()
        .skip(1)
        .zip(std::env::args().skip(2))
        .find_map(|(k, v)| (k == "-config" || k == "--config").then_some(v))
        .or_else(|| std::env::args().nth(1).filter(|a| !a.starts_with('-')))
        .unwrap_or_else(|| "/etc/topology-console/config.yaml".to_string());

    let cfg = config::Config::load(&PathBuf::from(&config_path)).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(1);
    });

    let api = ApiClient::new(&cfg.api).unwrap_or_else(|e| {
        eprintln!("error creating API client: {}", e);
        std::process::exit(1);
    });

    // The first tree is only built once every icon load has settled.
    let icon_http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.api.timeout_secs))
        .build()
        .unwrap_or_default();
    let icons = IconCache::preload(&cfg.icons, &icon_http).await;

    let state = AppState::new(Arc::new(api), cfg.panel_width, icons);

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    // Start snapshot polling and cache-driven rebuilds
    let agg = state.aggregator.clone();
    let interval = cfg.refresh_interval();
    tokio::spawn(async move {
        agg.run(interval, shutdown_rx).await;
    });

    let router = routes::build_router(state);

    let listen_addr = cfg.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind {}: {}", listen_addr, e);
        std::process::exit(1);
    });

    info!("topology-console listening on {}", listen_addr);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(());
        })
        .await
    {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
