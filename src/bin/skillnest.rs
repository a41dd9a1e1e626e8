//! `SkillNest` HTTP server.
//!
//! Startup order:
//!
//! 1. Load settings (`.env`, `skillnest.toml`, `SKILLNEST__*` variables).
//! 2. Install the tracing subscriber.
//! 3. Build the configured store, applying migrations for `PostgreSQL`.
//! 4. Spawn the reconciliation sweeper when an interval is configured.
//! 5. Serve the router until Ctrl-C or SIGTERM, then stop the sweeper.

use std::sync::Arc;

use mockable::DefaultClock;
use skillnest::{
    config::{Settings, StorageBackend, StorageSettings},
    http::{AppState, router},
    marketplace::{
        adapters::{memory::InMemoryMarketplaceStore, postgres::PostgresMarketplaceStore},
        ports::MarketplaceStore,
        services::ReconciliationService,
    },
    telemetry,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::load()?;
    telemetry::init(&settings.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?settings.storage.backend,
        "skillnest starting"
    );

    match settings.storage.backend {
        StorageBackend::Memory => {
            serve(&settings, Arc::new(InMemoryMarketplaceStore::new())).await
        }
        StorageBackend::Postgres => {
            let store = connect_postgres(&settings.storage).await?;
            serve(&settings, Arc::new(store)).await
        }
    }
}

async fn connect_postgres(storage: &StorageSettings) -> Result<PostgresMarketplaceStore, BoxError> {
    let database_url = storage
        .database_url
        .clone()
        .ok_or("storage.database_url is required for the postgres backend")?;
    let max_connections = storage.max_connections;
    let acquire_timeout = storage.acquire_timeout();
    let store = tokio::task::spawn_blocking(move || {
        PostgresMarketplaceStore::connect(&database_url, max_connections, acquire_timeout)
    })
    .await??;
    info!(max_connections, "database pool ready");

    if storage.run_migrations {
        let applied = store.run_migrations().await?;
        info!(applied, "database migrations applied");
    }
    Ok(store)
}

async fn serve<S>(settings: &Settings, store: Arc<S>) -> Result<(), BoxError>
where
    S: MarketplaceStore,
{
    let (stop_sweeper, sweeper_stopped) = oneshot::channel::<()>();
    let sweeper = settings.reconciliation.interval().map(|interval| {
        let service = ReconciliationService::new(Arc::clone(&store));
        info!(interval_secs = interval.as_secs(), "reconciliation sweeper enabled");
        tokio::spawn(async move {
            service
                .run_periodically(interval, async {
                    let _closed = sweeper_stopped.await;
                })
                .await;
        })
    });

    let state = Arc::new(AppState::new(store, Arc::new(DefaultClock)));
    let app = router(state);
    let listener = TcpListener::bind(settings.server.bind_address).await?;
    info!(addr = %settings.server.bind_address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _sent = stop_sweeper.send(());
    if let Some(handle) = sweeper {
        handle.await?;
    }
    info!("skillnest stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received; draining connections");
}
