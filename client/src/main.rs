//! Tandem Agent - headless sync process for one device.
//!
//! Keeps this installation's local store in sync with the remote authority
//! until interrupted.

use std::sync::Arc;
use tandem_client::{
    Config, Connectivity, FileStore, HttpTransport, IntervalTicker, LocalStore, NetworkState,
    RemoteApi, SyncEvent, SyncOrchestrator,
};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tandem_client=debug,tandem_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Tandem agent against {} (data in {})",
        config.api.base_url,
        config.data_dir.display()
    );

    // Local store and network signal
    let store = Arc::new(LocalStore::new(Arc::new(FileStore::open(&config.data_dir)?)));
    let connectivity = Connectivity::new(NetworkState {
        connected: true,
        kind: config.network,
    });

    let transport = HttpTransport::new(
        config.api.clone(),
        config.sync.max_retries,
        connectivity.clone(),
    )?
    .with_auth_token(store.auth_token());

    let orchestrator = SyncOrchestrator::new(
        Arc::new(transport),
        store,
        connectivity,
        config.sync.clone(),
    );

    if orchestrator.remote().health_check().await {
        tracing::info!("Remote authority is healthy");
    } else {
        tracing::warn!("Remote authority health check failed, continuing offline-first");
    }

    let device = orchestrator.registry().local_device(
        config.device_name.clone(),
        format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        "unknown",
    );
    orchestrator.register_device(device).await;

    // Log every orchestrator event
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Completed {
                    success: false,
                    error,
                }) => tracing::warn!(error = %error.unwrap_or_default(), "Sync cycle failed"),
                Ok(event) => tracing::debug!(?event, "Sync event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event logger lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let removed = orchestrator.cleanup_old_data();
    if removed > 0 {
        tracing::info!("Removed {} expired records", removed);
    }

    let sync_loop = tokio::spawn(
        orchestrator
            .clone()
            .run(IntervalTicker::new(config.sync.sync_interval())),
    );

    if config.sync.auto_sync {
        orchestrator.perform_sync().await;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    orchestrator.shutdown();
    sync_loop.await?;

    Ok(())
}
