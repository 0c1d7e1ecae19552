use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_api::{
    api,
    config::{Config, StoreBackend},
    storage::{EventStore, MongoStore, RedbStore},
    uploads::UploadStore,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "event-api starting");

    let config = Config::load()?;

    // Initialize the event store backend
    let store: Arc<dyn EventStore> = match config.store.backend {
        StoreBackend::Mongo => {
            let store =
                MongoStore::connect(&config.store.mongodb_uri, &config.store.database).await?;
            info!(database = %config.store.database, "Connected to MongoDB");
            Arc::new(store)
        }
        StoreBackend::Redb => {
            let store = RedbStore::open(&config.store.data_dir)?;
            info!("Using redb store at: {}", config.store.data_dir);
            Arc::new(store)
        }
    };

    let uploads = Arc::new(UploadStore::new(
        &config.uploads.dir,
        config.uploads.max_size,
    )?);
    info!("Uploads stored in: {}", config.uploads.dir);

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(config, store, uploads));

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on: {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
