use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use todo_api::config::{AppConfig, StorageMode};
use todo_api::store::{InMemoryTaskStore, RedisTaskStore, TaskStore};
use todo_api::{router, AppState, TaskService};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run().await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        storage_mode = ?config.storage_mode,
        default_page_size = config.paging.default_size,
        max_page_size = config.paging.max_size,
        "configuration loaded"
    );

    let store: Arc<dyn TaskStore> = match config.storage_mode {
        StorageMode::Memory => Arc::new(InMemoryTaskStore::new()),
        StorageMode::Redis => {
            tracing::info!(redis_url = %config.redis_url, "connecting to redis");
            Arc::new(RedisTaskStore::connect(&config.redis_url).await?)
        }
    };

    let state = AppState::new(TaskService::new(store), config.paging);
    let app = router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
