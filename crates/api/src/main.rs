use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use subhub_core::clock::SystemClock;
use subhub_db::{MemoryStore, PgStore, Store};
use subhub_events::{EventBus, JobQueue, JobRunner};
use subhub_pipeline::external_sync::{LogSyncTarget, SyncTarget};
use subhub_pipeline::{ServiceContext, Services};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subhub_api::background;
use subhub_api::config::ServerConfig;
use subhub_api::router::build_app_router;
use subhub_api::state::AppState;

/// Capacity of the in-process domain event channel.
const EVENT_BUS_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "subhub_api=debug,subhub_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let pool = subhub_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            subhub_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            subhub_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Events and jobs ---
    let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let (job_queue, job_receiver) = JobQueue::channel();

    // --- Services ---
    let ctx = ServiceContext::new(
        store,
        Arc::new(SystemClock),
        Arc::clone(&event_bus),
        job_queue,
        config.pipeline_config(),
    );
    let sync_targets: Vec<Arc<dyn SyncTarget>> = vec![Arc::new(LogSyncTarget)];
    let services = Services::new(ctx, sync_targets);

    let job_cancel = CancellationToken::new();
    let runner = background::register_jobs(&services, JobRunner::new(job_receiver));
    let job_handle = tokio::spawn(runner.run(job_cancel.clone()));
    tracing::info!("Job runner started");

    // --- App state ---
    let state = AppState {
        services,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    job_cancel.cancel();
    let _ = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        job_handle,
    )
    .await;
    tracing::info!("Job runner stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
