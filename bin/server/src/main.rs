use adpipe_integration::Collaborators;
use adpipe_server::{
    config::{ServerConfig, StoreKind},
    routes::{self, AppState},
};
use adpipe_workflow::{FileSessionStore, InMemorySessionStore, Orchestrator, SessionStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load().expect("failed to load configuration");
    tracing::info!(store = ?config.store.kind, "Loaded configuration");

    let store: Arc<dyn SessionStore> = match config.store.kind {
        StoreKind::Memory => Arc::new(InMemorySessionStore::new()),
        StoreKind::File => {
            tracing::info!(directory = %config.store.directory.display(), "Using file session store");
            Arc::new(
                FileSessionStore::open(config.store.directory.clone())
                    .await
                    .expect("failed to open session directory"),
            )
        }
    };

    // Vendor adapters plug in here; the offline set needs no credentials.
    let orchestrator = Orchestrator::new(store, Collaborators::offline(), &config.engine());
    let app = routes::router(AppState {
        orchestrator: Arc::new(orchestrator),
    })
    .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
