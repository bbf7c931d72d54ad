//! HTTP gateway — axum routes over storage and the callback synchronizer.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::callback::CallbackSynchronizer;
use crate::config::Config;
use crate::storage::FileStorage;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<FileStorage>,
    pub callbacks: Arc<CallbackSynchronizer>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Arc::new(
            FileStorage::new(&config.storage.root).context("Failed to open storage directory")?,
        );
        let callbacks = CallbackSynchronizer::new(storage.clone(), config.callback.fetch_timeout())
            .context("Failed to build callback HTTP client")?;
        Ok(Self {
            storage,
            callbacks: Arc::new(callbacks),
        })
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/example/files", get(handlers::list_files))
        .route("/example/file", delete(handlers::delete_file))
        .route(
            "/example/upload",
            post(handlers::upload_file)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .route("/example/download", get(handlers::download_file))
        .route("/example/track", post(handlers::track))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind, log the startup banner and serve until Ctrl-C or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let root = state
        .storage
        .root()
        .canonicalize()
        .unwrap_or_else(|_| state.storage.root().to_path_buf());
    let app = router(state, config.storage.max_upload_bytes);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        address = %addr,
        storage = %root.display(),
        max_upload_bytes = config.storage.max_upload_bytes,
        "Storage Engine started; API endpoints under http://{}/example/",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Storage Engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
