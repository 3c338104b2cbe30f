//! HTTP surface of noisemap.
//!
//! Builds the axum [`Router`] over an injected [`AppState`] and runs it with
//! graceful shutdown.

mod form;
mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::media::{LocalMediaStore, MediaStore};
use crate::storage::{ReportStore, SqliteReportStore, Storage};

pub use form::read_submission;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Report persistence.
    pub store: Arc<dyn ReportStore>,
    /// Submission pipeline over the same store.
    pub ingestor: Ingestor,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ingestor", &self.ingestor)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the collaborators together.
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, media: Arc<dyn MediaStore>) -> Self {
        let ingestor = Ingestor::new(Arc::clone(&store), media);
        Self { store, ingestor }
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    let mut app = Router::new()
        .route("/new-report", post(handlers::create_report))
        .route("/get-report", get(handlers::list_reports))
        .route("/get-user-report/{userId}", get(handlers::list_user_reports))
        .route("/map-data", get(handlers::map_data))
        .route("/reports-in-area", get(handlers::reports_in_area))
        .route("/health", get(handlers::health))
        .with_state(state);

    let mount = config.media.public_base_url.trim_end_matches('/');
    if mount.len() > 1 && mount.starts_with('/') {
        app = app.nest_service(mount, ServeDir::new(config.media.resolved_directory()));
    }

    if config.server.cors_permissive {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    app.layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// Open the store, bind and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn run(config: &Config) -> Result<()> {
    let addr = config.bind_address()?;
    let storage = Storage::open(config.database_path())?;
    info!("Using database {}", storage.path().display());

    let store: Arc<dyn ReportStore> = Arc::new(SqliteReportStore::new(storage));
    let media = LocalMediaStore::from_config(&config.media);
    info!("Storing media under {}", media.directory().display());

    let state = Arc::new(AppState::new(store, Arc::new(media)));
    let app = router(state, config);

    let listener = TcpListener::bind(addr).await?;
    info!("noisemap listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
