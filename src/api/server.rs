//! Axum HTTP server wiring: routes, auth, shared layers, shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::header,
    middleware,
    routing::get,
};
use secrecy::ExposeSecret;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::auth::{AuthState, auth_middleware};
use crate::api::clients::{
    create_clients_handler, deactivate_client_handler, get_clients_handler, update_client_handler,
};
use crate::api::types::HealthResponse;
use crate::config::ServerConfig;
use crate::db::Database;
use crate::error::ServerError;

/// Shared state for all handlers.
pub struct AppState {
    pub db: Arc<dyn Database>,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            shutdown_tx: tokio::sync::RwLock::new(None),
        }
    }

    /// Signal the server to shut down, if it is running.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<SocketAddr, ServerError> {
    let addr = config.listen;
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::StartupFailed {
                addr: addr.to_string(),
                message: format!("failed to bind: {}", e),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ServerError::StartupFailed {
            addr: addr.to_string(),
            message: format!("failed to read local addr: {}", e),
        })?;

    // Public routes (no auth)
    let public = Router::new().route("/health", get(health_handler));

    // Protected routes (require auth when a token is configured)
    let mut protected = Router::new().route(
        "/client",
        get(get_clients_handler)
            .post(create_clients_handler)
            .put(update_client_handler)
            .delete(deactivate_client_handler),
    );
    match &config.api_token {
        Some(token) => {
            let auth_state = AuthState {
                token: token.expose_secret().to_string(),
            };
            protected = protected
                .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware));
        }
        None => {
            tracing::warn!("no API token configured; client routes are unauthenticated");
        }
    }

    let app = Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("HTTP server shutting down");
            })
            .await
        {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    Ok(bound_addr)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.db.backend_name(),
    })
}
