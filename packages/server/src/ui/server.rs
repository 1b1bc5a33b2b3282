//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        create_session, delete_session, end_session, export_session, get_session_detail,
        get_session_messages, get_session_statistics, health_check, list_sessions,
        participant_handler, viewer_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket relay server
///
/// # Example
///
/// ```ignore
/// let state = AppState::build(&config.policy(), Arc::new(SystemClock));
/// let server = Server::new(state);
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Routes of the relay
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(participant_handler))
            .route("/ws/viewer", get(viewer_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/sessions", get(list_sessions).post(create_session))
            .route(
                "/api/sessions/{session_id}",
                get(get_session_detail).delete(delete_session),
            )
            .route("/api/sessions/{session_id}/end", post(end_session))
            .route(
                "/api/sessions/{session_id}/messages",
                get(get_session_messages),
            )
            .route(
                "/api/sessions/{session_id}/statistics",
                get(get_session_statistics),
            )
            .route("/api/sessions/{session_id}/export", get(export_session))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the relay until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        tracing::info!("Participants: ws://{}/ws?session_id=<id>&client_id=<id>", bind_addr);
        tracing::info!("Viewers: ws://{}/ws/viewer?session_id=<id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
