//! Webhook HTTP server.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use teloxide::types::Update;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::relay::Enqueuer;

pub const ALIVE_TEXT: &str = "I'm alive!";

#[derive(Clone)]
pub struct WebhookState {
    pub enqueuer: Enqueuer,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", post(webhook))
        .with_state(state)
}

async fn index() -> &'static str {
    ALIVE_TEXT
}

/// Telegram retries anything that is not a 200, so every outcome answers `ok`.
async fn webhook(State(state): State<WebhookState>, body: Bytes) -> (StatusCode, &'static str) {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Dropping malformed webhook body ({} bytes): {e}", body.len());
            return (StatusCode::OK, "ok");
        }
    };

    let update_id = update.id.0;
    match state.enqueuer.enqueue(update).await {
        Ok(()) => debug!("Queued update {update_id}"),
        Err(e) => warn!("Dropping update {update_id}: {e}"),
    }

    (StatusCode::OK, "ok")
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("🌐 Listening on {addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await
}
