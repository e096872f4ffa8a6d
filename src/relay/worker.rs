//! Hand-off between the webhook and the handlers.
//!
//! The HTTP side only parses and enqueues. A single worker task drains the
//! queue in arrival order, so at most one message is being generated at a time.

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::Update;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::info;

use crate::error::{report, RelayError};
use crate::relay::handlers::{Inbound, Relay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// No slot freed up within the enqueue timeout.
    Full,
    /// The worker has stopped.
    Closed,
}

impl std::fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "update queue is full"),
            Self::Closed => write!(f, "update queue is closed"),
        }
    }
}

impl std::error::Error for EnqueueError {}

/// Sending half of the update queue, cheap to clone.
#[derive(Clone)]
pub struct Enqueuer {
    tx: mpsc::Sender<Update>,
    timeout: Duration,
}

impl Enqueuer {
    pub async fn enqueue(&self, update: Update) -> Result<(), EnqueueError> {
        self.tx
            .send_timeout(update, self.timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => EnqueueError::Full,
                SendTimeoutError::Closed(_) => EnqueueError::Closed,
            })
    }
}

/// Create a bounded update queue.
pub fn queue(capacity: usize, timeout: Duration) -> (Enqueuer, mpsc::Receiver<Update>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Enqueuer { tx, timeout }, rx)
}

/// Process updates one at a time until every `Enqueuer` is dropped.
///
/// Each update runs in its own task so a panicking handler is contained;
/// the task is awaited before the next update is taken.
pub async fn run(relay: Arc<Relay>, mut rx: mpsc::Receiver<Update>) {
    info!("Worker started");
    while let Some(update) = rx.recv().await {
        let update_id = update.id.0;
        let inbound = Inbound::from_update(&update);

        let task = tokio::spawn({
            let relay = relay.clone();
            async move { relay.dispatch(update).await }
        });

        if let Err(e) = task.await {
            let err = RelayError::internal(format!("handler for update {update_id} failed: {e}"));
            match inbound {
                Some(inbound) => relay.on_error(&inbound, err).await,
                None => {
                    report(&err);
                }
            }
        }
    }
    info!("Worker stopped (queue closed)");
}
