//! Deferred, cancellable server shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Schedules a graceful stop of the HTTP server after a delay.
///
/// The server awaits [`ShutdownScheduler::wait`]; the request that asked for the
/// shutdown gets its response before the delay elapses.
#[derive(Debug)]
pub struct ShutdownScheduler {
    tx: Arc<watch::Sender<bool>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ShutdownScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownScheduler {
    /// Create a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    /// Stop the server after `delay`. A shutdown already pending is kept as is.
    pub async fn schedule(&self, delay: Duration) {
        let mut pending = self.pending.lock().await;
        if pending.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("Shutdown already scheduled");
            return;
        }

        let tx = Arc::clone(&self.tx);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Shutting down server");
            tx.send_replace(true);
        }));
    }

    /// Cancel a pending shutdown. Returns `true` if one was pending.
    pub async fn cancel(&self) -> bool {
        match self.pending.lock().await.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    /// Stop the server now.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Future that completes once shutdown is signalled.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut rx = self.tx.subscribe();
        async move {
            // A closed channel also means the server is going away.
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
    }
}
