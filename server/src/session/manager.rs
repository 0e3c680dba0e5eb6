//! Session manager for tracking authenticated operators

use super::connection::SessionHandle;
use krushinova_shared::{limits, ControllerEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Every operator that completed the handshake
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<u64, SessionHandle>>>,
    next_id: AtomicU64,
    /// Per-operator bound on a single broadcast write
    send_timeout: Duration,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_send_timeout(Duration::from_millis(limits::SEND_TIMEOUT_MS))
    }

    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            send_timeout,
        }
    }

    /// Allocate an id for a freshly accepted connection
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn register(&self, handle: SessionHandle) {
        debug!("Registering operator {} ({})", handle.id, handle.addr);
        self.sessions.write().await.insert(handle.id, handle);
    }

    pub async fn unregister(&self, id: u64) {
        self.sessions.write().await.remove(&id);
    }

    /// Send to every operator. Operators whose write fails or stalls past the
    /// send timeout are dropped and their connection closed.
    pub async fn broadcast(&self, event: &ControllerEvent) {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();

        let mut failed = Vec::new();
        for handle in handles {
            match timeout(self.send_timeout, handle.send(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Failed to send to operator {} ({}): {}", handle.id, handle.addr, e);
                    failed.push(handle);
                }
                Err(_) => {
                    warn!(
                        "Operator {} ({}) stalled for {:?}, dropping",
                        handle.id, handle.addr, self.send_timeout
                    );
                    failed.push(handle);
                }
            }
        }

        if failed.is_empty() {
            return;
        }
        {
            let mut sessions = self.sessions.write().await;
            for handle in &failed {
                sessions.remove(&handle.id);
            }
        }
        for handle in failed {
            handle.shutdown().await;
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
