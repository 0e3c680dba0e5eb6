//! Snapshot slot and bounded log fed by the session channel

use crate::connection::SessionEvent;
use krushinova_shared::{limits, now_ms, TelemetrySnapshot};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Log line written when a session completes its handshake
pub const SESSION_ONLINE_MESSAGE: &str = "System Online";

/// A timestamped operational message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub message: String,
}

/// Latest telemetry and recent log entries.
///
/// Cloning yields another handle to the same state: the session pump writes,
/// any number of readers observe.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    snapshot: Arc<RwLock<TelemetrySnapshot>>,
    /// Most recent first
    logs: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::with_capacity(limits::LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(TelemetrySnapshot::default())),
            logs: Arc::new(RwLock::new(VecDeque::with_capacity(capacity + 1))),
            capacity,
        }
    }

    /// Replace the current snapshot wholesale
    pub async fn apply_snapshot(&self, snapshot: TelemetrySnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Insert a message at the front, evicting the oldest past capacity
    pub async fn append_log(&self, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp_ms: now_ms(),
            message: message.into(),
        };

        let mut logs = self.logs.write().await;
        logs.push_front(entry);
        logs.truncate(self.capacity);
    }

    /// Route an inbound session event into the sink
    pub async fn apply(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => self.append_log(SESSION_ONLINE_MESSAGE).await,
            SessionEvent::Telemetry(snapshot) => self.apply_snapshot(snapshot).await,
            SessionEvent::Log(message) => self.append_log(message).await,
            SessionEvent::Closed { reason } => {
                debug!("Session closed ({}), keeping last telemetry", reason);
            }
        }
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot.read().await.clone()
    }

    /// Log entries, most recent first
    pub async fn logs(&self) -> Vec<LogEntry> {
        self.logs.read().await.iter().cloned().collect()
    }

    /// Log messages only, most recent first
    pub async fn messages(&self) -> Vec<String> {
        self.logs
            .read()
            .await
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}
