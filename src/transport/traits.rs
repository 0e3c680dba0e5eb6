//! Seams between a session and the byte pipe it runs over
//!
//! A session only ever sees a [`TransportConnector`]: the console dials the
//! controller's event port through TCP, tests dial an in-memory pipe.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Duplex byte stream to the rover controller.
///
/// Owned by exactly one session task, which is the only caller of `shutdown`.
#[async_trait]
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Flush pending frames and close the write side
    async fn shutdown(&mut self) -> Result<()>;
}

/// Dials the controller's event channel, once per session
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    type Stream: TransportStream;

    /// Open a fresh stream. Bounded by the session's connect timeout, not here.
    async fn connect(&self) -> Result<Self::Stream>;

    /// `host:port` being dialled, shown in logs and the status panel
    fn address(&self) -> &str;
}
