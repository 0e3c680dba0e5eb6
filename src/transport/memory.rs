//! In-memory transport used by the session tests

use crate::transport::traits::{TransportConnector, TransportStream};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

pub struct MemoryStream {
    inner: DuplexStream,
    shutdowns: Arc<AtomicUsize>,
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[async_trait]
impl TransportStream for MemoryStream {
    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        tokio::io::AsyncWriteExt::shutdown(&mut self.inner).await?;
        Ok(())
    }
}

enum Mode {
    /// Hand out the client half once
    Ready(Mutex<Option<DuplexStream>>),
    /// Never finish connecting
    Hang,
    /// Fail every attempt
    Refuse,
}

/// Connector backed by a `tokio::io::duplex` pipe
pub struct MemoryConnector {
    mode: Mode,
    connects: AtomicUsize,
    shutdowns: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Returns the connector and the controller end of the pipe
    pub fn pair() -> (Self, DuplexStream) {
        Self::pair_with_capacity(64 * 1024)
    }

    /// Like [`pair`](Self::pair) with a pipe that holds `capacity` bytes each way
    pub fn pair_with_capacity(capacity: usize) -> (Self, DuplexStream) {
        let (client, controller) = tokio::io::duplex(capacity);
        (Self::with_mode(Mode::Ready(Mutex::new(Some(client)))), controller)
    }

    pub fn hanging() -> Self {
        Self::with_mode(Mode::Hang)
    }

    pub fn refusing() -> Self {
        Self::with_mode(Mode::Refuse)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            connects: AtomicUsize::new(0),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of connect attempts made
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of graceful transport shutdowns performed
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConnector for MemoryConnector {
    type Stream = MemoryStream;

    async fn connect(&self) -> Result<Self::Stream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            Mode::Ready(slot) => {
                let inner = slot
                    .lock()
                    .map_err(|_| anyhow!("memory transport poisoned"))?
                    .take()
                    .ok_or_else(|| anyhow!("memory transport already used"))?;
                Ok(MemoryStream {
                    inner,
                    shutdowns: self.shutdowns.clone(),
                })
            }
            Mode::Hang => std::future::pending().await,
            Mode::Refuse => Err(anyhow!("connection refused")),
        }
    }

    fn address(&self) -> &str {
        "memory"
    }
}
