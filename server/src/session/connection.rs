//! Individual operator connection handling

use anyhow::Result;
use krushinova_shared::{
    codec::{self, FrameDecoder},
    ClientEvent, ControllerEvent,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No auth frame within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed before auth")]
    Closed,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Expected auth frame, got {0}")]
    Unexpected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Handle to push events to a specific operator
#[derive(Clone)]
pub struct SessionHandle {
    pub id: u64,
    pub addr: String,
    writer: Arc<Mutex<BoxedWriter>>,
}

impl SessionHandle {
    pub async fn send(&self, event: &ControllerEvent) -> Result<()> {
        let encoded = codec::encode(event)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&encoded).await?;
        Ok(())
    }

    /// Close the write side; the operator sees EOF
    pub async fn shutdown(&self) {
        let _ = self.writer.lock().await.shutdown().await;
    }
}

/// One operator connection, from accept to disconnect
pub struct OperatorSession {
    pub handle: SessionHandle,
    reader: BoxedReader,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl OperatorSession {
    pub fn new<S>(stream: S, id: u64, addr: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);

        let handle = SessionHandle {
            id,
            addr: addr.into(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
        };

        Self {
            handle,
            reader: Box::new(reader),
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    pub fn get_handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Read the next event from this operator.
    ///
    /// Returns `Ok(None)` when the connection is closed. Malformed frames are
    /// skipped; a corrupt length prefix ends the session.
    pub async fn recv(&mut self) -> Result<Option<ClientEvent>> {
        loop {
            match self.decoder.decode_next::<ClientEvent>() {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping malformed frame from {}: {}", self.handle.addr, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    /// Wait for the operator's `auth` frame and check its token
    pub async fn authenticate(&mut self, token: &str, within: Duration) -> Result<(), AuthError> {
        let event = match tokio::time::timeout(within, self.recv()).await {
            Err(_) => return Err(AuthError::Timeout(within)),
            Ok(Err(e)) => return Err(AuthError::Transport(e.to_string())),
            Ok(Ok(None)) => return Err(AuthError::Closed),
            Ok(Ok(Some(event))) => event,
        };

        match event {
            ClientEvent::Auth { token: offered } if offered == token => Ok(()),
            ClientEvent::Auth { .. } => Err(AuthError::InvalidToken),
            other => Err(AuthError::Unexpected(format!("{:?}", other))),
        }
    }

    pub fn id(&self) -> u64 {
        self.handle.id
    }

    pub fn addr(&self) -> &str {
        &self.handle.addr
    }
}
