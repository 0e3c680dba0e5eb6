//! The console's single live session

use super::session::{SessionChannel, SessionEvent};
use crate::command::CommandSender;
use crate::transport::TransportConnector;
use async_trait::async_trait;
use krushinova_shared::MotionCommand;
use tracing::info;

/// Holds at most one session. Installing a new one closes the old one first,
/// so two transports never feed the same telemetry sink.
pub struct ActiveSession<C: TransportConnector> {
    current: Option<SessionChannel<C>>,
}

impl<C: TransportConnector> ActiveSession<C> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Close the current session, then open and install `session`
    pub async fn replace(&mut self, mut session: SessionChannel<C>) {
        if let Some(mut previous) = self.current.take() {
            info!("Replacing session {} with {}", previous.id(), session.id());
            previous.close().await;
        }

        session.open().await;
        self.current = Some(session);
    }

    /// Close and forget the current session, if any
    pub async fn end(&mut self) {
        if let Some(mut session) = self.current.take() {
            session.close().await;
        }
    }

    pub fn current(&self) -> Option<&SessionChannel<C>> {
        self.current.as_ref()
    }

    /// Send through the current session; dropped when there is none
    pub async fn send(&self, command: MotionCommand) {
        if let Some(session) = &self.current {
            session.send(command).await;
        }
    }

    /// Next event from the current session. Pending forever when there is none.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        match self.current.as_mut() {
            Some(session) => session.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl<C: TransportConnector> Default for ActiveSession<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: TransportConnector> CommandSender for ActiveSession<C> {
    async fn send(&self, command: MotionCommand) {
        ActiveSession::send(self, command).await
    }
}
