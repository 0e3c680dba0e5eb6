//! Operator sessions on the event channel
//!
//! This module handles:
//! - Authenticating each connection with its first frame
//! - Tracking authenticated operators for broadcast
//! - Routing `control` events to the command dispatcher

mod connection;
mod manager;

pub use connection::{OperatorSession, SessionHandle};
pub use manager::SessionManager;

use crate::command::CommandDispatcher;
use crate::config::ControllerConfig;
use krushinova_shared::{ClientEvent, ControllerEvent};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Greeting logged to an operator once the handshake completes
pub const GREETING: &str = "Connected to Rover";

/// Shared by every connection task
pub struct EventContext {
    pub config: Arc<ControllerConfig>,
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<CommandDispatcher>,
}

/// Accept operators until the listener fails
pub async fn run_listener(listener: TcpListener, ctx: Arc<EventContext>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed for {}: {}", addr, e);
        }
        info!("Connection from: {}", addr);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            serve_operator(stream, addr.to_string(), ctx).await;
        });
    }
}

/// Run one operator connection to completion
pub async fn serve_operator<S>(stream: S, addr: String, ctx: Arc<EventContext>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut session = OperatorSession::new(stream, ctx.sessions.next_id(), addr);
    let handle = session.get_handle();

    if let Err(e) = session
        .authenticate(&ctx.config.token, ctx.config.auth_timeout())
        .await
    {
        warn!("Rejecting {}: {}", session.addr(), e);
        handle.shutdown().await;
        return;
    }

    // Greet before registering so no telemetry precedes `connect`
    if let Err(e) = greet(&handle).await {
        warn!("Lost {} during handshake: {}", session.addr(), e);
        return;
    }
    ctx.sessions.register(handle.clone()).await;
    info!(
        "Operator {} online ({}), {} connected",
        session.id(),
        session.addr(),
        ctx.sessions.count().await
    );

    loop {
        match session.recv().await {
            Ok(Some(ClientEvent::Control { command })) => {
                ctx.dispatcher.dispatch(command).await;
            }
            Ok(Some(ClientEvent::Auth { .. })) => {
                debug!("Ignoring repeated auth from {}", session.addr());
            }
            Ok(None) => {
                info!("Operator disconnected: {}", session.addr());
                break;
            }
            Err(e) => {
                warn!("Dropping {}: {}", session.addr(), e);
                break;
            }
        }
    }

    ctx.sessions.unregister(session.id()).await;
    handle.shutdown().await;
}

async fn greet(handle: &SessionHandle) -> anyhow::Result<()> {
    handle.send(&ControllerEvent::Connect).await?;
    handle.send(&ControllerEvent::log(GREETING)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockMotors;
    use crate::state::RoverState;
    use krushinova_shared::codec::{self, FrameDecoder};
    use krushinova_shared::MotionCommand;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    struct Harness {
        ctx: Arc<EventContext>,
        motors: Arc<MockMotors>,
    }

    fn harness() -> Harness {
        let config = Arc::new(ControllerConfig {
            auth_timeout_ms: 200,
            ..Default::default()
        });
        let sessions = Arc::new(SessionManager::new());
        let motors = Arc::new(MockMotors::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            motors.clone(),
            Arc::new(RoverState::new()),
            sessions.clone(),
            config.obstacle_stop_cm,
        ));
        Harness {
            ctx: Arc::new(EventContext {
                config,
                sessions,
                dispatcher,
            }),
            motors,
        }
    }

    async fn send(client: &mut DuplexStream, event: &ClientEvent) {
        client.write_all(&codec::encode(event).unwrap()).await.unwrap();
    }

    async fn next_event(client: &mut DuplexStream, decoder: &mut FrameDecoder) -> ControllerEvent {
        let mut buf = [0u8; 512];
        loop {
            if let Some(event) = decoder.decode_next().unwrap() {
                return event;
            }
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "controller closed the connection");
            decoder.extend(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_handshake_greeting_and_control() {
        let h = harness();
        let (server, mut client) = duplex(4096);
        let task = tokio::spawn(serve_operator(server, "op".into(), h.ctx.clone()));

        send(&mut client, &ClientEvent::auth("demo-token")).await;
        let mut decoder = FrameDecoder::new();
        assert_eq!(next_event(&mut client, &mut decoder).await, ControllerEvent::Connect);
        assert_eq!(
            next_event(&mut client, &mut decoder).await,
            ControllerEvent::log(GREETING)
        );
        // Registration lands just after the greeting is written
        for _ in 0..100 {
            if h.ctx.sessions.count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.ctx.sessions.count().await, 1);

        send(&mut client, &ClientEvent::control(MotionCommand::Right)).await;
        drop(client);
        task.await.unwrap();

        assert_eq!(h.motors.history(), vec![MotionCommand::Right]);
        assert_eq!(h.ctx.sessions.count().await, 0);
    }

    #[tokio::test]
    async fn test_bad_token_is_closed_without_connect() {
        let h = harness();
        let (server, mut client) = duplex(4096);
        let task = tokio::spawn(serve_operator(server, "op".into(), h.ctx.clone()));

        send(&mut client, &ClientEvent::auth("wrong")).await;
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());

        task.await.unwrap();
        assert_eq!(h.ctx.sessions.count().await, 0);
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let h = harness();
        let (server, mut client) = duplex(4096);
        let task = tokio::spawn(serve_operator(server, "op".into(), h.ctx.clone()));

        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(buf.is_empty());
        task.await.unwrap();
    }
}
