//! One operator session with the rover controller

use crate::auth::AuthToken;
use crate::command::CommandSender;
use crate::transport::{TransportConnector, TransportStream};
use anyhow::Result;
use async_trait::async_trait;
use krushinova_shared::{
    codec::{self, FrameDecoder},
    limits, now_ms,
    state_machine::{LinkEvent, SessionState, SessionStateMachine, TransitionResult},
    ClientEvent, ControllerEvent, LogMessage, MotionCommand, TelemetrySnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Inbound events, delivered in transport order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Handshake accepted by the controller
    Connected,
    /// Controller pushed a state snapshot
    Telemetry(TelemetrySnapshot),
    /// Controller emitted an operational message
    Log(String),
    /// Session ended without `close()` (connect failure or lost link)
    Closed { reason: String },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on transport connect, and separately on the handshake
    pub connect_timeout: Duration,
    /// Depth of the inbound and outbound queues
    pub queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(limits::CONNECT_TIMEOUT_MS),
            queue_depth: limits::EVENT_QUEUE_DEPTH,
        }
    }
}

struct SessionTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owned handle to one session.
///
/// All I/O happens on a spawned task that owns the transport. Commands reach
/// it through a bounded queue; inbound events come back through [`recv`].
///
/// [`recv`]: SessionChannel::recv
pub struct SessionChannel<C: TransportConnector> {
    id: Uuid,
    token: AuthToken,
    config: SessionConfig,
    connector: Arc<C>,
    fsm: Arc<RwLock<SessionStateMachine>>,
    outbound_tx: Option<mpsc::Sender<ClientEvent>>,
    /// Handed to the task on `open()`
    event_tx: Option<mpsc::Sender<SessionEvent>>,
    event_rx: Option<mpsc::Receiver<SessionEvent>>,
    task: Option<SessionTask>,
}

impl<C: TransportConnector> SessionChannel<C> {
    /// Create an idle session. Nothing touches the network until `open()`.
    pub fn new(connector: Arc<C>, token: AuthToken, config: SessionConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.queue_depth);

        Self {
            id: Uuid::new_v4(),
            token,
            config,
            connector,
            fsm: Arc::new(RwLock::new(SessionStateMachine::new())),
            outbound_tx: None,
            event_tx: Some(event_tx),
            event_rx: Some(event_rx),
            task: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &str {
        self.connector.address()
    }

    pub async fn state(&self) -> SessionState {
        self.fsm.read().await.state()
    }

    /// Timestamp of the last inbound frame, 0 if none yet
    pub async fn last_seen_ms(&self) -> u64 {
        self.fsm.read().await.last_seen_ms()
    }

    /// Start connecting. Has no effect unless the session is idle.
    pub async fn open(&mut self) {
        match self.fsm.write().await.process_event(LinkEvent::OpenRequested) {
            TransitionResult::Success(_) => {}
            TransitionResult::Unchanged(state) | TransitionResult::Invalid { from: state, .. } => {
                debug!(session = %self.id, "open() ignored, session is {}", state);
                return;
            }
        }

        let Some(event_tx) = self.event_tx.take() else {
            return;
        };
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.queue_depth);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(session = %self.id, "Opening session to {}", self.connector.address());

        let ctx = TaskContext {
            id: self.id,
            token: self.token.as_str().to_string(),
            connect_timeout: self.config.connect_timeout,
            connector: self.connector.clone(),
            fsm: self.fsm.clone(),
            event_tx,
        };
        let handle = tokio::spawn(session_loop(ctx, outbound_rx, shutdown_rx));

        self.outbound_tx = Some(outbound_tx);
        self.task = Some(SessionTask {
            shutdown_tx,
            handle,
        });
    }

    /// Transmit a command. Silently dropped unless the session is open.
    pub async fn send(&self, command: MotionCommand) {
        let state = self.fsm.read().await.state();
        if state != SessionState::Open {
            debug!(session = %self.id, "Dropping {} command, session is {}", command, state);
            return;
        }

        let Some(outbound_tx) = &self.outbound_tx else {
            return;
        };
        if let Err(e) = outbound_tx.try_send(ClientEvent::control(command)) {
            warn!(session = %self.id, "Dropping {} command: {}", command, e);
        }
    }

    /// Next inbound event. Returns `None` once the session is closed and drained.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        match self.event_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Tear the session down. Safe to call any number of times.
    ///
    /// When this returns the transport has been released and no further
    /// event will be delivered.
    pub async fn close(&mut self) {
        if let TransitionResult::Success(_) =
            self.fsm.write().await.process_event(LinkEvent::CloseRequested)
        {
            info!(session = %self.id, "Closing session");
        }

        // Dropping the receiver first means a task blocked on delivery wakes up
        self.event_rx = None;
        self.event_tx = None;
        self.outbound_tx = None;

        if let Some(task) = self.task.take() {
            let _ = task.shutdown_tx.send(());
            if let Err(e) = task.handle.await {
                warn!(session = %self.id, "Session task ended abnormally: {}", e);
            }
        }
    }
}

impl<C: TransportConnector> Drop for SessionChannel<C> {
    fn drop(&mut self) {
        // The task releases the transport on its own once signalled
        if let Some(task) = self.task.take() {
            let _ = task.shutdown_tx.send(());
        }
    }
}

#[async_trait]
impl<C: TransportConnector> CommandSender for SessionChannel<C> {
    async fn send(&self, command: MotionCommand) {
        SessionChannel::send(self, command).await
    }
}

/// State the I/O task shares with its session
struct TaskContext<C: TransportConnector> {
    id: Uuid,
    token: String,
    connect_timeout: Duration,
    connector: Arc<C>,
    fsm: Arc<RwLock<SessionStateMachine>>,
    event_tx: mpsc::Sender<SessionEvent>,
}

/// Why the connection handler returned
enum Exit {
    /// `close()` or drop
    Shutdown,
    /// Handshake refused, link lost, or stream corrupted
    Failed(String),
}

async fn session_loop<C: TransportConnector>(
    ctx: TaskContext<C>,
    mut outbound_rx: mpsc::Receiver<ClientEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let connect = timeout(ctx.connect_timeout, ctx.connector.connect());

    let mut stream = tokio::select! {
        _ = &mut shutdown_rx => {
            debug!(session = %ctx.id, "Connect attempt cancelled");
            return;
        }
        result = connect => match result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                ctx.fail(format!("{:#}", e)).await;
                return;
            }
            Err(_) => {
                ctx.fail(format!("connect timed out after {:?}", ctx.connect_timeout)).await;
                return;
            }
        }
    };

    debug!(session = %ctx.id, "Transport connected, authenticating");

    let exit = {
        let (mut reader, mut writer) = tokio::io::split(&mut stream);
        handle_connection(&ctx, &mut reader, &mut writer, &mut outbound_rx, &mut shutdown_rx).await
    };

    // Release the transport; this is the only place it happens
    if let Err(e) = TransportStream::shutdown(&mut stream).await {
        debug!(session = %ctx.id, "Transport shutdown: {}", e);
    }

    match exit {
        Exit::Shutdown => debug!(session = %ctx.id, "Session task stopped"),
        Exit::Failed(reason) => ctx.fail(reason).await,
    }
}

/// Handle an established transport until shutdown or failure
async fn handle_connection<C, R, W>(
    ctx: &TaskContext<C>,
    reader: &mut R,
    writer: &mut W,
    outbound_rx: &mut mpsc::Receiver<ClientEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Exit
where
    C: TransportConnector,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // The token goes out before anything else
    if let Err(e) = write_event(writer, &ClientEvent::auth(&ctx.token)).await {
        return Exit::Failed(format!("handshake write failed: {:#}", e));
    }

    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 4096];
    let handshake_deadline = tokio::time::sleep(ctx.connect_timeout);
    tokio::pin!(handshake_deadline);
    let mut awaiting_handshake = true;

    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => return Exit::Shutdown,

            _ = &mut handshake_deadline, if awaiting_handshake => {
                return Exit::Failed(format!("handshake timed out after {:?}", ctx.connect_timeout));
            }

            Some(event) = outbound_rx.recv() => {
                // Shutdown wins over a write blocked on a full socket
                tokio::select! {
                    _ = &mut *shutdown_rx => return Exit::Shutdown,
                    result = write_event(writer, &event) => {
                        if let Err(e) = result {
                            return Exit::Failed(format!("write failed: {:#}", e));
                        }
                    }
                }
            }

            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => return Exit::Failed("controller closed the connection".into()),
                    Ok(n) => {
                        decoder.extend(&read_buf[..n]);
                        loop {
                            match decoder.decode_next::<ControllerEvent>() {
                                Ok(Some(event)) => {
                                    if ctx.deliver(event).await {
                                        awaiting_handshake = false;
                                    }
                                }
                                Ok(None) => break,
                                Err(e) if e.is_recoverable() => {
                                    warn!(session = %ctx.id, "Skipping malformed frame: {}", e);
                                }
                                Err(e) => return Exit::Failed(format!("stream corrupted: {}", e)),
                            }
                        }
                    }
                    Err(e) => return Exit::Failed(format!("read error: {}", e)),
                }
            }
        }
    }
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &ClientEvent) -> Result<()> {
    let encoded = codec::encode(event)?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

impl<C: TransportConnector> TaskContext<C> {
    /// Forward one controller event. Returns true if it completed the handshake.
    async fn deliver(&self, event: ControllerEvent) -> bool {
        let forwarded = {
            let mut fsm = self.fsm.write().await;
            fsm.record_activity(now_ms());

            match event {
                ControllerEvent::Connect => match fsm.process_event(LinkEvent::HandshakeComplete) {
                    TransitionResult::Success(_) => Some(SessionEvent::Connected),
                    other => {
                        debug!(session = %self.id, "Ignoring connect: {:?}", other);
                        None
                    }
                },
                _ if !fsm.is_open() => {
                    debug!(session = %self.id, "Ignoring event while {}", fsm.state());
                    None
                }
                ControllerEvent::Telemetry(snapshot) => Some(SessionEvent::Telemetry(snapshot)),
                ControllerEvent::Log(LogMessage { msg }) => Some(SessionEvent::Log(msg)),
            }
        };

        let Some(event) = forwarded else {
            return false;
        };
        let connected = event == SessionEvent::Connected;
        if connected {
            info!(session = %self.id, "Session open");
        }

        // A closed receiver means the session is being torn down
        let _ = self.event_tx.send(event).await;
        connected
    }

    /// Move to `Closed` after a failure and tell the session owner why
    async fn fail(&self, reason: String) {
        let transitioned = {
            let mut fsm = self.fsm.write().await;
            let event = if fsm.is_open() {
                LinkEvent::Disconnected {
                    reason: reason.clone(),
                }
            } else {
                LinkEvent::ConnectFailed {
                    reason: reason.clone(),
                }
            };
            matches!(fsm.process_event(event), TransitionResult::Success(_))
        };

        if transitioned {
            warn!(session = %self.id, "Session closed: {}", reason);
            let _ = self.event_tx.send(SessionEvent::Closed { reason }).await;
        }
    }
}
