//! Session State Machine
//!
//! Defines the lifecycle of one operator session:
//! `Idle -> Connecting -> Open -> Closed`. `Closed` is terminal.

use std::fmt;

/// Connectivity state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Constructed, `open()` not called yet
    Idle,
    /// Transport connecting or handshake in flight
    Connecting,
    /// Handshake accepted, commands flow
    Open,
    /// Torn down; a new session is needed to reconnect
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// `open()` was called
    OpenRequested,
    /// Controller accepted the handshake
    HandshakeComplete,
    /// Transport could not be established or the handshake was refused
    ConnectFailed { reason: String },
    /// Remote end closed or the transport broke
    Disconnected { reason: String },
    /// `close()` was called or the session was dropped
    CloseRequested,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(SessionState),
    /// Event is a no-op in the current state
    Unchanged(SessionState),
    /// Transition was invalid from current state
    Invalid { from: SessionState, event: LinkEvent },
}

/// State machine for one operator session
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    last_seen_ms: u64,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in Idle state
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Idle,
            last_seen_ms: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.current_state
    }

    pub fn is_open(&self) -> bool {
        self.current_state == SessionState::Open
    }

    /// Record inbound activity from the controller
    pub fn record_activity(&mut self, timestamp_ms: u64) {
        self.last_seen_ms = timestamp_ms;
    }

    /// Timestamp of the last inbound frame, 0 if none yet
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: LinkEvent) -> TransitionResult {
        use LinkEvent::*;
        use SessionState::*;

        let next = match (self.current_state, &event) {
            (Idle, OpenRequested) => Connecting,
            (Connecting | Open, OpenRequested) => return TransitionResult::Unchanged(self.current_state),

            (Connecting, HandshakeComplete) => Open,
            (Connecting, ConnectFailed { .. }) => Closed,
            (Open, Disconnected { .. }) => Closed,

            // Close is accepted from every state and repeats are no-ops
            (Closed, CloseRequested) => return TransitionResult::Unchanged(Closed),
            (_, CloseRequested) => Closed,

            _ => {
                return TransitionResult::Invalid {
                    from: self.current_state,
                    event,
                }
            }
        };

        self.current_state = next;
        TransitionResult::Success(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = SessionStateMachine::new();
        assert_eq!(fsm.state(), SessionState::Idle);
        assert_eq!(fsm.last_seen_ms(), 0);
    }

    #[test]
    fn test_normal_lifecycle() {
        let mut fsm = SessionStateMachine::new();

        let result = fsm.process_event(LinkEvent::OpenRequested);
        assert_eq!(result, TransitionResult::Success(SessionState::Connecting));

        let result = fsm.process_event(LinkEvent::HandshakeComplete);
        assert_eq!(result, TransitionResult::Success(SessionState::Open));
        assert!(fsm.is_open());

        let result = fsm.process_event(LinkEvent::CloseRequested);
        assert_eq!(result, TransitionResult::Success(SessionState::Closed));
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(LinkEvent::OpenRequested);

        let result = fsm.process_event(LinkEvent::OpenRequested);
        assert_eq!(result, TransitionResult::Unchanged(SessionState::Connecting));

        fsm.process_event(LinkEvent::HandshakeComplete);
        let result = fsm.process_event(LinkEvent::OpenRequested);
        assert_eq!(result, TransitionResult::Unchanged(SessionState::Open));
    }

    #[test]
    fn test_connect_failure_is_terminal() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(LinkEvent::OpenRequested);
        fsm.process_event(LinkEvent::ConnectFailed {
            reason: "refused".into(),
        });
        assert_eq!(fsm.state(), SessionState::Closed);

        let result = fsm.process_event(LinkEvent::OpenRequested);
        assert!(matches!(result, TransitionResult::Invalid { from: SessionState::Closed, .. }));

        let result = fsm.process_event(LinkEvent::HandshakeComplete);
        assert!(matches!(result, TransitionResult::Invalid { .. }));
        assert_eq!(fsm.state(), SessionState::Closed);
    }

    #[test]
    fn test_handshake_only_once() {
        let mut fsm = SessionStateMachine::new();
        fsm.process_event(LinkEvent::OpenRequested);
        fsm.process_event(LinkEvent::HandshakeComplete);

        let result = fsm.process_event(LinkEvent::HandshakeComplete);
        assert!(matches!(result, TransitionResult::Invalid { from: SessionState::Open, .. }));
    }

    #[test]
    fn test_close_twice() {
        let mut fsm = SessionStateMachine::new();
        assert_eq!(
            fsm.process_event(LinkEvent::CloseRequested),
            TransitionResult::Success(SessionState::Closed)
        );
        assert_eq!(
            fsm.process_event(LinkEvent::CloseRequested),
            TransitionResult::Unchanged(SessionState::Closed)
        );
    }

    #[test]
    fn test_disconnect_only_from_open() {
        let mut fsm = SessionStateMachine::new();
        let result = fsm.process_event(LinkEvent::Disconnected {
            reason: "eof".into(),
        });
        assert!(matches!(result, TransitionResult::Invalid { from: SessionState::Idle, .. }));

        fsm.process_event(LinkEvent::OpenRequested);
        fsm.process_event(LinkEvent::HandshakeComplete);
        fsm.record_activity(1234);
        fsm.process_event(LinkEvent::Disconnected {
            reason: "eof".into(),
        });
        assert_eq!(fsm.state(), SessionState::Closed);
        assert_eq!(fsm.last_seen_ms(), 1234);
    }
}
