//! Session Channel to the rover controller
//!
//! This module handles:
//! - One authenticated event connection per operator session
//! - The `Idle -> Connecting -> Open -> Closed` lifecycle
//! - Dropping commands while the session is not open
//! - Tearing down the previous session before a replacement goes live

mod active;
mod session;

pub use active::ActiveSession;
pub use session::{SessionChannel, SessionConfig, SessionEvent};
