//! Operator command handling on the controller
//!
//! This module handles:
//! - Applying motion commands to the motor driver
//! - Replacing `forward` with `stop` when an obstacle is too close

mod dispatcher;

pub use dispatcher::CommandDispatcher;
