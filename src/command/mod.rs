//! Operator input to motion commands
//!
//! This module handles:
//! - The static table binding keys and on-screen controls to commands
//! - Press/release semantics for keyboard and pointer input
//! - Handing each emitted command to a [`CommandSender`]

mod bindings;
mod encoder;

pub use bindings::{lookup, CommandKeyBinding, Gesture, InputEvent, InputSource, BINDINGS};
pub use encoder::{CommandEncoder, CommandSender, KeyReleasePolicy};
