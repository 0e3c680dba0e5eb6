//! Command encoder - turns input gestures into motion commands

use super::bindings::{self, Gesture, InputEvent, InputSource};
use async_trait::async_trait;
use krushinova_shared::MotionCommand;
use serde::Deserialize;
use tracing::debug;

/// Receives every command the encoder emits
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send(&self, command: MotionCommand);
}

/// What releasing a bound arrow key does.
///
/// `Ignore` keeps the rover moving after the key comes up, which is the
/// established console behaviour. `Stop` makes keys momentary like the
/// on-screen controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyReleasePolicy {
    #[default]
    Ignore,
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct CommandEncoder {
    key_release: KeyReleasePolicy,
}

impl CommandEncoder {
    pub fn new(key_release: KeyReleasePolicy) -> Self {
        Self { key_release }
    }

    /// Map an input event to the command it emits, if any.
    ///
    /// Every press emits; there is no debouncing of held keys.
    pub fn encode(&self, event: &InputEvent) -> Option<MotionCommand> {
        let command = bindings::lookup(event.source, &event.id)?;

        match (event.gesture, event.source) {
            (Gesture::Press, _) => Some(command),
            // The stop control acts on activation only
            (Gesture::Release, _) if command == MotionCommand::Stop => None,
            (Gesture::Release, InputSource::Pointer) => Some(MotionCommand::Stop),
            (Gesture::Release, InputSource::Keyboard) => match self.key_release {
                KeyReleasePolicy::Ignore => None,
                KeyReleasePolicy::Stop => Some(MotionCommand::Stop),
            },
        }
    }

    /// Encode and hand the command to `sender`
    pub async fn dispatch<S>(&self, event: &InputEvent, sender: &S) -> Option<MotionCommand>
    where
        S: CommandSender + ?Sized,
    {
        let Some(command) = self.encode(event) else {
            debug!("No command for {:?} {:?} {:?}", event.source, event.gesture, event.id);
            return None;
        };
        sender.send(command).await;
        Some(command)
    }
}
