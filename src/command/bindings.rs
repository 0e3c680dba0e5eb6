//! Input identifiers and the commands they are bound to

use krushinova_shared::MotionCommand;

/// How an input reached the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Keyboard,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Press,
    Release,
}

/// A discrete input event from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub source: InputSource,
    pub gesture: Gesture,
    /// Key name (`ArrowUp`) or control name (`forward`)
    pub id: String,
}

impl InputEvent {
    pub fn key_down(id: impl Into<String>) -> Self {
        Self::new(InputSource::Keyboard, Gesture::Press, id)
    }

    pub fn key_up(id: impl Into<String>) -> Self {
        Self::new(InputSource::Keyboard, Gesture::Release, id)
    }

    pub fn pointer_down(id: impl Into<String>) -> Self {
        Self::new(InputSource::Pointer, Gesture::Press, id)
    }

    pub fn pointer_up(id: impl Into<String>) -> Self {
        Self::new(InputSource::Pointer, Gesture::Release, id)
    }

    fn new(source: InputSource, gesture: Gesture, id: impl Into<String>) -> Self {
        Self {
            source,
            gesture,
            id: id.into(),
        }
    }
}

/// One entry of the binding table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandKeyBinding {
    pub source: InputSource,
    pub id: &'static str,
    pub command: MotionCommand,
}

const fn bind(source: InputSource, id: &'static str, command: MotionCommand) -> CommandKeyBinding {
    CommandKeyBinding { source, id, command }
}

/// Fixed for the process lifetime. The space bar is the keyboard form of the stop control.
pub const BINDINGS: &[CommandKeyBinding] = &[
    bind(InputSource::Keyboard, "ArrowUp", MotionCommand::Forward),
    bind(InputSource::Keyboard, "ArrowDown", MotionCommand::Backward),
    bind(InputSource::Keyboard, "ArrowLeft", MotionCommand::Left),
    bind(InputSource::Keyboard, "ArrowRight", MotionCommand::Right),
    bind(InputSource::Keyboard, " ", MotionCommand::Stop),
    bind(InputSource::Pointer, "forward", MotionCommand::Forward),
    bind(InputSource::Pointer, "backward", MotionCommand::Backward),
    bind(InputSource::Pointer, "left", MotionCommand::Left),
    bind(InputSource::Pointer, "right", MotionCommand::Right),
    bind(InputSource::Pointer, "stop", MotionCommand::Stop),
];

/// Command bound to an input identifier, if any
pub fn lookup(source: InputSource, id: &str) -> Option<MotionCommand> {
    BINDINGS
        .iter()
        .find(|b| b.source == source && b.id == id)
        .map(|b| b.command)
}
