//! Motor driver

use krushinova_shared::MotionCommand;
use tracing::info;

pub trait MotorDriver: Send + Sync {
    fn drive(&self, command: MotionCommand);

    /// Halt before shutdown
    fn release(&self) {
        self.drive(MotionCommand::Stop);
    }
}

/// Logs each command instead of toggling pins
#[derive(Debug, Default)]
pub struct MockMotors {
    #[cfg(test)]
    history: std::sync::Mutex<Vec<MotionCommand>>,
}

impl MockMotors {
    pub fn new() -> Self {
        info!("Initializing motor driver (mock)");
        Self::default()
    }

    /// Commands driven so far, oldest first
    #[cfg(test)]
    pub fn history(&self) -> Vec<MotionCommand> {
        self.history.lock().unwrap().clone()
    }
}

impl MotorDriver for MockMotors {
    fn drive(&self, command: MotionCommand) {
        info!("MOTORS: {}", command);
        #[cfg(test)]
        self.history.lock().unwrap().push(command);
    }
}
