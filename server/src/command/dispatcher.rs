//! Command dispatcher for driving the motors

use crate::hardware::MotorDriver;
use crate::session::SessionManager;
use crate::state::RoverState;
use krushinova_shared::{ControllerEvent, MotionCommand};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies operator commands to the motors, refusing to drive forward into
/// an obstacle.
pub struct CommandDispatcher {
    motors: Arc<dyn MotorDriver>,
    state: Arc<RoverState>,
    sessions: Arc<SessionManager>,
    obstacle_stop_cm: f64,
}

impl CommandDispatcher {
    pub fn new(
        motors: Arc<dyn MotorDriver>,
        state: Arc<RoverState>,
        sessions: Arc<SessionManager>,
        obstacle_stop_cm: f64,
    ) -> Self {
        Self {
            motors,
            state,
            sessions,
            obstacle_stop_cm,
        }
    }

    /// Drive the motors and return the command actually applied
    pub async fn dispatch(&self, command: MotionCommand) -> MotionCommand {
        let applied = match (command, self.state.distance().await) {
            (MotionCommand::Forward, Some(distance)) if self.is_blocked(distance) => {
                warn!("Obstacle at {:.1} cm, refusing forward", distance);
                self.sessions
                    .broadcast(&ControllerEvent::log(format!(
                        "Obstacle at {:.1} cm, stopping",
                        distance
                    )))
                    .await;
                MotionCommand::Stop
            }
            _ => command,
        };

        debug!("Dispatching {} (requested {})", applied, command);
        self.motors.drive(applied);
        self.state.record_command(applied).await;
        applied
    }

    /// Negative readings are sensor failures, not obstacles
    fn is_blocked(&self, distance: f64) -> bool {
        (0.0..self.obstacle_stop_cm).contains(&distance)
    }
}
