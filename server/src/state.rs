//! Rover state reported in telemetry

use krushinova_shared::{Detection, MotionCommand, TelemetrySnapshot};
use tokio::sync::RwLock;

pub const IDLE_STATUS: &str = "Idle";

#[derive(Debug)]
struct Inner {
    distance: Option<f64>,
    status: String,
    detections: Vec<Detection>,
}

/// Written by the automation loop and the command dispatcher
#[derive(Debug)]
pub struct RoverState {
    inner: RwLock<Inner>,
}

impl RoverState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                distance: None,
                status: IDLE_STATUS.to_string(),
                detections: Vec::new(),
            }),
        }
    }

    pub async fn record_reading(&self, distance: f64, detections: Vec<Detection>) {
        let mut inner = self.inner.write().await;
        inner.distance = Some(distance);
        inner.detections = detections;
    }

    pub async fn record_command(&self, command: MotionCommand) {
        self.inner.write().await.status = status_for(command);
    }

    /// Last sensor reading, `None` before the first one
    pub async fn distance(&self) -> Option<f64> {
        self.inner.read().await.distance
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        let inner = self.inner.read().await;
        TelemetrySnapshot::new(
            inner.distance.unwrap_or(0.0),
            inner.status.clone(),
            inner.detections.clone(),
        )
    }
}

impl Default for RoverState {
    fn default() -> Self {
        Self::new()
    }
}

fn status_for(command: MotionCommand) -> String {
    match command {
        MotionCommand::Stop => "Stopped".to_string(),
        direction => format!("Moving {}", direction),
    }
}
