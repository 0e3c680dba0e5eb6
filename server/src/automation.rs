//! Telemetry broadcast and automatic spraying

use crate::hardware::{DetectionFilter, Detector, DistanceSensor, Sprinkler};
use crate::session::SessionManager;
use crate::state::RoverState;
use krushinova_shared::{ControllerEvent, TelemetrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

pub const AUTO_SPRAY_MESSAGE: &str = "Auto-Spray Triggered!";

/// Reported status while the sprinkler relay is on
pub const SPRAYING_STATUS: &str = "Spraying";

/// Distance window in which a detected target gets sprayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SprayWindow {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl SprayWindow {
    pub fn contains(&self, distance: f64) -> bool {
        (self.min_cm..=self.max_cm).contains(&distance)
    }
}

pub struct Automation {
    sensor: Arc<dyn DistanceSensor>,
    detector: Arc<dyn Detector>,
    filter: DetectionFilter,
    sprinkler: Arc<Sprinkler>,
    window: SprayWindow,
    state: Arc<RoverState>,
    sessions: Arc<SessionManager>,
}

impl Automation {
    pub fn new(
        sensor: Arc<dyn DistanceSensor>,
        detector: Arc<dyn Detector>,
        filter: DetectionFilter,
        sprinkler: Arc<Sprinkler>,
        window: SprayWindow,
        state: Arc<RoverState>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            sensor,
            detector,
            filter,
            sprinkler,
            window,
            state,
            sessions,
        }
    }

    /// Tick forever at `period`
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Read sensors, push telemetry, spray if a target is in range
    pub async fn tick(&self) -> TelemetrySnapshot {
        let distance = self.sensor.distance_cm();
        let detections = self.filter.apply(self.detector.detect());
        self.state.record_reading(distance, detections).await;

        let mut snapshot = self.state.snapshot().await;
        if self.sprinkler.is_spraying() {
            snapshot.status = SPRAYING_STATUS.to_string();
        }
        self.sessions
            .broadcast(&ControllerEvent::Telemetry(snapshot.clone()))
            .await;

        if let Some(cm) = self.spray_distance(&snapshot) {
            if self.sprinkler.activate().await {
                info!("Auto-spray #{} at {:.1} cm", self.sprinkler.activations(), cm);
                self.sessions
                    .broadcast(&ControllerEvent::log(AUTO_SPRAY_MESSAGE))
                    .await;
            }
        }

        snapshot
    }

    /// Distance to spray at, if a target sits inside the window
    fn spray_distance(&self, snapshot: &TelemetrySnapshot) -> Option<f64> {
        if snapshot.detections.is_empty() {
            return None;
        }
        snapshot.distance_cm().filter(|cm| self.window.contains(*cm))
    }
}
