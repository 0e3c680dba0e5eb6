//! Rover hardware behind narrow traits
//!
//! This module handles:
//! - Driving the motors for each motion command
//! - Timed sprinkler activation with a cooldown
//! - Ultrasonic distance readings
//! - Object detection results from the vision pipeline
//!
//! Only mock implementations ship here; a board build swaps them in `main`.

mod detector;
mod motors;
mod sensor;
mod sprinkler;

pub use detector::{Detector, DetectionFilter, NullDetector};
pub use motors::{MockMotors, MotorDriver};
pub use sensor::{DistanceSensor, MockUltrasonic};
pub use sprinkler::Sprinkler;

#[cfg(test)]
pub use detector::ScriptedDetector;
#[cfg(test)]
pub use sensor::FixedSensor;
