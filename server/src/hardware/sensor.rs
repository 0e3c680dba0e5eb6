//! Ultrasonic distance sensor

use rand::Rng;

pub trait DistanceSensor: Send + Sync {
    /// Distance to the nearest obstacle in cm; negative when the read failed
    fn distance_cm(&self) -> f64;
}

/// Uniform random readings across the sensor's useful range
#[derive(Debug, Clone)]
pub struct MockUltrasonic {
    min_cm: f64,
    max_cm: f64,
}

impl MockUltrasonic {
    pub fn new() -> Self {
        Self {
            min_cm: 5.0,
            max_cm: 150.0,
        }
    }
}

impl Default for MockUltrasonic {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceSensor for MockUltrasonic {
    fn distance_cm(&self) -> f64 {
        rand::rng().random_range(self.min_cm..=self.max_cm)
    }
}

/// Always returns the same reading
#[cfg(test)]
#[derive(Debug)]
pub struct FixedSensor(pub std::sync::Mutex<f64>);

#[cfg(test)]
impl FixedSensor {
    pub fn new(cm: f64) -> Self {
        Self(std::sync::Mutex::new(cm))
    }

    pub fn set(&self, cm: f64) {
        *self.0.lock().unwrap() = cm;
    }
}

#[cfg(test)]
impl DistanceSensor for FixedSensor {
    fn distance_cm(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}
