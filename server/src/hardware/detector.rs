//! Object detection results

use krushinova_shared::Detection;

pub trait Detector: Send + Sync {
    /// Detections from the most recent frame
    fn detect(&self) -> Vec<Detection>;
}

/// Stands in when no camera or model is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl Detector for NullDetector {
    fn detect(&self) -> Vec<Detection> {
        Vec::new()
    }
}

/// Keeps detections of the target classes above a confidence threshold
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    pub confidence_threshold: f64,
    pub target_classes: Vec<u64>,
}

impl DetectionFilter {
    pub fn accepts(&self, detection: &Detection) -> bool {
        let confident = detection
            .confidence()
            .is_some_and(|conf| conf >= self.confidence_threshold);
        let targeted = detection
            .class_id()
            .is_some_and(|class| self.target_classes.contains(&class));
        confident && targeted
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections.into_iter().filter(|d| self.accepts(d)).collect()
    }
}

/// Returns whatever it was last given
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedDetector(std::sync::Mutex<Vec<Detection>>);

#[cfg(test)]
impl ScriptedDetector {
    pub fn set(&self, detections: Vec<Detection>) {
        *self.0.lock().unwrap() = detections;
    }
}

#[cfg(test)]
impl Detector for ScriptedDetector {
    fn detect(&self) -> Vec<Detection> {
        self.0.lock().unwrap().clone()
    }
}
