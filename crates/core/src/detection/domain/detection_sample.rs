use std::time::SystemTime;

use crate::detection::domain::presence_detector::Detection;
use crate::shared::bounding_box::BoundingBox;

/// The detection state applied to a session for one poll tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSample {
    pub sequence: u64,
    pub face_detected: bool,
    pub confidence: Option<f64>,
    pub bounding_box: Option<BoundingBox>,
    pub observed_at: SystemTime,
}

impl DetectionSample {
    pub fn from_detection(sequence: u64, detection: Detection) -> Self {
        Self {
            sequence,
            face_detected: detection.face_detected,
            confidence: detection.confidence,
            bounding_box: detection.bounding_box,
            observed_at: SystemTime::now(),
        }
    }

    /// Sample applied when the detector fails: no face, no geometry.
    ///
    /// Replaces whatever was current so a "detected" state never outlives
    /// a failed check.
    pub fn fail_safe(sequence: u64) -> Self {
        Self::from_detection(sequence, Detection::no_face())
    }
}
