use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// A detector's judgement on one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub face_detected: bool,
    pub confidence: Option<f64>,
    pub bounding_box: Option<BoundingBox>,
}

impl Detection {
    pub fn no_face() -> Self {
        Self {
            face_detected: false,
            confidence: None,
            bounding_box: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("detector timed out")]
    Timeout,
    #[error("detector rejected frame (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid detector response: {0}")]
    InvalidResponse(String),
}

/// Domain interface for the remote face-presence check.
///
/// Unlike a frame-by-frame tracker, calls overlap: the poller issues a new
/// request every tick regardless of whether earlier ones have returned, so
/// implementations take `&self` and must be `Sync`.
pub trait PresenceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Detection, DetectorError>;
}
