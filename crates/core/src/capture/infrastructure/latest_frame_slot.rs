use std::sync::Mutex;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Push-based frame source: a camera thread publishes, sessions capture
/// the most recent frame.
#[derive(Default)]
pub struct LatestFrameSlot {
    latest: Mutex<Option<Frame>>,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame.
    pub fn publish(&self, frame: Frame) {
        *self.latest.lock().unwrap() = Some(frame);
    }

    /// Drops the current frame, e.g. when the camera disconnects.
    pub fn clear(&self) {
        *self.latest.lock().unwrap() = None;
    }
}

impl FrameSource for LatestFrameSlot {
    fn capture(&self) -> Option<Frame> {
        self.latest.lock().unwrap().clone()
    }
}
