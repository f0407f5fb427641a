use std::time::Duration;

use crate::shared::constants::{DEFAULT_MAX_PENDING_DETECTIONS, DEFAULT_POLL_INTERVAL};

/// Tuning for one live verification session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    poll_interval: Duration,
    max_pending_detections: usize,
}

impl SessionConfig {
    pub fn new(
        poll_interval: Duration,
        max_pending_detections: usize,
    ) -> Result<Self, &'static str> {
        if poll_interval.is_zero() {
            return Err("poll_interval must be > 0");
        }
        if max_pending_detections < 1 {
            return Err("max_pending_detections must be >= 1");
        }
        Ok(Self {
            poll_interval,
            max_pending_detections,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_pending_detections(&self) -> usize {
        self.max_pending_detections
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_pending_detections: DEFAULT_MAX_PENDING_DETECTIONS,
        }
    }
}
