use crate::detection::domain::detection_sample::DetectionSample;
use crate::submission::domain::submission::SubmissionOutcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open,
    Closed,
}

/// Notifications delivered to subscribers, in the order they were applied.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Opened { generation: u64 },
    DetectionChanged(DetectionSample),
    SubmissionCompleted(SubmissionOutcome),
    Closed { generation: u64 },
}
