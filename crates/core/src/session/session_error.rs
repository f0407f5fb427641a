use std::fmt;

use thiserror::Error;

/// Why the commit gate is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotReadyReason {
    SessionNotOpen,
    NoFaceDetected,
    SubmissionInFlight,
    IdentityHintRequired,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::SessionNotOpen => write!(f, "no session is open"),
            NotReadyReason::NoFaceDetected => write!(f, "no face detected in the frame"),
            NotReadyReason::SubmissionInFlight => write!(f, "a submission is already in flight"),
            NotReadyReason::IdentityHintRequired => write!(f, "a student ID is required"),
        }
    }
}

/// Errors returned to the UI by session commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a session is already open")]
    AlreadyOpen,
    #[error("not ready to commit: {0}")]
    NotReady(NotReadyReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// Issued under a generation that has since been superseded.
    StaleGeneration,
    /// A response with an equal or newer sequence was already applied.
    StaleSequence,
    /// The session closed after the request was issued.
    SessionClosed,
    /// The poller that issued the request was stopped.
    PollerStopped,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::StaleGeneration => "stale_generation",
            DiscardReason::StaleSequence => "stale_sequence",
            DiscardReason::SessionClosed => "session_closed",
            DiscardReason::PollerStopped => "poller_stopped",
        }
    }
}

/// An asynchronous response that arrived too late to be applied.
///
/// Internal only: never shown to the user, but counted and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("discarded {kind} response (generation {generation}, sequence {sequence:?}): {}", .reason.as_str())]
pub struct StaleResponseDiscarded {
    pub kind: ResponseKind,
    pub reason: DiscardReason,
    pub generation: u64,
    pub sequence: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    Detection,
    Submission,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseKind::Detection => write!(f, "detection"),
            ResponseKind::Submission => write!(f, "submission"),
        }
    }
}
