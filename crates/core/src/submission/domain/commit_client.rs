use serde::Deserialize;
use thiserror::Error;

use crate::shared::frame::Frame;

/// How a commit endpoint treats the caller's identity hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityHintPolicy {
    /// The hint is dropped before the call; the server matches by face alone.
    Ignored,
    /// Sent when present.
    Optional,
    /// Commit is refused without one.
    Required,
}

/// Successful reply from a commit endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitReceipt {
    pub status: u16,
    pub message: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CourseSummary {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StudentSummary {
    #[serde(default)]
    pub student_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub course: Option<CourseSummary>,
}

impl StudentSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Typed view of a `mark_attendance` receipt.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub student: Option<StudentSummary>,
    pub date: String,
    #[serde(default)]
    pub time_in: Option<String>,
    pub status: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

impl CommitReceipt {
    /// Parses the body as an attendance record; `None` for other endpoints.
    pub fn attendance(&self) -> Option<AttendanceRecord> {
        serde_json::from_value(self.body.clone()).ok()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("no frame available to submit")]
    NoFrame,
    #[error("commit rejected (HTTP {status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<String>,
    },
    #[error("commit request failed: {0}")]
    Transport(String),
    #[error("invalid commit response: {0}")]
    InvalidResponse(String),
}

/// Domain interface for the attendance / registration action.
///
/// Assumed non-idempotent: callers must invoke it at most once per user
/// action and never retry on failure.
pub trait CommitClient: Send + Sync {
    fn commit(&self, frame: &Frame, identity_hint: Option<&str>)
        -> Result<CommitReceipt, CommitError>;

    fn identity_hint_policy(&self) -> IdentityHintPolicy {
        IdentityHintPolicy::Optional
    }
}
