use crate::shared::frame::Frame;
use crate::submission::domain::commit_client::{CommitError, CommitReceipt};

/// One triggered commit, bound to the session generation that issued it.
#[derive(Debug)]
pub struct SubmissionRequest {
    generation: u64,
    frame: Frame,
    identity_hint: Option<String>,
}

impl SubmissionRequest {
    pub fn new(generation: u64, frame: Frame, identity_hint: Option<String>) -> Self {
        Self {
            generation,
            frame,
            identity_hint,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn identity_hint(&self) -> Option<&str> {
        self.identity_hint.as_deref()
    }
}

/// Terminal result of a submission, reported once.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionOutcome {
    pub generation: u64,
    pub result: Result<CommitReceipt, CommitError>,
}

impl SubmissionOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}
