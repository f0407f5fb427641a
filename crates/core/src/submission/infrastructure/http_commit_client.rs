use std::sync::Arc;

use crate::shared::api_client::{ApiClient, ApiResponse};
use crate::shared::constants::STUDENT_ID_FIELD;
use crate::shared::frame::Frame;
use crate::submission::domain::commit_client::{
    CommitClient, CommitError, CommitReceipt, IdentityHintPolicy,
};

/// Commit client posting the frame (and optional `student_id`) to one
/// REST endpoint. Endpoints disagree on the file field name, so it is
/// configured alongside the path.
pub struct HttpCommitClient {
    api: Arc<ApiClient>,
    path: &'static str,
    file_field: &'static str,
    policy: IdentityHintPolicy,
}

impl HttpCommitClient {
    pub fn new(
        api: Arc<ApiClient>,
        path: &'static str,
        file_field: &'static str,
        policy: IdentityHintPolicy,
    ) -> Self {
        Self {
            api,
            path,
            file_field,
            policy,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn file_field(&self) -> &'static str {
        self.file_field
    }
}

impl CommitClient for HttpCommitClient {
    fn commit(
        &self,
        frame: &Frame,
        identity_hint: Option<&str>,
    ) -> Result<CommitReceipt, CommitError> {
        let fields: Vec<(&'static str, String)> = identity_hint
            .map(|hint| vec![(STUDENT_ID_FIELD, hint.to_string())])
            .unwrap_or_default();

        let response = self
            .api
            .post_frame(self.path, self.file_field, frame, &fields)
            .map_err(|e| CommitError::Transport(e.to_string()))?;
        parse_commit_response(&response)
    }

    fn identity_hint_policy(&self) -> IdentityHintPolicy {
        self.policy
    }
}

pub fn parse_commit_response(response: &ApiResponse) -> Result<CommitReceipt, CommitError> {
    if !response.is_success() {
        return Err(CommitError::Rejected {
            status: response.status,
            message: response
                .error_message()
                .unwrap_or_else(|| format!("request failed with HTTP {}", response.status)),
            details: response.error_details(),
        });
    }

    let body: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| CommitError::InvalidResponse(e.to_string()))?;
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string);

    Ok(CommitReceipt {
        status: response.status,
        message,
        body,
    })
}
