use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::infrastructure::http_presence_detector::HttpPresenceDetector;
use crate::session::session_config::SessionConfig;
use crate::session::session_controller::SessionController;
use crate::session::session_logger::SessionLogger;
use crate::shared::api_client::ApiClient;
use crate::shared::constants::{
    IMAGE_FIELD, MARK_ATTENDANCE_PATH, PHOTO_FIELD, UPLOAD_PHOTO_PATH,
};
use crate::submission::domain::commit_client::IdentityHintPolicy;
use crate::submission::infrastructure::http_commit_client::HttpCommitClient;

/// The camera pages of the attendance app. All three run the same live
/// session and differ only in where the frame is committed and whether a
/// student ID goes with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureWorkflow {
    /// Face match only; any student ID is dropped.
    Instant,
    /// Face match, optionally narrowed to one student.
    Mark,
    /// Stores the frame as a student's reference photo.
    Register,
}

impl CaptureWorkflow {
    pub const ALL: &[CaptureWorkflow] = &[
        CaptureWorkflow::Instant,
        CaptureWorkflow::Mark,
        CaptureWorkflow::Register,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|w| w.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            CaptureWorkflow::Instant => "instant",
            CaptureWorkflow::Mark => "mark",
            CaptureWorkflow::Register => "register",
        }
    }

    pub fn commit_path(&self) -> &'static str {
        match self {
            CaptureWorkflow::Instant | CaptureWorkflow::Mark => MARK_ATTENDANCE_PATH,
            CaptureWorkflow::Register => UPLOAD_PHOTO_PATH,
        }
    }

    /// Multipart field the endpoint reads the frame from.
    pub fn file_field(&self) -> &'static str {
        match self {
            CaptureWorkflow::Instant | CaptureWorkflow::Mark => IMAGE_FIELD,
            CaptureWorkflow::Register => PHOTO_FIELD,
        }
    }

    pub fn hint_policy(&self) -> IdentityHintPolicy {
        match self {
            CaptureWorkflow::Instant => IdentityHintPolicy::Ignored,
            CaptureWorkflow::Mark => IdentityHintPolicy::Optional,
            CaptureWorkflow::Register => IdentityHintPolicy::Required,
        }
    }

    pub fn commit_client(&self, api: Arc<ApiClient>) -> HttpCommitClient {
        HttpCommitClient::new(
            api,
            self.commit_path(),
            self.file_field(),
            self.hint_policy(),
        )
    }

    /// Wires a session against the REST API for this workflow.
    pub fn build_session(
        &self,
        api: Arc<ApiClient>,
        frame_source: Arc<dyn FrameSource>,
        config: SessionConfig,
        logger: Box<dyn SessionLogger>,
    ) -> SessionController {
        log::info!(
            "Building {} session against {}{}",
            self.name(),
            api.base_url(),
            self.commit_path()
        );
        let detector = Arc::new(HttpPresenceDetector::new(api.clone()));
        let commit_client = Arc::new(self.commit_client(api));
        SessionController::with_logger(frame_source, detector, commit_client, config, logger)
    }
}

impl std::fmt::Display for CaptureWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureWorkflow::Instant => write!(f, "Instant attendance"),
            CaptureWorkflow::Mark => write!(f, "Mark attendance"),
            CaptureWorkflow::Register => write!(f, "Register photo"),
        }
    }
}
