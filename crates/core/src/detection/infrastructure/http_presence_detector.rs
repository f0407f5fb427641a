use std::sync::Arc;

use serde::Deserialize;

use crate::detection::domain::presence_detector::{Detection, DetectorError, PresenceDetector};
use crate::shared::api_client::{ApiClient, ApiResponse};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{CHECK_FACE_PATH, IMAGE_FIELD};
use crate::shared::frame::Frame;

#[derive(Deserialize)]
struct CheckFaceBody {
    face_detected: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    face_position: Option<BoundingBox>,
}

/// Detector backed by the server's `check_face` endpoint.
pub struct HttpPresenceDetector {
    api: Arc<ApiClient>,
}

impl HttpPresenceDetector {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

impl PresenceDetector for HttpPresenceDetector {
    fn detect(&self, frame: &Frame) -> Result<Detection, DetectorError> {
        let response = self
            .api
            .post_frame(CHECK_FACE_PATH, IMAGE_FIELD, frame, &[])
            .map_err(|e| {
                if e.is_timeout() {
                    DetectorError::Timeout
                } else {
                    DetectorError::Unavailable(e.to_string())
                }
            })?;
        parse_check_face(&response)
    }
}

/// Interprets a `check_face` reply.
///
/// A face is only reported when the server says so; a missing position is
/// tolerated, a missing or malformed `face_detected` is not.
pub fn parse_check_face(response: &ApiResponse) -> Result<Detection, DetectorError> {
    if !response.is_success() {
        return Err(DetectorError::Rejected {
            status: response.status,
            message: response
                .error_message()
                .unwrap_or_else(|| format!("HTTP {}", response.status)),
        });
    }

    let body: CheckFaceBody = serde_json::from_str(&response.body)
        .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;

    if !body.face_detected {
        return Ok(Detection::no_face());
    }
    Ok(Detection {
        face_detected: true,
        confidence: body.confidence,
        bounding_box: body.face_position,
    })
}
