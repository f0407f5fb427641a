use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ApiClientError {
    #[error("invalid API base URL '{0}': expected http:// or https://")]
    InvalidBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Raw HTTP reply: status code and body text. Interpretation is left to
/// the detector and commit clients.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Thin blocking client for the attendance REST API.
///
/// Every request carries the configured timeout so a stalled server can
/// never hold a detection or commit thread indefinitely.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiClientError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiClientError::Build)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `frame` as multipart file field `file_field`, plus any extra
    /// text fields.
    pub fn post_frame(
        &self,
        path: &str,
        file_field: &'static str,
        frame: &Frame,
        fields: &[(&'static str, String)],
    ) -> Result<ApiResponse, reqwest::Error> {
        let part = Part::bytes(frame.data().to_vec())
            .file_name(frame.file_name())
            .mime_str(frame.mime_type())?;
        let mut form = Form::new().part(file_field, part);
        for (name, value) in fields {
            form = form.text(*name, value.clone());
        }

        let response = self.http.post(self.endpoint(path)).multipart(form).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ApiResponse { status, body })
    }
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-provided `error` message from a non-2xx JSON body, if any.
    pub fn error_message(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
    }

    /// Server-provided `details` payload from a non-2xx JSON body, rendered as text.
    pub fn error_details(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        match value.get("details")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
