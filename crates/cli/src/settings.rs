use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rollcall_core::shared::constants::{
    DEFAULT_API_URL, DEFAULT_MAX_PENDING_DETECTIONS, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
use rollcall_core::workflow::capture_workflow::CaptureWorkflow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write settings to {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("no configuration directory on this platform")]
    NoConfigDir,
}

/// Persistent defaults for the CLI. Command-line flags override each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub workflow: CaptureWorkflow,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub max_pending_detections: usize,
    pub max_wait_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            workflow: CaptureWorkflow::Instant,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            max_pending_detections: DEFAULT_MAX_PENDING_DETECTIONS,
            max_wait_secs: 30,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rollcall").join("settings.json"))
    }

    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source: io::Error| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }
}
