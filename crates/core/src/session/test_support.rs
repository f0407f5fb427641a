//! Fakes for exercising sessions without a camera or server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::presence_detector::{Detection, DetectorError, PresenceDetector};
use crate::session::session_event::SessionEvent;
use crate::shared::frame::fixtures::jpeg_frame;
use crate::shared::frame::Frame;
use crate::submission::domain::commit_client::{
    CommitClient, CommitError, CommitReceipt, IdentityHintPolicy,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Yields JPEG frames numbered 1, 2, 3, ... so the Nth capture has index N.
pub struct CountingFrameSource {
    next: AtomicU64,
    available: AtomicBool,
}

impl CountingFrameSource {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn captures(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

impl FrameSource for CountingFrameSource {
    fn capture(&self) -> Option<Frame> {
        if !self.available.load(Ordering::SeqCst) {
            return None;
        }
        Some(jpeg_frame(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

pub fn face() -> Result<Detection, DetectorError> {
    Ok(Detection {
        face_detected: true,
        confidence: Some(0.9),
        bounding_box: None,
    })
}

pub fn no_face() -> Result<Detection, DetectorError> {
    Ok(Detection::no_face())
}

/// Detector whose answer and latency are scripted per frame index.
///
/// A gated frame blocks its detect call until the returned sender fires
/// (or is dropped), which lets tests force responses out of order.
pub struct ScriptedDetector {
    default: Result<Detection, DetectorError>,
    results: Mutex<HashMap<u64, Result<Detection, DetectorError>>>,
    gates: Mutex<HashMap<u64, Receiver<()>>>,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(default: Result<Detection, DetectorError>) -> Self {
        Self {
            default,
            results: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, index: u64, result: Result<Detection, DetectorError>) {
        self.results.lock().unwrap().insert(index, result);
    }

    pub fn gate(&self, index: u64) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.gates.lock().unwrap().insert(index, rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PresenceDetector for ScriptedDetector {
    fn detect(&self, frame: &Frame) -> Result<Detection, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(&frame.index());
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(WAIT);
        }
        self.results
            .lock()
            .unwrap()
            .get(&frame.index())
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Commit client that records every call; optionally holds each call
/// until released.
pub struct RecordingCommitClient {
    result: Result<CommitReceipt, CommitError>,
    policy: IdentityHintPolicy,
    hints: Mutex<Vec<Option<String>>>,
    frames: Mutex<Vec<u64>>,
    gate: Mutex<Option<Receiver<()>>>,
}

impl RecordingCommitClient {
    pub fn succeeding() -> Self {
        Self::new(Ok(CommitReceipt {
            status: 201,
            message: Some("Attendance marked successfully".into()),
            body: serde_json::json!({"status": "present", "date": "2024-03-01"}),
        }))
    }

    pub fn new(result: Result<CommitReceipt, CommitError>) -> Self {
        Self {
            result,
            policy: IdentityHintPolicy::Optional,
            hints: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: IdentityHintPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Holds the next commit call until the returned sender fires.
    pub fn hold(&self) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.hints.lock().unwrap().len()
    }

    pub fn hints(&self) -> Vec<Option<String>> {
        self.hints.lock().unwrap().clone()
    }

    pub fn frame_indexes(&self) -> Vec<u64> {
        self.frames.lock().unwrap().clone()
    }
}

impl CommitClient for RecordingCommitClient {
    fn commit(
        &self,
        frame: &Frame,
        identity_hint: Option<&str>,
    ) -> Result<CommitReceipt, CommitError> {
        self.hints
            .lock()
            .unwrap()
            .push(identity_hint.map(str::to_string));
        self.frames.lock().unwrap().push(frame.index());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(WAIT);
        }
        self.result.clone()
    }

    fn identity_hint_policy(&self) -> IdentityHintPolicy {
        self.policy
    }
}

/// Polls `condition` until it holds or `WAIT` elapses.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Receives events until one matches, or `WAIT` elapses.
pub fn next_matching(
    rx: &Receiver<SessionEvent>,
    predicate: impl Fn(&SessionEvent) -> bool,
) -> Option<SessionEvent> {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match rx.recv_timeout(remaining) {
            Ok(event) if predicate(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}
