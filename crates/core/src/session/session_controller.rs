use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::detection_sample::DetectionSample;
use crate::detection::domain::presence_detector::PresenceDetector;
use crate::session::detection_poller::DetectionPoller;
use crate::session::session_config::SessionConfig;
use crate::session::session_error::{NotReadyReason, SessionError};
use crate::session::session_event::{SessionEvent, SessionState};
use crate::session::session_logger::{NullSessionLogger, SessionLogger};
use crate::session::session_shared::{DiscardStats, SessionShared};
use crate::session::submission_pipeline::{SubmissionHandle, SubmissionPipeline};
use crate::submission::domain::commit_client::{CommitClient, IdentityHintPolicy};
use crate::submission::domain::submission::SubmissionOutcome;

/// One live verification session at a time over a camera feed.
///
/// While open, a poller keeps the latest face-presence sample fresh and the
/// commit gate follows it. Every method takes `&self`; the controller can be
/// shared between a UI thread and whatever drives it.
pub struct SessionController {
    shared: Arc<SessionShared>,
    frame_source: Arc<dyn FrameSource>,
    detector: Arc<dyn PresenceDetector>,
    pipeline: SubmissionPipeline,
    config: SessionConfig,
    poller: Mutex<Option<DetectionPoller>>,
}

impl SessionController {
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn PresenceDetector>,
        commit_client: Arc<dyn CommitClient>,
        config: SessionConfig,
    ) -> Self {
        Self::with_logger(
            frame_source,
            detector,
            commit_client,
            config,
            Box::new(NullSessionLogger),
        )
    }

    pub fn with_logger(
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn PresenceDetector>,
        commit_client: Arc<dyn CommitClient>,
        config: SessionConfig,
        logger: Box<dyn SessionLogger>,
    ) -> Self {
        let shared = Arc::new(SessionShared::new(logger));
        let pipeline = SubmissionPipeline::new(shared.clone(), frame_source.clone(), commit_client);
        Self {
            shared,
            frame_source,
            detector,
            pipeline,
            config,
            poller: Mutex::new(None),
        }
    }

    /// Opens a fresh session and starts polling. Returns its generation.
    pub fn open(&self) -> Result<u64, SessionError> {
        let mut poller = self.poller.lock().unwrap();
        let generation = self.shared.open()?;
        log::info!("Session opened (generation {generation})");

        *poller = Some(DetectionPoller::start(
            self.shared.clone(),
            self.frame_source.clone(),
            self.detector.clone(),
            &self.config,
            generation,
        ));
        Ok(generation)
    }

    /// Closes the open session. No-op when nothing is open.
    ///
    /// An in-flight submission keeps running but its outcome is discarded.
    pub fn close(&self) {
        let mut poller = self.poller.lock().unwrap();
        let Some(generation) = self.shared.close() else {
            return;
        };
        if let Some(mut running) = poller.take() {
            running.stop();
        }
        log::info!("Session closed (generation {generation})");
        self.shared.log_summary();
    }

    pub fn can_commit(&self) -> bool {
        self.shared.can_commit()
    }

    /// Submits the current camera frame, at most once per open gate.
    ///
    /// Fails with `NotReady` when no session is open, no face is detected,
    /// a submission is already in flight, or the workflow requires an
    /// identity hint that is missing. In all of those cases no network
    /// call is made.
    pub fn commit(&self, identity_hint: Option<String>) -> Result<SubmissionHandle, SessionError> {
        let identity_hint = match self.pipeline.commit_client().identity_hint_policy() {
            IdentityHintPolicy::Ignored => None,
            IdentityHintPolicy::Optional => identity_hint,
            IdentityHintPolicy::Required => match identity_hint {
                Some(hint) if !hint.trim().is_empty() => Some(hint),
                _ => {
                    return Err(SessionError::NotReady(
                        NotReadyReason::IdentityHintRequired,
                    ))
                }
            },
        };

        let generation = self.shared.begin_submission()?;
        log::info!("Submitting frame (generation {generation})");
        Ok(self.pipeline.submit(generation, identity_hint))
    }

    /// Events published after this call, in the order they were applied.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.shared.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }

    pub fn current_sample(&self) -> Option<DetectionSample> {
        self.shared.current_sample()
    }

    pub fn last_outcome(&self) -> Option<SubmissionOutcome> {
        self.shared.last_outcome()
    }

    pub fn submission_in_flight(&self) -> bool {
        self.shared.submission_in_flight()
    }

    pub fn discard_stats(&self) -> DiscardStats {
        self.shared.discard_stats()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::presence_detector::{Detection, DetectorError};
    use crate::session::submission_pipeline::SubmissionStatus;
    use crate::session::test_support::*;
    use crate::submission::domain::commit_client::CommitError;
    use rstest::rstest;
    use std::time::Duration;

    struct Harness {
        source: Arc<CountingFrameSource>,
        detector: Arc<ScriptedDetector>,
        client: Arc<RecordingCommitClient>,
        controller: SessionController,
    }

    fn harness(detection: Result<Detection, DetectorError>, client: RecordingCommitClient) -> Harness {
        let source = Arc::new(CountingFrameSource::new());
        let detector = Arc::new(ScriptedDetector::new(detection));
        let client = Arc::new(client);
        let config = SessionConfig::new(Duration::from_millis(10), 4).unwrap();
        let controller =
            SessionController::new(source.clone(), detector.clone(), client.clone(), config);
        Harness {
            source,
            detector,
            client,
            controller,
        }
    }

    fn face_harness() -> Harness {
        harness(face(), RecordingCommitClient::succeeding())
    }

    fn open_until_ready(h: &Harness) -> u64 {
        let generation = h.controller.open().unwrap();
        assert!(wait_until(|| h.controller.can_commit()));
        generation
    }

    #[test]
    fn test_face_then_commit_applies_outcome_once() {
        let h = face_harness();
        let events = h.controller.subscribe();
        let generation = open_until_ready(&h);

        let outcome = h.controller.commit(None).unwrap().wait().unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.generation, generation);
        assert_eq!(h.client.calls(), 1);
        assert_eq!(h.controller.last_outcome(), Some(outcome.clone()));

        let completed = next_matching(&events, |e| {
            matches!(e, SessionEvent::SubmissionCompleted(_))
        });
        assert_eq!(completed, Some(SessionEvent::SubmissionCompleted(outcome)));
        h.controller.close();
        let after = next_matching(&events, |e| {
            matches!(
                e,
                SessionEvent::SubmissionCompleted(_) | SessionEvent::Closed { .. }
            )
        });
        assert_eq!(after, Some(SessionEvent::Closed { generation }));
    }

    #[test]
    fn test_commit_without_face_is_not_ready() {
        let h = harness(no_face(), RecordingCommitClient::succeeding());
        h.controller.open().unwrap();
        assert!(wait_until(|| h.controller.current_sample().is_some()));

        let err = h.controller.commit(Some("S001".into())).err();

        assert_eq!(err, Some(SessionError::NotReady(NotReadyReason::NoFaceDetected)));
        assert_eq!(h.client.calls(), 0);
    }

    #[test]
    fn test_commit_before_open_is_not_ready() {
        let h = face_harness();

        let err = h.controller.commit(None).err();

        assert_eq!(err, Some(SessionError::NotReady(NotReadyReason::SessionNotOpen)));
        assert_eq!(h.source.captures(), 0);
    }

    #[test]
    fn test_close_during_commit_discards_outcome() {
        let h = face_harness();
        let release = h.client.hold();
        open_until_ready(&h);

        let handle = h.controller.commit(None).unwrap();
        assert!(wait_until(|| h.client.calls() == 1));
        h.controller.close();
        release.send(()).unwrap();

        assert_eq!(handle.wait_timeout(WAIT), SubmissionStatus::Discarded);
        assert!(h.controller.last_outcome().is_none());
        assert_eq!(h.controller.state(), SessionState::Closed);
        assert_eq!(h.controller.discard_stats().session_closed, 1);
    }

    #[test]
    fn test_second_commit_while_in_flight_makes_no_call() {
        let h = face_harness();
        let release = h.client.hold();
        open_until_ready(&h);

        let first = h.controller.commit(None).unwrap();
        let second = h.controller.commit(None).err();

        assert_eq!(
            second,
            Some(SessionError::NotReady(NotReadyReason::SubmissionInFlight))
        );
        assert!(!h.controller.can_commit());
        release.send(()).unwrap();
        assert!(first.wait().is_some());
        assert_eq!(h.client.calls(), 1);
        assert!(wait_until(|| h.controller.can_commit()));
    }

    #[test]
    fn test_outcome_from_previous_generation_is_discarded_after_reopen() {
        let h = face_harness();
        let release = h.client.hold();
        let first_generation = open_until_ready(&h);

        let stale = h.controller.commit(None).unwrap();
        assert!(wait_until(|| h.client.calls() == 1));
        h.controller.close();
        let second_generation = h.controller.open().unwrap();
        release.send(()).unwrap();

        assert_eq!(stale.wait(), None);
        assert_eq!(second_generation, first_generation + 1);
        assert!(h.controller.last_outcome().is_none());
        assert!(!h.controller.submission_in_flight());
        assert!(wait_until(|| h.controller.can_commit()));
    }

    #[test]
    fn test_open_twice_is_already_open() {
        let h = face_harness();
        h.controller.open().unwrap();

        assert_eq!(h.controller.open(), Err(SessionError::AlreadyOpen));
        assert_eq!(h.controller.generation(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let h = face_harness();
        h.controller.close();
        h.controller.open().unwrap();
        h.controller.close();
        h.controller.close();

        assert_eq!(h.controller.state(), SessionState::Closed);
    }

    #[test]
    fn test_close_stops_polling() {
        let h = face_harness();
        h.controller.open().unwrap();
        assert!(wait_until(|| h.detector.calls() >= 2));

        h.controller.close();
        std::thread::sleep(Duration::from_millis(30));
        let captured = h.source.captures();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(h.source.captures(), captured);
    }

    #[test]
    fn test_reopen_publishes_next_generation() {
        let h = face_harness();
        let events = h.controller.subscribe();
        open_until_ready(&h);
        h.controller.close();

        let generation = h.controller.open().unwrap();

        assert_eq!(generation, 2);
        assert_eq!(
            next_matching(&events, |e| matches!(e, SessionEvent::Opened { generation: 2 })),
            Some(SessionEvent::Opened { generation })
        );
        assert!(wait_until(|| h.controller.can_commit()));
    }

    #[test]
    fn test_commit_captures_fresh_frame() {
        let h = face_harness();
        open_until_ready(&h);
        let polled = h.source.captures();

        let outcome = h.controller.commit(None).unwrap().wait().unwrap();

        assert!(outcome.succeeded());
        assert!(h.client.frame_indexes()[0] > polled);
    }

    #[test]
    fn test_detector_failure_closes_gate() {
        let h = face_harness();
        open_until_ready(&h);
        for index in 1..=1_000 {
            h.detector.script(index, Err(DetectorError::Timeout));
        }

        assert!(wait_until(|| !h.controller.can_commit()));
        assert_eq!(
            h.controller.commit(None).err(),
            Some(SessionError::NotReady(NotReadyReason::NoFaceDetected))
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(String::new()))]
    #[case(Some("   ".to_string()))]
    fn test_required_hint_missing_is_not_ready(#[case] hint: Option<String>) {
        let h = harness(
            face(),
            RecordingCommitClient::succeeding().with_policy(IdentityHintPolicy::Required),
        );
        open_until_ready(&h);

        let err = h.controller.commit(hint).err();

        assert_eq!(
            err,
            Some(SessionError::NotReady(NotReadyReason::IdentityHintRequired))
        );
        assert_eq!(h.client.calls(), 0);
        assert!(h.controller.can_commit());
    }

    #[rstest]
    #[case(IdentityHintPolicy::Ignored, Some("S001"), None)]
    #[case(IdentityHintPolicy::Optional, Some("S001"), Some("S001"))]
    #[case(IdentityHintPolicy::Optional, None, None)]
    #[case(IdentityHintPolicy::Required, Some("S001"), Some("S001"))]
    fn test_hint_policy_controls_what_is_sent(
        #[case] policy: IdentityHintPolicy,
        #[case] given: Option<&str>,
        #[case] sent: Option<&str>,
    ) {
        let h = harness(face(), RecordingCommitClient::succeeding().with_policy(policy));
        open_until_ready(&h);

        h.controller
            .commit(given.map(str::to_string))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(h.client.hints(), vec![sent.map(str::to_string)]);
    }

    #[test]
    fn test_commit_failure_is_surfaced_and_gate_reopens() {
        let h = harness(
            face(),
            RecordingCommitClient::new(Err(CommitError::Rejected {
                status: 404,
                message: "No matching student found".into(),
                details: None,
            })),
        );
        open_until_ready(&h);

        let outcome = h.controller.commit(None).unwrap().wait().unwrap();

        assert!(!outcome.succeeded());
        assert_eq!(h.client.calls(), 1);
        assert!(wait_until(|| h.controller.can_commit()));
        assert_eq!(h.client.calls(), 1);
    }
}
