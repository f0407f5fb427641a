use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::detection_sample::DetectionSample;
use crate::detection::domain::presence_detector::{Detection, DetectorError};
use crate::session::session_error::{
    DiscardReason, NotReadyReason, ResponseKind, SessionError, StaleResponseDiscarded,
};
use crate::session::session_event::{SessionEvent, SessionState};
use crate::session::session_logger::SessionLogger;
use crate::submission::domain::commit_client::{CommitError, CommitReceipt};
use crate::submission::domain::submission::SubmissionOutcome;

/// Count of late responses dropped, by reason.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscardStats {
    pub stale_generation: usize,
    pub stale_sequence: usize,
    pub session_closed: usize,
    pub poller_stopped: usize,
}

impl DiscardStats {
    fn record(&mut self, reason: DiscardReason) {
        match reason {
            DiscardReason::StaleGeneration => self.stale_generation += 1,
            DiscardReason::StaleSequence => self.stale_sequence += 1,
            DiscardReason::SessionClosed => self.session_closed += 1,
            DiscardReason::PollerStopped => self.poller_stopped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.stale_generation + self.stale_sequence + self.session_closed + self.poller_stopped
    }
}

struct SessionCore {
    state: SessionState,
    generation: u64,
    last_applied_sequence: u64,
    sample: Option<DetectionSample>,
    in_flight: bool,
    outcome: Option<SubmissionOutcome>,
    discards: DiscardStats,
}

impl SessionCore {
    /// Why a response issued under `generation` may no longer be applied.
    fn staleness(&self, generation: u64) -> Option<DiscardReason> {
        if self.generation != generation {
            Some(DiscardReason::StaleGeneration)
        } else if self.state != SessionState::Open {
            Some(DiscardReason::SessionClosed)
        } else {
            None
        }
    }
}

/// Session state shared by the controller, the poll timer, detection
/// workers and submission workers.
///
/// Every guard-then-write sequence runs under a single lock acquisition,
/// so a late response can never slip between the staleness check and the
/// update it would make. Events are published under the same lock, which
/// keeps subscriber order identical to apply order.
pub(crate) struct SessionShared {
    core: Mutex<SessionCore>,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
    logger: Mutex<Box<dyn SessionLogger>>,
}

impl SessionShared {
    pub(crate) fn new(logger: Box<dyn SessionLogger>) -> Self {
        Self {
            core: Mutex::new(SessionCore {
                state: SessionState::Idle,
                generation: 0,
                last_applied_sequence: 0,
                sample: None,
                in_flight: false,
                outcome: None,
                discards: DiscardStats::default(),
            }),
            subscribers: Mutex::new(Vec::new()),
            logger: Mutex::new(logger),
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    fn publish(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Starts a fresh generation with no inherited detection or outcome.
    pub(crate) fn open(&self) -> Result<u64, SessionError> {
        let mut core = self.core.lock().unwrap();
        if core.state == SessionState::Open {
            return Err(SessionError::AlreadyOpen);
        }
        core.generation += 1;
        core.state = SessionState::Open;
        core.last_applied_sequence = 0;
        core.sample = None;
        core.in_flight = false;
        core.outcome = None;
        let generation = core.generation;
        self.logger.lock().unwrap().session_started(generation);
        self.publish(SessionEvent::Opened { generation });
        Ok(generation)
    }

    /// Returns the closed generation, or `None` if nothing was open.
    pub(crate) fn close(&self) -> Option<u64> {
        let mut core = self.core.lock().unwrap();
        if core.state != SessionState::Open {
            return None;
        }
        core.state = SessionState::Closed;
        let generation = core.generation;
        self.publish(SessionEvent::Closed { generation });
        Some(generation)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.core.lock().unwrap().staleness(generation).is_none()
    }

    pub(crate) fn can_commit(&self) -> bool {
        gate(&self.core.lock().unwrap()).is_ok()
    }

    /// Checks the commit gate and, if open, marks a submission in flight.
    /// Returns the generation the submission belongs to.
    pub(crate) fn begin_submission(&self) -> Result<u64, SessionError> {
        let mut core = self.core.lock().unwrap();
        gate(&core).map_err(SessionError::NotReady)?;
        core.in_flight = true;
        Ok(core.generation)
    }

    /// Applies a detector response unless it is stale.
    ///
    /// `retired` is the issuing poller's stop flag; it is read under the
    /// lock so nothing applies once `stop` has returned. Detector failures
    /// apply as a no-face sample for their sequence.
    pub(crate) fn apply_detection(
        &self,
        generation: u64,
        sequence: u64,
        retired: &AtomicBool,
        result: Result<Detection, DetectorError>,
    ) -> Result<DetectionSample, StaleResponseDiscarded> {
        let sample = match result {
            Ok(detection) => DetectionSample::from_detection(sequence, detection),
            Err(e) => {
                log::warn!("Face check failed (sequence {sequence}): {e}; treating as no face");
                DetectionSample::fail_safe(sequence)
            }
        };

        let discard = {
            let mut core = self.core.lock().unwrap();
            let reason = core
                .staleness(generation)
                .or_else(|| {
                    retired
                        .load(Ordering::SeqCst)
                        .then_some(DiscardReason::PollerStopped)
                })
                .or_else(|| {
                    (sequence <= core.last_applied_sequence)
                        .then_some(DiscardReason::StaleSequence)
                });
            match reason {
                Some(reason) => {
                    core.discards.record(reason);
                    StaleResponseDiscarded {
                        kind: ResponseKind::Detection,
                        reason,
                        generation,
                        sequence: Some(sequence),
                    }
                }
                None => {
                    core.last_applied_sequence = sequence;
                    core.sample = Some(sample.clone());
                    self.publish(SessionEvent::DetectionChanged(sample.clone()));
                    return Ok(sample);
                }
            }
        };
        self.logger.lock().unwrap().discarded(&discard);
        Err(discard)
    }

    /// Applies a commit result unless its generation is no longer open.
    ///
    /// A discarded result leaves the in-flight flag alone: it belongs to a
    /// session that no longer exists, and `open` resets it for the next one.
    pub(crate) fn complete_submission(
        &self,
        generation: u64,
        result: Result<CommitReceipt, CommitError>,
    ) -> Result<SubmissionOutcome, StaleResponseDiscarded> {
        let discard = {
            let mut core = self.core.lock().unwrap();
            match core.staleness(generation) {
                Some(reason) => {
                    core.discards.record(reason);
                    StaleResponseDiscarded {
                        kind: ResponseKind::Submission,
                        reason,
                        generation,
                        sequence: None,
                    }
                }
                None => {
                    let outcome = SubmissionOutcome { generation, result };
                    core.in_flight = false;
                    core.outcome = Some(outcome.clone());
                    self.publish(SessionEvent::SubmissionCompleted(outcome.clone()));
                    return Ok(outcome);
                }
            }
        };
        self.logger.lock().unwrap().discarded(&discard);
        Err(discard)
    }

    pub(crate) fn record_latency(&self, duration_ms: f64) {
        self.logger.lock().unwrap().detection_latency(duration_ms);
    }

    pub(crate) fn log_info(&self, message: &str) {
        self.logger.lock().unwrap().info(message);
    }

    pub(crate) fn log_summary(&self) {
        self.logger.lock().unwrap().summary();
    }

    pub(crate) fn state(&self) -> SessionState {
        self.core.lock().unwrap().state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.core.lock().unwrap().generation
    }

    pub(crate) fn current_sample(&self) -> Option<DetectionSample> {
        self.core.lock().unwrap().sample.clone()
    }

    pub(crate) fn last_outcome(&self) -> Option<SubmissionOutcome> {
        self.core.lock().unwrap().outcome.clone()
    }

    pub(crate) fn submission_in_flight(&self) -> bool {
        self.core.lock().unwrap().in_flight
    }

    pub(crate) fn discard_stats(&self) -> DiscardStats {
        self.core.lock().unwrap().discards
    }
}

fn gate(core: &SessionCore) -> Result<(), NotReadyReason> {
    if core.state != SessionState::Open {
        return Err(NotReadyReason::SessionNotOpen);
    }
    if core.in_flight {
        return Err(NotReadyReason::SubmissionInFlight);
    }
    if !core.sample.as_ref().is_some_and(|s| s.face_detected) {
        return Err(NotReadyReason::NoFaceDetected);
    }
    Ok(())
}
