use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::capture::domain::frame_source::FrameSource;
use crate::session::session_shared::SessionShared;
use crate::submission::domain::commit_client::{CommitClient, CommitError, CommitReceipt};
use crate::submission::domain::submission::{SubmissionOutcome, SubmissionRequest};

/// State of a submission as seen through its handle.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionStatus {
    Pending,
    Completed(SubmissionOutcome),
    /// The session closed or reopened first; the outcome was dropped.
    Discarded,
}

/// Caller's view of one submission.
///
/// Resolves to the outcome exactly when the session applied it. When the
/// outcome was discarded the channel closes without a value.
pub struct SubmissionHandle {
    generation: u64,
    outcome_rx: Receiver<SubmissionOutcome>,
}

impl SubmissionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Blocks until the submission resolves. `None` means discarded.
    pub fn wait(self) -> Option<SubmissionOutcome> {
        self.outcome_rx.recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> SubmissionStatus {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => SubmissionStatus::Completed(outcome),
            Err(RecvTimeoutError::Timeout) => SubmissionStatus::Pending,
            Err(RecvTimeoutError::Disconnected) => SubmissionStatus::Discarded,
        }
    }

    pub fn try_status(&self) -> SubmissionStatus {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => SubmissionStatus::Completed(outcome),
            Err(TryRecvError::Empty) => SubmissionStatus::Pending,
            Err(TryRecvError::Disconnected) => SubmissionStatus::Discarded,
        }
    }
}

/// Runs exactly one commit call per accepted request.
///
/// Never retries: the commit endpoints are not idempotent, so a failure
/// is reported and a repeat has to come from a new user action.
pub(crate) struct SubmissionPipeline {
    shared: Arc<SessionShared>,
    frame_source: Arc<dyn FrameSource>,
    commit_client: Arc<dyn CommitClient>,
}

impl SubmissionPipeline {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        frame_source: Arc<dyn FrameSource>,
        commit_client: Arc<dyn CommitClient>,
    ) -> Self {
        Self {
            shared,
            frame_source,
            commit_client,
        }
    }

    pub(crate) fn commit_client(&self) -> &dyn CommitClient {
        &*self.commit_client
    }

    /// Submits for `generation`, which the caller has already marked in
    /// flight.
    ///
    /// The frame is captured now rather than reused from the last poll
    /// tick. Without a frame the submission fails immediately and no
    /// commit call is made.
    pub(crate) fn submit(
        &self,
        generation: u64,
        identity_hint: Option<String>,
    ) -> SubmissionHandle {
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);
        let handle = SubmissionHandle {
            generation,
            outcome_rx,
        };

        let Some(frame) = self.frame_source.capture() else {
            log::warn!("Could not capture a frame for submission");
            finish(&self.shared, generation, Err(CommitError::NoFrame), outcome_tx);
            return handle;
        };
        let request = SubmissionRequest::new(generation, frame, identity_hint);

        let shared = self.shared.clone();
        let client = self.commit_client.clone();
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                client.commit(request.frame(), request.identity_hint())
            }))
            .unwrap_or_else(|_| Err(CommitError::Transport("commit client panicked".into())));
            finish(&shared, request.generation(), result, outcome_tx);
        });

        handle
    }
}

fn finish(
    shared: &SessionShared,
    generation: u64,
    result: Result<CommitReceipt, CommitError>,
    outcome_tx: Sender<SubmissionOutcome>,
) {
    match &result {
        Ok(_) => shared.log_info(&format!("Submission succeeded (generation {generation})")),
        Err(e) => log::warn!("Submission failed (generation {generation}): {e}"),
    }
    if let Ok(outcome) = shared.complete_submission(generation, result) {
        let _ = outcome_tx.send(outcome);
    }
}
