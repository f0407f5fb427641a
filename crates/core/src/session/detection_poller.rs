use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{select, Receiver, Sender};

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::presence_detector::{DetectorError, PresenceDetector};
use crate::session::session_config::SessionConfig;
use crate::session::session_shared::SessionShared;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// A capture-and-detect worker was started with this sequence number.
    Dispatched(u64),
    /// Too many detector calls are still outstanding.
    Saturated,
    /// The session moved on; the loop should end.
    Superseded,
}

/// Keeps the session's detection sample fresh for one generation.
///
/// Layout: `timer thread → one detect thread per tick → shared state`
///
/// The timer never waits on frame capture or a detector call; both run on
/// the per-tick thread, so neither can delay the next tick. Responses may therefore land out of order; the
/// sequence and generation guard in `SessionShared` decides which apply.
pub(crate) struct DetectionPoller {
    generation: u64,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    retired: Arc<AtomicBool>,
}

impl DetectionPoller {
    pub(crate) fn start(
        shared: Arc<SessionShared>,
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn PresenceDetector>,
        config: &SessionConfig,
        generation: u64,
    ) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let ticker = crossbeam_channel::tick(config.poll_interval());
        let retired = Arc::new(AtomicBool::new(false));
        let poll_tick = PollTick::new(
            shared,
            frame_source,
            detector,
            generation,
            config.max_pending_detections(),
            retired.clone(),
        );

        let handle = thread::spawn(move || run_timer(ticker, stop_rx, poll_tick));
        log::debug!(
            "Detection poller started (generation {generation}, every {:?})",
            config.poll_interval()
        );

        Self {
            generation,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            retired,
        }
    }

    /// Stops ticking and retires every request this poller issued.
    ///
    /// Idempotent. Outstanding detector calls are left to finish; their
    /// responses are discarded.
    pub(crate) fn stop(&mut self) {
        self.retired.store(true, Ordering::SeqCst);
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Detection poller thread panicked");
            }
            log::debug!("Detection poller stopped (generation {})", self.generation);
        }
    }
}

impl Drop for DetectionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer(ticker: Receiver<Instant>, stop_rx: Receiver<()>, mut poll_tick: PollTick) {
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if poll_tick.tick() == TickOutcome::Superseded {
                    break;
                }
            }
        }
    }
}

/// Decrements the outstanding-call count when a detect thread ends,
/// including by panic.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One poll tick's worth of work, separated from the timer so it can be
/// driven directly.
pub(crate) struct PollTick {
    shared: Arc<SessionShared>,
    frame_source: Arc<dyn FrameSource>,
    detector: Arc<dyn PresenceDetector>,
    generation: u64,
    last_sequence: u64,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
    saturated: bool,
    retired: Arc<AtomicBool>,
}

impl PollTick {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn PresenceDetector>,
        generation: u64,
        max_pending: usize,
        retired: Arc<AtomicBool>,
    ) -> Self {
        Self {
            shared,
            frame_source,
            detector,
            generation,
            last_sequence: 0,
            pending: Arc::new(AtomicUsize::new(0)),
            max_pending,
            saturated: false,
            retired,
        }
    }

    /// Runs one tick.
    ///
    /// Every dispatched tick takes a sequence number, even if the worker
    /// then finds no frame. When the pending cap is first hit a no-face
    /// sample is applied, so a stalled detector cannot hold the commit
    /// gate open on an old answer.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        if self.retired.load(Ordering::SeqCst) || !self.shared.is_current(self.generation) {
            return TickOutcome::Superseded;
        }

        let pending = self.pending.load(Ordering::SeqCst);
        if pending >= self.max_pending {
            if !self.saturated {
                self.saturated = true;
                let sequence = self.next_sequence();
                let stalled = DetectorError::Unavailable(format!(
                    "{pending} detector calls outstanding"
                ));
                let _ = self
                    .shared
                    .apply_detection(self.generation, sequence, &self.retired, Err(stalled));
            } else {
                log::debug!("Skipping tick: {pending} detector calls outstanding");
            }
            return TickOutcome::Saturated;
        }
        self.saturated = false;

        let sequence = self.next_sequence();
        let generation = self.generation;

        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.pending.clone());
        let shared = self.shared.clone();
        let frame_source = self.frame_source.clone();
        let detector = self.detector.clone();
        let retired = self.retired.clone();

        thread::spawn(move || {
            let _guard = guard;
            let Some(frame) = frame_source.capture() else {
                log::debug!("No frame available for sequence {sequence}");
                return;
            };
            let started = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&frame)))
                .unwrap_or_else(|_| Err(DetectorError::Unavailable("detector panicked".into())));
            shared.record_latency(started.elapsed().as_secs_f64() * 1000.0);
            let _ = shared.apply_detection(generation, sequence, &retired, result);
        });

        TickOutcome::Dispatched(sequence)
    }

    fn next_sequence(&mut self) -> u64 {
        self.last_sequence += 1;
        self.last_sequence
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
