use std::collections::HashMap;
use std::time::Instant;

use crate::session::session_error::StaleResponseDiscarded;

/// Cross-cutting logger for session activity.
///
/// Decouples the poller and submission pipeline from where diagnostics
/// end up (log crate, tests, nowhere).
pub trait SessionLogger: Send {
    /// A new session generation opened; per-session tallies start over.
    fn session_started(&mut self, _generation: u64) {}

    /// Record the round-trip time of one detector call.
    fn detection_latency(&mut self, duration_ms: f64);

    /// Record a response that arrived too late to be applied.
    fn discarded(&mut self, discard: &StaleResponseDiscarded);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn detection_latency(&mut self, _duration_ms: f64) {}
    fn discarded(&mut self, _discard: &StaleResponseDiscarded) {}
    fn info(&mut self, _message: &str) {}
}

/// `log`-backed logger that keeps latency and discard tallies for the
/// current session and prints them when it closes.
pub struct LogSessionLogger {
    generation: u64,
    detector_calls: usize,
    latency_total_ms: f64,
    latency_max_ms: f64,
    discards: HashMap<&'static str, usize>,
    start_time: Instant,
}

impl LogSessionLogger {
    pub fn new() -> Self {
        Self {
            generation: 0,
            detector_calls: 0,
            latency_total_ms: 0.0,
            latency_max_ms: 0.0,
            discards: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.detector_calls == 0 && self.discards.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Session {} summary ({} detector calls, {elapsed_s:.1}s):",
            self.generation, self.detector_calls
        )];

        if self.detector_calls > 0 {
            let avg = self.latency_total_ms / self.detector_calls as f64;
            lines.push(format!(
                "  detect latency: avg {avg:.1}ms  max {:.1}ms",
                self.latency_max_ms
            ));
        }

        let mut reasons: Vec<_> = self.discards.keys().collect();
        reasons.sort();
        for reason in reasons {
            lines.push(format!("  discarded {reason}: {}", self.discards[reason]));
        }

        Some(lines.join("\n"))
    }

    pub fn detector_calls(&self) -> usize {
        self.detector_calls
    }

    pub fn discard_count(&self, reason: &str) -> usize {
        self.discards.get(reason).copied().unwrap_or(0)
    }
}

impl Default for LogSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for LogSessionLogger {
    fn session_started(&mut self, generation: u64) {
        *self = Self {
            generation,
            ..Self::new()
        };
    }

    fn detection_latency(&mut self, duration_ms: f64) {
        self.detector_calls += 1;
        self.latency_total_ms += duration_ms;
        self.latency_max_ms = self.latency_max_ms.max(duration_ms);
    }

    fn discarded(&mut self, discard: &StaleResponseDiscarded) {
        *self.discards.entry(discard.reason.as_str()).or_default() += 1;
        log::debug!("{discard}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session_error::{DiscardReason, ResponseKind};

    fn discard(reason: DiscardReason) -> StaleResponseDiscarded {
        StaleResponseDiscarded {
            kind: ResponseKind::Detection,
            reason,
            generation: 1,
            sequence: Some(1),
        }
    }

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.detection_latency(5.0);
        logger.discarded(&discard(DiscardReason::StaleSequence));
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_discards_are_tallied_by_reason() {
        let mut logger = LogSessionLogger::new();
        logger.discarded(&discard(DiscardReason::StaleSequence));
        logger.discarded(&discard(DiscardReason::StaleSequence));
        logger.discarded(&discard(DiscardReason::SessionClosed));

        assert_eq!(logger.discard_count("stale_sequence"), 2);
        assert_eq!(logger.discard_count("session_closed"), 1);
        assert_eq!(logger.discard_count("stale_generation"), 0);
    }

    #[test]
    fn test_summary_includes_latency_and_discards() {
        let mut logger = LogSessionLogger::new();
        logger.detection_latency(20.0);
        logger.detection_latency(40.0);
        logger.discarded(&discard(DiscardReason::StaleGeneration));

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 detector calls"));
        assert!(summary.contains("avg 30.0ms"));
        assert!(summary.contains("max 40.0ms"));
        assert!(summary.contains("discarded stale_generation: 1"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogSessionLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_session_start_resets_tallies() {
        let mut logger = LogSessionLogger::new();
        logger.session_started(1);
        logger.detection_latency(90.0);
        logger.discarded(&discard(DiscardReason::StaleSequence));

        logger.session_started(2);
        assert!(logger.summary_string().is_none());

        logger.detection_latency(10.0);
        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Session 2 summary (1 detector calls"));
        assert!(summary.contains("max 10.0ms"));
        assert_eq!(logger.discard_count("stale_sequence"), 0);
        assert_eq!(logger.detector_calls(), 1);
    }
}
