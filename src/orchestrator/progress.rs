//! Batch progress reporting.

use std::sync::Mutex;

/// Receives progress updates, keyed by provider name.
pub trait ProgressSink: Send + Sync {
    /// `percent` is the integer share of authors handled so far.
    fn report(&self, provider: &str, percent: u8);
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, provider: &str, percent: u8) {
        tracing::info!(provider, percent, "reconciliation progress");
    }
}

/// Turns per-author completions into percentage changes.
///
/// Each distinct percentage is emitted once, in increasing order, even when
/// authors finish concurrently.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    handled: usize,
    last: u8,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Count one handled author. Returns `(handled, new percentage)`, the
    /// percentage only when it changed.
    pub fn advance(&self) -> (usize, Option<u8>) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.handled = (state.handled + 1).min(self.total);
        let percent = if self.total == 0 {
            100
        } else {
            (state.handled * 100 / self.total) as u8
        };
        if percent != state.last {
            state.last = percent;
            (state.handled, Some(percent))
        } else {
            (state.handled, None)
        }
    }

    /// Count one author and forward a changed percentage to `sink`.
    pub fn advance_and_report(&self, sink: &dyn ProgressSink, provider: &str) -> usize {
        let (handled, percent) = self.advance();
        if let Some(percent) = percent {
            sink.report(provider, percent);
        }
        handled
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
