//! Lazy loading of older history.
//!
//! The trigger only decides *when* to ask for more; fetching is the host's
//! job. The in-flight flag lives in [`ReconciliationState`] so that a
//! successful prepend clears it in the same pass that writes the data.

use crate::domain::chart::{LogicalRange, ReconciliationState};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{SeriesKey, Timestamp};
use crate::{log_debug, log_info};

/// Ask the data source for bars older than `oldest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub key: SeriesKey,
    pub oldest: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTrigger {
    margin_bars: f64,
    debounce_ms: u64,
    clear_at: Option<u64>,
}

impl HistoryTrigger {
    pub fn new(margin_bars: f64, debounce_ms: u64) -> Self {
        Self { margin_bars, debounce_ms, clear_at: None }
    }

    /// Called on every visible-range change.
    pub fn check(&mut self, state: &mut ReconciliationState, range: LogicalRange) -> Option<HistoryRequest> {
        if state.fetch_in_flight || range.from >= self.margin_bars {
            return None;
        }
        let key = state.current_key.clone()?;
        let oldest = state.first_time?;

        state.fetch_in_flight = true;
        // a deadline left by the previous fetch must not release this one
        self.clear_at = None;
        log_info!(
            LogComponent::Application("History"),
            "📜 Range {:.1}..{:.1} near start, requesting {} before {}",
            range.from,
            range.to,
            key,
            oldest
        );
        Some(HistoryRequest { key, oldest })
    }

    /// Host reported the fetch finished; clears the flag after the debounce.
    /// A later call replaces an earlier pending deadline.
    pub fn load_finished(&mut self, now_ms: u64) {
        self.clear_at = Some(now_ms + self.debounce_ms);
    }

    /// Applies an expired debounce deadline. Returns true when the flag was
    /// cleared by this call.
    pub fn poll(&mut self, state: &mut ReconciliationState, now_ms: u64) -> bool {
        match self.clear_at {
            Some(deadline) if now_ms >= deadline => {
                self.clear_at = None;
                let was_in_flight = std::mem::replace(&mut state.fetch_in_flight, false);
                if was_in_flight {
                    log_debug!(LogComponent::Application("History"), "Fetch flag released after debounce");
                }
                was_in_flight
            }
            _ => false,
        }
    }

    /// Drops any pending deadline, used when the series key changes.
    pub fn reset(&mut self) {
        self.clear_at = None;
    }
}
