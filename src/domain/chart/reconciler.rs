//! Series reconciliation.
//!
//! Each snapshot is normalized (dedup by time, last write wins, ascending),
//! classified against the bookkeeping left by the previous pass, written to
//! the provider, and followed by whatever viewport correction the update
//! shape calls for.

use super::provider::CoordinateProvider;
use super::sessions::SessionCalendar;
use super::value_objects::LogicalRange;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{RawPoint, SeriesKey, SeriesKind, SeriesSnapshot, TimePoint, Timestamp};
use crate::{log_debug, log_info};
use std::collections::BTreeMap;

pub const DEFAULT_TIME_JUMP_THRESHOLD_SECS: i64 = 3600;

/// Cross-call bookkeeping of one chart instance.
///
/// Passed into [`SeriesReconciler::reconcile`] and returned updated; nothing
/// else writes it except the history trigger's in-flight flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationState {
    pub previous_count: usize,
    pub first_time: Option<Timestamp>,
    pub last_time: Option<Timestamp>,
    pub current_key: Option<SeriesKey>,
    pub fetch_in_flight: bool,
}

impl ReconciliationState {
    /// Fresh bookkeeping bound to `key`.
    pub fn for_key(key: SeriesKey) -> Self {
        Self { current_key: Some(key), ..Self::default() }
    }

    pub fn is_current(&self, key: &SeriesKey) -> bool {
        self.current_key.as_ref() == Some(key)
    }
}

/// Shape of an update relative to the previous pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Empty snapshot, series and band cleared.
    Cleared,
    FreshLoad,
    /// `inserted` older bars landed in front of the rendered series.
    Prepend { inserted: usize },
    /// Last bar moved by more than the threshold (session swap or gap).
    TimeJump,
    /// Append or in-place tick.
    Incremental,
}

/// Viewport change performed after the data write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportCorrection {
    None,
    Shifted { before: LogicalRange, after: LogicalRange },
    ScrolledToLive,
    FittedContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub kind: UpdateKind,
    pub correction: ViewportCorrection,
    pub key_changed: bool,
    pub points: Vec<TimePoint>,
}

/// Dedup by time with later entries overwriting earlier ones, ascending.
/// Points without a time or payload are dropped.
pub fn normalize(snapshot: &SeriesSnapshot) -> Vec<TimePoint> {
    let mut by_time: BTreeMap<Timestamp, TimePoint> = BTreeMap::new();
    for point in snapshot.iter().filter_map(RawPoint::normalize) {
        by_time.insert(point.time, point);
    }
    by_time.into_values().collect()
}

/// Classifies normalized `points` against `state`.
pub fn classify(state: &ReconciliationState, points: &[TimePoint], time_jump_threshold: i64) -> UpdateKind {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return UpdateKind::Cleared;
    };

    if state.previous_count == 0 {
        return UpdateKind::FreshLoad;
    }

    let is_prepend = points.len() > state.previous_count
        && state.first_time.is_some_and(|prev_first| first.time < prev_first);
    if is_prepend {
        return UpdateKind::Prepend { inserted: points.len() - state.previous_count };
    }

    if state.last_time.is_some_and(|prev_last| last.time.distance(prev_last) > time_jump_threshold.max(0) as u64) {
        return UpdateKind::TimeJump;
    }

    UpdateKind::Incremental
}

#[derive(Debug, Clone)]
pub struct SeriesReconciler {
    time_jump_threshold: i64,
    sessions: SessionCalendar,
}

impl Default for SeriesReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_JUMP_THRESHOLD_SECS, SessionCalendar::default())
    }
}

impl SeriesReconciler {
    pub fn new(time_jump_threshold: i64, sessions: SessionCalendar) -> Self {
        Self { time_jump_threshold, sessions }
    }

    pub fn sessions(&self) -> &SessionCalendar {
        &self.sessions
    }

    /// Applies one snapshot end to end: normalize, classify, write, correct.
    pub fn reconcile(
        &self,
        state: ReconciliationState,
        key: &SeriesKey,
        kind: SeriesKind,
        snapshot: &SeriesSnapshot,
        provider: &mut dyn CoordinateProvider,
    ) -> (ReconciliationState, ReconcileOutcome) {
        let key_changed = !state.is_current(key);
        let mut state = if key_changed {
            log_info!(
                LogComponent::Domain("Reconciler"),
                "🔄 Series key {:?} -> {}, resetting bookkeeping",
                state.current_key.as_ref().map(|k| k.value()),
                key
            );
            provider.clear_price_lines();
            ReconciliationState::for_key(key.clone())
        } else {
            state
        };

        let points = normalize(snapshot);
        if points.len() != snapshot.len() {
            log_debug!(
                LogComponent::Domain("Reconciler"),
                "Collapsed {} raw points to {} (duplicates or malformed)",
                snapshot.len(),
                points.len()
            );
        }

        let update = classify(&state, &points, self.time_jump_threshold);

        if update == UpdateKind::Cleared {
            provider.set_data(&[]);
            provider.set_session_band(&[]);
            state.previous_count = 0;
            state.first_time = None;
            state.last_time = None;
            let outcome = ReconcileOutcome { kind: update, correction: ViewportCorrection::None, key_changed, points };
            return (state, outcome);
        }

        let captured = match update {
            UpdateKind::Prepend { .. } => provider.visible_logical_range(),
            _ => None,
        };

        provider.set_data(&points);
        if kind.has_session_band() {
            provider.set_session_band(&self.sessions.compute_band(&points));
        }

        let correction = match update {
            UpdateKind::Prepend { inserted } => {
                state.fetch_in_flight = false;
                match captured {
                    Some(before) => {
                        let after = before.shifted(inserted as f64);
                        provider.set_visible_logical_range(after);
                        ViewportCorrection::Shifted { before, after }
                    }
                    None => ViewportCorrection::None,
                }
            }
            UpdateKind::FreshLoad | UpdateKind::TimeJump => match kind {
                SeriesKind::Price => {
                    provider.set_auto_scale(true);
                    provider.scroll_to_live();
                    ViewportCorrection::ScrolledToLive
                }
                SeriesKind::Equity => {
                    provider.fit_content();
                    ViewportCorrection::FittedContent
                }
            },
            UpdateKind::Incremental | UpdateKind::Cleared => ViewportCorrection::None,
        };

        state.previous_count = points.len();
        state.first_time = points.first().map(|p| p.time);
        state.last_time = points.last().map(|p| p.time);

        log_debug!(
            LogComponent::Domain("Reconciler"),
            "{} {:?}: {} points, correction {:?}",
            key,
            update,
            points.len(),
            correction
        );

        (state, ReconcileOutcome { kind: update, correction, key_changed, points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(time: i64, value: f64) -> RawPoint {
        RawPoint { time: Some(time), value: Some(value), ..RawPoint::default() }
    }

    #[test]
    fn normalize_keeps_last_duplicate_and_sorts() {
        let points = normalize(&[raw(3, 1.0), raw(1, 2.0), raw(3, 9.0), raw(2, 4.0)]);
        let times: Vec<i64> = points.iter().map(|p| p.time.value()).collect();
        assert_eq!(times, vec![1, 2, 3]);
        assert_eq!(points[2].value.last_value(), 9.0);
    }

    #[test]
    fn normalize_drops_points_without_time() {
        let points = normalize(&[RawPoint { value: Some(1.0), ..RawPoint::default() }, raw(5, 1.0)]);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn empty_points_classify_as_cleared() {
        assert_eq!(classify(&ReconciliationState::default(), &[], 3600), UpdateKind::Cleared);
    }
}
