//! Session killzone banding.
//!
//! Every candle is mapped to the local hour of one canonical exchange
//! timezone and tagged with the first session window containing that hour.

use super::value_objects::Color;
use crate::domain::errors::{AppError, AppResult};
use crate::domain::market_data::{TimePoint, Timestamp};
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const DEFAULT_SESSION_TIMEZONE: &str = "America/New_York";

/// Named local-hour interval `[start_hour, end_hour)`; wraps past midnight
/// when `start_hour > end_hour`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindow {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
    pub color: Color,
}

impl SessionWindow {
    pub fn new(name: &str, start_hour: u32, end_hour: u32, color: Color) -> Self {
        Self { name: name.to_string(), start_hour, end_hour, color }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour > self.end_hour {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }
}

/// Killzones in priority order.
static DEFAULT_WINDOWS: Lazy<Vec<SessionWindow>> = Lazy::new(|| {
    vec![
        SessionWindow::new("Asia", 20, 0, Color::from_hex(0x8b5cf6).with_alpha(0.12)),
        SessionWindow::new("London", 2, 5, Color::from_hex(0x3b82f6).with_alpha(0.12)),
        SessionWindow::new("New York AM", 7, 10, Color::from_hex(0x22c55e).with_alpha(0.12)),
        SessionWindow::new("London Close", 10, 12, Color::from_hex(0xf59e0b).with_alpha(0.12)),
    ]
});

/// One entry of the derived histogram series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionBandPoint {
    pub time: Timestamp,
    pub value: u8,
    pub color: Color,
}

impl Serialize for SessionBandPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SessionBandPoint", 3)?;
        state.serialize_field("time", &self.time)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("color", &self.color.to_css())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionCalendar {
    timezone: Tz,
    windows: Vec<SessionWindow>,
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self { timezone: chrono_tz::America::New_York, windows: DEFAULT_WINDOWS.clone() }
    }
}

impl SessionCalendar {
    pub fn new(timezone: Tz, windows: Vec<SessionWindow>) -> Self {
        Self { timezone, windows }
    }

    /// Default killzones evaluated in another IANA timezone.
    pub fn with_timezone(name: &str) -> AppResult<Self> {
        let timezone: Tz = name
            .parse()
            .map_err(|_| AppError::ConfigError(format!("unknown session timezone '{}'", name)))?;
        Ok(Self { timezone, ..Self::default() })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_hour(&self, time: Timestamp) -> Option<u32> {
        DateTime::from_timestamp(time.value(), 0).map(|utc| utc.with_timezone(&self.timezone).hour())
    }

    pub fn window_for(&self, time: Timestamp) -> Option<&SessionWindow> {
        let hour = self.local_hour(time)?;
        self.windows.iter().find(|w| w.contains(hour))
    }

    /// Short local time label, e.g. `Mar 04 14:30`.
    pub fn format_local(&self, time: Timestamp) -> String {
        DateTime::from_timestamp(time.value(), 0)
            .map(|utc| utc.with_timezone(&self.timezone).format("%b %d %H:%M").to_string())
            .unwrap_or_else(|| time.to_string())
    }

    fn band_point(&self, point: &TimePoint) -> SessionBandPoint {
        match self.window_for(point.time) {
            Some(window) => SessionBandPoint { time: point.time, value: 1, color: window.color },
            None => SessionBandPoint { time: point.time, value: 0, color: Color::TRANSPARENT },
        }
    }

    /// Full recomputation, one band entry per input point.
    pub fn compute_band(&self, points: &[TimePoint]) -> Vec<SessionBandPoint> {
        #[cfg(feature = "parallel")]
        {
            points.par_iter().map(|p| self.band_point(p)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            points.iter().map(|p| self.band_point(p)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_window_is_half_open() {
        let w = SessionWindow::new("Evening", 18, 21, Color::WHITE);
        assert!(w.contains(18));
        assert!(w.contains(19));
        assert!(!w.contains(21));
        assert!(!w.contains(22));
    }

    #[test]
    fn wrapping_window_spans_midnight() {
        let w = SessionWindow::new("Overnight", 22, 2, Color::WHITE);
        assert!(w.contains(23));
        assert!(w.contains(1));
        assert!(!w.contains(2));
        assert!(!w.contains(12));
    }

    #[test]
    fn local_hour_follows_daylight_saving() {
        let calendar = SessionCalendar::default();
        // 2024-01-15 12:00 UTC is 07:00 EST, 2024-07-15 12:00 UTC is 08:00 EDT
        assert_eq!(calendar.local_hour(Timestamp::new(1_705_320_000)), Some(7));
        assert_eq!(calendar.local_hour(Timestamp::new(1_721_044_800)), Some(8));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(SessionCalendar::with_timezone("Mars/Olympus").is_err());
        assert!(SessionCalendar::with_timezone("Europe/London").is_ok());
    }
}
