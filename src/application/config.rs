use crate::domain::chart::overlay::DEFAULT_OFFSCREEN_MARGIN_PX;
use crate::domain::chart::reconciler::DEFAULT_TIME_JUMP_THRESHOLD_SECS;
use crate::domain::chart::sessions::{DEFAULT_SESSION_TIMEZONE, SessionCalendar};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tunables of one chart instance.
///
/// Deserialized from the host's JSON options; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub time_jump_threshold_secs: i64,
    pub history_margin_bars: f64,
    pub history_debounce_ms: u64,
    pub capture_flash_ms: u64,
    pub offscreen_margin_px: f64,
    pub session_timezone: String,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_jump_threshold_secs: DEFAULT_TIME_JUMP_THRESHOLD_SECS,
            history_margin_bars: 50.0,
            history_debounce_ms: 500,
            capture_flash_ms: 300,
            offscreen_margin_px: DEFAULT_OFFSCREEN_MARGIN_PX,
            session_timezone: DEFAULT_SESSION_TIMEZONE.to_string(),
            log_level: "debug".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates host options.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AppError::ConfigError(format!("invalid engine options: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.time_jump_threshold_secs < 0 {
            return Err(AppError::ConfigError("timeJumpThresholdSecs must not be negative".to_string()));
        }
        if !self.history_margin_bars.is_finite() || self.history_margin_bars < 0.0 {
            return Err(AppError::ConfigError("historyMarginBars must be a non-negative number".to_string()));
        }
        if !self.offscreen_margin_px.is_finite() || self.offscreen_margin_px < 0.0 {
            return Err(AppError::ConfigError("offscreenMarginPx must be a non-negative number".to_string()));
        }
        self.level()?;
        self.calendar()?;
        Ok(())
    }

    pub fn level(&self) -> AppResult<LogLevel> {
        LogLevel::from_str(&self.log_level)
            .map_err(|_| AppError::ConfigError(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn calendar(&self) -> AppResult<SessionCalendar> {
        SessionCalendar::with_timezone(&self.session_timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.time_jump_threshold_secs, 3600);
        assert_eq!(config.history_margin_bars, 50.0);
    }

    #[test]
    fn camel_case_overrides() {
        let config = EngineConfig::from_json(r#"{"historyDebounceMs": 250, "sessionTimezone": "Europe/London"}"#)
            .unwrap();
        assert_eq!(config.history_debounce_ms, 250);
        assert_eq!(config.calendar().unwrap().timezone(), chrono_tz::Europe::London);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"timeJumpThresholdSecs": -1}"#),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"sessionTimezone": "Nowhere/Else"}"#),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(EngineConfig::from_json(r#"{"logLevel": "loud"}"#), Err(AppError::ConfigError(_))));
        assert!(matches!(EngineConfig::from_json("not json"), Err(AppError::ConfigError(_))));
    }
}
