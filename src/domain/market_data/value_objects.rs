use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

/// Value Object - price level
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, From, Into, Deref, Constructor, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Value Object - bucket time in whole seconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Deref, Constructor, Display,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Absolute distance in seconds.
    pub fn distance(&self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }
}

/// Value Object - OHLC sample for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

/// Value Object - identity of the instrument/session currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct SeriesKey(String);

impl SeriesKey {
    pub fn new(key: String) -> Result<Self, String> {
        if key.trim().is_empty() {
            return Err("Series key cannot be empty".to_string());
        }
        Ok(Self(key.trim().to_uppercase()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeriesKey {
    fn from(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }
}

/// Shape of the rendered series
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, StrumDisplay, EnumIter, EnumString, AsRefStr,
    Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SeriesKind {
    /// OHLC candles, scrolled at the live edge
    #[default]
    Price,
    /// Scalar equity/aggregate curve, inspected as a whole
    Equity,
}

impl SeriesKind {
    pub fn has_session_band(&self) -> bool {
        matches!(self, SeriesKind::Price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn series_key_is_trimmed_and_uppercased() {
        assert_eq!(SeriesKey::new(" btc-usd ".to_string()).unwrap().value(), "BTC-USD");
        assert_eq!(SeriesKey::from("eth"), SeriesKey::new("ETH".to_string()).unwrap());
        assert!(SeriesKey::new("   ".to_string()).is_err());
    }

    #[test]
    fn series_kind_names_round_trip() {
        for kind in SeriesKind::iter() {
            assert_eq!(kind.as_ref().parse::<SeriesKind>().unwrap(), kind);
        }
        assert_eq!("Equity".parse::<SeriesKind>().unwrap(), SeriesKind::Equity);
        assert!(SeriesKind::Price.has_session_band());
        assert!(!SeriesKind::Equity.has_session_band());
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(Timestamp::new(100).distance(Timestamp::new(3_800)), 3_700);
        assert_eq!(Timestamp::new(3_800).distance(Timestamp::new(100)), 3_700);
        assert_eq!(Timestamp::new(i64::MIN).distance(Timestamp::new(i64::MAX)), u64::MAX);
    }
}
