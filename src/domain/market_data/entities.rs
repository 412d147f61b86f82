pub use super::value_objects::{Ohlc, Price, Timestamp};
use serde::{Deserialize, Serialize};

/// Payload carried by one time bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Ohlc(Ohlc),
    Scalar { value: f64 },
}

impl PointValue {
    /// Close for candles, the value itself for scalar points.
    pub fn last_value(&self) -> f64 {
        match self {
            PointValue::Ohlc(ohlc) => ohlc.close.value(),
            PointValue::Scalar { value } => *value,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            PointValue::Ohlc(ohlc) => format!(
                "O {:.2}  H {:.2}  L {:.2}  C {:.2}",
                ohlc.open.value(),
                ohlc.high.value(),
                ohlc.low.value(),
                ohlc.close.value()
            ),
            PointValue::Scalar { value } => format!("{:.2}", value),
        }
    }
}

/// Domain entity - one normalized sample of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: Timestamp,
    #[serde(flatten)]
    pub value: PointValue,
}

impl TimePoint {
    pub fn candle(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: Timestamp::new(time),
            value: PointValue::Ohlc(Ohlc::new(
                Price::new(open),
                Price::new(high),
                Price::new(low),
                Price::new(close),
            )),
        }
    }

    pub fn scalar(time: i64, value: f64) -> Self {
        Self { time: Timestamp::new(time), value: PointValue::Scalar { value } }
    }
}

/// Input shape of one point as delivered by the data source.
///
/// Every field is optional so a malformed page can be deserialized and then
/// filtered instead of failing wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl RawPoint {
    /// Returns `None` for points missing `time` or any usable payload.
    pub fn normalize(&self) -> Option<TimePoint> {
        let time = Timestamp::new(self.time?);
        let value = match (self.open, self.high, self.low, self.close) {
            (Some(open), Some(high), Some(low), Some(close)) => PointValue::Ohlc(Ohlc::new(
                Price::new(open),
                Price::new(high),
                Price::new(low),
                Price::new(close),
            )),
            _ => PointValue::Scalar { value: self.value? },
        };
        Some(TimePoint { time, value })
    }
}

impl From<TimePoint> for RawPoint {
    fn from(point: TimePoint) -> Self {
        match point.value {
            PointValue::Ohlc(ohlc) => Self {
                time: Some(point.time.value()),
                open: Some(ohlc.open.value()),
                high: Some(ohlc.high.value()),
                low: Some(ohlc.low.value()),
                close: Some(ohlc.close.value()),
                value: None,
            },
            PointValue::Scalar { value } => Self {
                time: Some(point.time.value()),
                value: Some(value),
                ..Self::default()
            },
        }
    }
}

/// The full array handed to the reconciler on every update.
pub type SeriesSnapshot = [RawPoint];

/// Where a marker sits relative to its bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    #[default]
    AboveBar,
    BelowBar,
    InBar,
}

/// Discrete annotated point pushed through to the chart widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub time: Timestamp,
    #[serde(default)]
    pub position: MarkerPosition,
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub text: String,
}
