#![allow(dead_code)]

use price_chart_sync::application::{ImageEncoder, SnapshotSink};
use price_chart_sync::domain::chart::{
    CoordinateProvider, DrawCommand, LogicalRange, OverlaySurface, PixelBuffer, ProviderCapabilities,
    SessionBandPoint, SurfaceSize,
};
use price_chart_sync::domain::errors::{AppError, AppResult};
use price_chart_sync::domain::market_data::{Marker, RawPoint, TimePoint, Timestamp};
use std::cell::RefCell;

/// In-memory chart widget with a linear time/price transform.
///
/// Times inside `visible_time` map to `(t - from) * px_per_sec`; anything
/// else (or anything listed in `gaps`) is not representable. Prices map to
/// `height - price`.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub data: Vec<TimePoint>,
    pub band: Vec<SessionBandPoint>,
    pub range: Option<LogicalRange>,
    pub visible_time: Option<(Timestamp, Timestamp)>,
    pub gaps: Vec<Timestamp>,
    pub px_per_sec: f64,
    pub height: f64,
    pub calls: Vec<String>,
    pub capabilities: ProviderCapabilities,
    pub markers: Vec<Vec<Marker>>,
    pub screenshot: Option<PixelBuffer>,
    pub size: Option<SurfaceSize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self { px_per_sec: 1.0, height: 300.0, ..Self::default() }
    }

    pub fn with_visible(from: i64, to: i64, px_per_sec: f64) -> Self {
        Self { visible_time: Some((Timestamp::new(from), Timestamp::new(to))), px_per_sec, ..Self::new() }
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|c| c == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| *c == name).count()
    }
}

impl CoordinateProvider for MockProvider {
    fn set_data(&mut self, points: &[TimePoint]) {
        self.calls.push("set_data".into());
        self.data = points.to_vec();
    }

    fn set_session_band(&mut self, band: &[SessionBandPoint]) {
        self.calls.push("set_session_band".into());
        self.band = band.to_vec();
    }

    fn time_to_coordinate(&self, time: Timestamp) -> Option<f64> {
        let (from, to) = self.visible_time?;
        if time < from || time > to || self.gaps.contains(&time) {
            return None;
        }
        Some((time.value() - from.value()) as f64 * self.px_per_sec)
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        Some(self.height - price)
    }

    fn visible_logical_range(&self) -> Option<LogicalRange> {
        self.range
    }

    fn set_visible_logical_range(&mut self, range: LogicalRange) {
        self.calls.push("set_visible_logical_range".into());
        self.range = Some(range);
    }

    fn visible_time_range(&self) -> Option<(Timestamp, Timestamp)> {
        self.visible_time
    }

    fn scroll_to_live(&mut self) {
        self.calls.push("scroll_to_live".into());
    }

    fn fit_content(&mut self) {
        self.calls.push("fit_content".into());
    }

    fn set_auto_scale(&mut self, _enabled: bool) {
        self.calls.push("set_auto_scale".into());
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.calls.push("resize".into());
        self.size = Some(size);
    }

    fn clear_price_lines(&mut self) {
        self.calls.push("clear_price_lines".into());
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn set_markers(&mut self, markers: &[Marker]) {
        self.markers.push(markers.to_vec());
    }

    fn take_screenshot(&self) -> Option<PixelBuffer> {
        self.screenshot.clone()
    }
}

/// Overlay surface that keeps every executed frame.
#[derive(Debug)]
pub struct RecordingSurface {
    pub size: SurfaceSize,
    pub frames: Vec<Vec<DrawCommand>>,
    pub pixels: Option<PixelBuffer>,
    pub fail: bool,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { size: SurfaceSize::new(width, height), frames: Vec::new(), pixels: None, fail: false }
    }
}

impl OverlaySurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn execute(&mut self, frame: &[DrawCommand]) -> AppResult<()> {
        if self.fail {
            return Err(AppError::RenderingError("context lost".to_string()));
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn pixels(&self) -> Option<PixelBuffer> {
        self.pixels.clone()
    }
}

/// Encodes an image as `WxH:<first pixel>`.
pub struct DebugEncoder;

impl ImageEncoder for DebugEncoder {
    fn encode(&self, image: &PixelBuffer) -> AppResult<String> {
        Ok(format!("{}x{}:{:?}", image.width, image.height, image.pixel(0, 0).unwrap_or_default()))
    }
}

#[derive(Default)]
pub struct CollectingSink {
    pub delivered: RefCell<Vec<(String, bool)>>,
}

impl SnapshotSink for CollectingSink {
    fn deliver(&self, encoded_image: String, is_automatic: bool) {
        self.delivered.borrow_mut().push((encoded_image, is_automatic));
    }
}

pub fn raw(time: i64, value: f64) -> RawPoint {
    RawPoint { time: Some(time), value: Some(value), ..RawPoint::default() }
}

pub fn raw_candle(time: i64, close: f64) -> RawPoint {
    RawPoint {
        time: Some(time),
        open: Some(close - 1.0),
        high: Some(close + 2.0),
        low: Some(close - 2.0),
        close: Some(close),
        value: None,
    }
}

/// `count` candles spaced `step` seconds apart starting at `start`.
pub fn candles(start: i64, count: i64, step: i64) -> Vec<RawPoint> {
    (0..count).map(|i| raw_candle(start + i * step, 100.0 + i as f64)).collect()
}
