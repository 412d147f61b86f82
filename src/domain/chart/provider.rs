//! Seam to the chart widget that owns the primary canvas.
//!
//! The engine never draws candles itself. It hands normalized data to a
//! [`CoordinateProvider`], reads its live time/price transform back for the
//! overlay, and adjusts its visible logical range when history is prepended.

use super::sessions::SessionBandPoint;
use super::value_objects::{LogicalRange, SurfaceSize};
use crate::domain::market_data::{Marker, TimePoint, Timestamp};

/// Optional widget features, probed once when a chart instance is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    pub markers: bool,
    pub screenshot: bool,
}

/// RGBA8 image, row-major, no premultiplied alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, rgba: vec![0; width as usize * height as usize * 4] }
    }

    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let rgba = pixel.iter().copied().cycle().take(width as usize * height as usize * 4).collect();
        Self { width, height, rgba }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    pub fn is_consistent(&self) -> bool {
        self.rgba.len() == self.width as usize * self.height as usize * 4
    }
}

/// Crosshair callback payload as reported by the widget.
///
/// `point` is `None` once the pointer has left the plot area; `time` is the
/// bar the widget snapped to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CrosshairEvent {
    pub point: Option<(f64, f64)>,
    pub time: Option<Timestamp>,
}

impl CrosshairEvent {
    pub fn at(x: f64, y: f64, time: i64) -> Self {
        Self { point: Some((x, y)), time: Some(Timestamp::new(time)) }
    }

    pub fn left() -> Self {
        Self::default()
    }
}

/// The chart widget.
///
/// Coordinate lookups return `None` when a value is not representable in the
/// current frame (off-screen time, mid-resize, empty series).
pub trait CoordinateProvider {
    fn set_data(&mut self, points: &[TimePoint]);
    fn set_session_band(&mut self, band: &[SessionBandPoint]);

    fn time_to_coordinate(&self, time: Timestamp) -> Option<f64>;
    fn price_to_coordinate(&self, price: f64) -> Option<f64>;

    fn visible_logical_range(&self) -> Option<LogicalRange>;
    fn set_visible_logical_range(&mut self, range: LogicalRange);
    /// Time span currently on screen, used to decide which side an
    /// unrepresentable time lies on.
    fn visible_time_range(&self) -> Option<(Timestamp, Timestamp)>;

    fn scroll_to_live(&mut self);
    fn fit_content(&mut self);
    fn set_auto_scale(&mut self, enabled: bool);
    fn resize(&mut self, size: SurfaceSize);

    /// Drops per-symbol horizontal price-line annotations.
    fn clear_price_lines(&mut self) {}

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Only called when `capabilities().markers` was set at init.
    fn set_markers(&mut self, _markers: &[Marker]) {}

    /// Only called when `capabilities().screenshot` was set at init.
    fn take_screenshot(&self) -> Option<PixelBuffer> {
        None
    }
}
