//! Scan overlay compositing.
//!
//! A frame is rebuilt from scratch against the provider's current transform:
//! clear, then one filled/stroked rect per zone and one segment per line.
//! Shapes whose coordinates cannot be resolved this frame are skipped.

use super::provider::{CoordinateProvider, PixelBuffer};
use super::value_objects::{Color, PixelRect, SurfaceSize};
use crate::domain::errors::AppResult;
use crate::domain::market_data::Timestamp;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OFFSCREEN_MARGIN_PX: f64 = 1000.0;
const LABEL_INSET_PX: f64 = 4.0;
const LABEL_BASELINE_PX: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Supply,
    Demand,
    #[serde(alias = "fvg", alias = "imbalance")]
    Gap,
    #[default]
    #[serde(other)]
    Neutral,
}

impl ZoneKind {
    fn base_color(&self) -> Color {
        match self {
            ZoneKind::Supply => Color::from_hex(0xef4444),
            ZoneKind::Demand => Color::from_hex(0x22c55e),
            ZoneKind::Gap => Color::from_hex(0xeab308),
            ZoneKind::Neutral => Color::from_hex(0x94a3b8),
        }
    }

    pub fn fill(&self) -> Color {
        self.base_color().with_alpha(0.15)
    }

    pub fn border(&self) -> Color {
        self.base_color().with_alpha(0.6)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Trend,
    Support,
    Resistance,
    #[default]
    #[serde(other)]
    Other,
}

impl LineKind {
    pub fn color(&self) -> Color {
        match self {
            LineKind::Trend => Color::from_hex(0x38bdf8),
            LineKind::Support => Color::from_hex(0x22c55e),
            LineKind::Resistance => Color::from_hex(0xef4444),
            LineKind::Other => Color::from_hex(0xe2e8f0),
        }
    }

    pub fn is_dashed(&self) -> bool {
        matches!(self, LineKind::Trend)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineKind::Trend => "trend",
            LineKind::Support => "support",
            LineKind::Resistance => "resistance",
            LineKind::Other => "line",
        }
    }
}

/// Price band between two times; an open zone has no end time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub time_start: Timestamp,
    #[serde(default)]
    pub time_end: Option<Timestamp>,
    pub price_start: f64,
    pub price_end: f64,
    #[serde(rename = "type", default)]
    pub kind: ZoneKind,
    #[serde(default)]
    pub label: String,
}

/// Segment from `(x1, y1)` to `(x2, y2)` in time/price space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLine {
    pub x1: Timestamp,
    pub y1: f64,
    pub x2: Timestamp,
    pub y2: f64,
    #[serde(rename = "type", default)]
    pub kind: LineKind,
    #[serde(default)]
    pub color: Option<String>,
}

/// External analysis result, read-only to the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub lines: Vec<ScanLine>,
}

impl ScanResult {
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One primitive for an [`OverlaySurface`]. Colors are CSS strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    Clear,
    FillRect { rect: PixelRect, color: String },
    StrokeRect { rect: PixelRect, color: String, width: f64 },
    Line { from: (f64, f64), to: (f64, f64), color: String, width: f64, dashed: bool },
    Text { text: String, at: (f64, f64), color: String },
}

pub type OverlayFrame = Vec<DrawCommand>;

/// Transparent drawing surface stacked on the chart canvas.
pub trait OverlaySurface {
    fn size(&self) -> SurfaceSize;
    fn resize(&mut self, size: SurfaceSize);
    fn execute(&mut self, frame: &[DrawCommand]) -> AppResult<()>;
    /// Current pixels, for snapshot compositing.
    fn pixels(&self) -> Option<PixelBuffer>;
}

/// Which side of the visible window a time falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    offscreen_margin: f64,
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSCREEN_MARGIN_PX)
    }
}

impl OverlayCompositor {
    pub fn new(offscreen_margin: f64) -> Self {
        Self { offscreen_margin }
    }

    fn side_of(time: Timestamp, visible: Option<(Timestamp, Timestamp)>) -> Option<Side> {
        let (from, to) = visible?;
        if time < from {
            Some(Side::Left)
        } else if time > to {
            Some(Side::Right)
        } else {
            // inside the window but not representable (gap, mid-resize)
            None
        }
    }

    fn offscreen_x(&self, side: Side, size: SurfaceSize) -> f64 {
        match side {
            Side::Left => -self.offscreen_margin,
            Side::Right => size.width + self.offscreen_margin,
        }
    }

    /// Time → x, substituting an out-of-bounds position when the time is off
    /// screen. `fallback` is used when the visible window is unknown.
    fn resolve_x(
        &self,
        provider: &dyn CoordinateProvider,
        time: Timestamp,
        visible: Option<(Timestamp, Timestamp)>,
        fallback: Option<Side>,
        size: SurfaceSize,
    ) -> Option<f64> {
        if let Some(x) = provider.time_to_coordinate(time) {
            return Some(x);
        }
        let side = match visible {
            Some(_) => Self::side_of(time, visible)?,
            None => fallback?,
        };
        Some(self.offscreen_x(side, size))
    }

    fn compose_zone(
        &self,
        zone: &Zone,
        provider: &dyn CoordinateProvider,
        visible: Option<(Timestamp, Timestamp)>,
        size: SurfaceSize,
        frame: &mut OverlayFrame,
    ) {
        let Some(left) = self.resolve_x(provider, zone.time_start, visible, Some(Side::Left), size) else {
            return;
        };
        let right = match zone.time_end {
            None => Some(size.width),
            Some(end) => self.resolve_x(provider, end, visible, Some(Side::Right), size),
        };
        let Some(right) = right else {
            return;
        };
        let (Some(y_start), Some(y_end)) = (
            provider.price_to_coordinate(zone.price_start),
            provider.price_to_coordinate(zone.price_end),
        ) else {
            return;
        };

        let full = PixelRect::from_edges(left, y_start, right, y_end);
        let Some(rect) = full.clip_to(size) else {
            return;
        };

        frame.push(DrawCommand::FillRect { rect, color: zone.kind.fill().to_css() });
        frame.push(DrawCommand::StrokeRect { rect, color: zone.kind.border().to_css(), width: 1.0 });

        if !zone.label.is_empty() && size.contains(full.x, full.y) {
            frame.push(DrawCommand::Text {
                text: zone.label.clone(),
                at: (full.x + LABEL_INSET_PX, full.y + LABEL_BASELINE_PX),
                color: zone.kind.border().with_alpha(1.0).to_css(),
            });
        }
    }

    fn compose_line(
        &self,
        line: &ScanLine,
        provider: &dyn CoordinateProvider,
        visible: Option<(Timestamp, Timestamp)>,
        size: SurfaceSize,
        frame: &mut OverlayFrame,
    ) {
        let (Some(x1), Some(x2)) = (
            self.resolve_x(provider, line.x1, visible, None, size),
            self.resolve_x(provider, line.x2, visible, None, size),
        ) else {
            return;
        };
        let (Some(y1), Some(y2)) = (provider.price_to_coordinate(line.y1), provider.price_to_coordinate(line.y2))
        else {
            return;
        };

        let color = line.color.clone().unwrap_or_else(|| line.kind.color().to_css());
        frame.push(DrawCommand::Line {
            from: (x1, y1),
            to: (x2, y2),
            color: color.clone(),
            width: 1.5,
            dashed: line.kind.is_dashed(),
        });

        if size.contains(x1, y1) {
            frame.push(DrawCommand::Text {
                text: line.kind.label().to_string(),
                at: (x1 + LABEL_INSET_PX, y1 - LABEL_INSET_PX),
                color,
            });
        }
    }

    /// Builds the full frame for the current transform.
    pub fn compose(&self, scan: Option<&ScanResult>, provider: &dyn CoordinateProvider, size: SurfaceSize) -> OverlayFrame {
        let mut frame = vec![DrawCommand::Clear];
        let Some(scan) = scan else {
            return frame;
        };
        if size.is_empty() {
            return frame;
        }

        let visible = provider.visible_time_range();
        for zone in &scan.zones {
            self.compose_zone(zone, provider, visible, size, &mut frame);
        }
        for line in &scan.lines {
            self.compose_line(line, provider, visible, size, &mut frame);
        }
        frame
    }
}
