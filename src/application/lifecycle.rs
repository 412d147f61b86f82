//! Viewport and lifecycle state of one chart container.
//!
//! Everything here is plain state machines driven by the host: visibility
//! callbacks, resize bursts, crosshair moves and snapshot requests. None of
//! it touches the browser directly.

use crate::domain::chart::{
    CoordinateProvider, CrosshairEvent, PixelBuffer, ProviderCapabilities, SessionCalendar, SurfaceSize,
};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{SeriesKind, TimePoint, Timestamp};
use crate::{log_debug, log_error, log_info};
use serde::Serialize;

/// Rendering runs only while the container intersects the viewport, the
/// host has not marked it dormant and the browser tab is shown. Each input
/// is tracked separately, so one never overrides another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DormancyGate {
    intersecting: bool,
    dormant: bool,
    tab_hidden: bool,
}

impl Default for DormancyGate {
    fn default() -> Self {
        // assume visible until the first observer callback says otherwise
        Self { intersecting: true, dormant: false, tab_hidden: false }
    }
}

impl DormancyGate {
    pub fn is_active(&self) -> bool {
        self.intersecting && !self.dormant && !self.tab_hidden
    }

    pub fn set_tab_hidden(&mut self, hidden: bool) {
        self.tab_hidden = hidden;
    }

    pub fn set_intersecting(&mut self, intersecting: bool) {
        self.intersecting = intersecting;
    }

    pub fn set_dormant(&mut self, dormant: bool) {
        self.dormant = dormant;
    }
}

/// What the host must do with its animation-frame scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTransition {
    Start,
    Stop,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameTask {
    #[default]
    Idle,
    Running,
}

impl FrameTask {
    /// Moves the task to match `active`.
    pub fn sync(&mut self, active: bool) -> FrameTransition {
        match (*self, active) {
            (FrameTask::Idle, true) => {
                *self = FrameTask::Running;
                FrameTransition::Start
            }
            (FrameTask::Running, false) => {
                *self = FrameTask::Idle;
                FrameTransition::Stop
            }
            _ => FrameTransition::Unchanged,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, FrameTask::Running)
    }
}

/// Keeps only the latest requested size until the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeCoalescer {
    pending: Option<SurfaceSize>,
}

impl ResizeCoalescer {
    pub fn request(&mut self, size: SurfaceSize) {
        self.pending = Some(size);
    }

    pub fn take(&mut self) -> Option<SurfaceSize> {
        self.pending.take()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipPayload {
    pub x: f64,
    pub y: f64,
    pub primary_label: String,
    pub secondary_label: String,
}

/// Header legend shown while the pointer is outside the plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendValues {
    pub time: Timestamp,
    pub label: String,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverUpdate {
    Unchanged,
    Show(TooltipPayload),
    Hide(Option<LegendValues>),
}

/// Binary search over normalized (strictly ascending) points.
pub fn point_at(points: &[TimePoint], time: Timestamp) -> Option<&TimePoint> {
    points.binary_search_by_key(&time, |p| p.time).ok().map(|i| &points[i])
}

pub fn legend_for(point: &TimePoint, calendar: &SessionCalendar) -> LegendValues {
    LegendValues { time: point.time, label: point.value.summary(), time_label: calendar.format_local(point.time) }
}

#[derive(Debug, Clone, Default)]
pub struct HoverTracker {
    last_time: Option<Timestamp>,
    showing: bool,
}

impl HoverTracker {
    pub fn on_move(
        &mut self,
        event: CrosshairEvent,
        points: &[TimePoint],
        kind: SeriesKind,
        calendar: &SessionCalendar,
    ) -> HoverUpdate {
        let hovered = match (event.point, event.time) {
            (Some(at), Some(time)) => point_at(points, time).map(|p| (at, p)),
            _ => None,
        };

        let Some(((x, y), point)) = hovered else {
            if !self.showing && self.last_time.is_none() {
                return HoverUpdate::Unchanged;
            }
            self.showing = false;
            self.last_time = None;
            return HoverUpdate::Hide(points.last().map(|p| legend_for(p, calendar)));
        };

        if self.showing && self.last_time == Some(point.time) {
            return HoverUpdate::Unchanged;
        }
        self.showing = true;
        self.last_time = Some(point.time);

        let mut secondary_label = calendar.format_local(point.time);
        if kind.has_session_band() {
            if let Some(window) = calendar.window_for(point.time) {
                secondary_label = format!("{} · {}", secondary_label, window.name);
            }
        }

        HoverUpdate::Show(TooltipPayload { x, y, primary_label: point.value.summary(), secondary_label })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Turns a composited image into the string handed to the sink
/// (typically a PNG data URL).
pub trait ImageEncoder {
    fn encode(&self, image: &PixelBuffer) -> AppResult<String>;
}

/// Receives exported snapshots.
pub trait SnapshotSink {
    fn deliver(&self, encoded_image: String, is_automatic: bool);
}

/// Source-over of `overlay` onto `base`. Overlay pixels outside the base are
/// ignored.
pub fn composite(base: &PixelBuffer, overlay: &PixelBuffer) -> AppResult<PixelBuffer> {
    if !base.is_consistent() || !overlay.is_consistent() {
        return Err(AppError::ExportError("pixel buffer size does not match its dimensions".to_string()));
    }

    let mut out = base.clone();
    let width = base.width.min(overlay.width) as usize;
    let height = base.height.min(overlay.height) as usize;

    for y in 0..height {
        for x in 0..width {
            let o = (y * overlay.width as usize + x) * 4;
            let b = (y * base.width as usize + x) * 4;
            let src_a = overlay.rgba[o + 3] as f32 / 255.0;
            if src_a == 0.0 {
                continue;
            }
            let dst_a = out.rgba[b + 3] as f32 / 255.0;
            let out_a = src_a + dst_a * (1.0 - src_a);
            for c in 0..3 {
                let src = overlay.rgba[o + c] as f32;
                let dst = out.rgba[b + c] as f32;
                let blended = (src * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
                out.rgba[b + c] = blended.round().clamp(0.0, 255.0) as u8;
            }
            out.rgba[b + 3] = (out_a * 255.0).round() as u8;
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    flash_ms: u64,
    flash_until: Option<u64>,
}

impl SnapshotExporter {
    pub fn new(flash_ms: u64) -> Self {
        Self { flash_ms, flash_until: None }
    }

    pub fn is_flashing(&self, now_ms: u64) -> bool {
        self.flash_until.is_some_and(|until| now_ms < until)
    }

    fn capture(
        capabilities: ProviderCapabilities,
        provider: &dyn CoordinateProvider,
        overlay: Option<PixelBuffer>,
        encoder: &dyn ImageEncoder,
    ) -> AppResult<String> {
        if !capabilities.screenshot {
            return Err(AppError::CapabilityMissing("takeScreenshot"));
        }
        let base = provider
            .take_screenshot()
            .ok_or_else(|| AppError::ExportError("chart returned no screenshot".to_string()))?;
        let image = match overlay {
            Some(overlay) => composite(&base, &overlay)?,
            None => base,
        };
        encoder.encode(&image)
    }

    /// Captures, composites and delivers one snapshot. Failures are logged
    /// and the sink is not called. Manual captures start the flash.
    #[allow(clippy::too_many_arguments)]
    pub fn export(
        &mut self,
        capabilities: ProviderCapabilities,
        provider: &dyn CoordinateProvider,
        overlay: Option<PixelBuffer>,
        encoder: &dyn ImageEncoder,
        sink: &dyn SnapshotSink,
        is_automatic: bool,
        now_ms: u64,
    ) -> bool {
        match Self::capture(capabilities, provider, overlay, encoder) {
            Ok(encoded) => {
                if !is_automatic {
                    self.flash_until = Some(now_ms + self.flash_ms);
                }
                log_info!(
                    LogComponent::Application("Snapshot"),
                    "📸 Snapshot captured ({} chars, automatic: {})",
                    encoded.len(),
                    is_automatic
                );
                sink.deliver(encoded, is_automatic);
                true
            }
            Err(AppError::CapabilityMissing(name)) => {
                log_debug!(LogComponent::Application("Snapshot"), "Skipping snapshot, chart lacks {}", name);
                false
            }
            Err(e) => {
                log_error!(LogComponent::Application("Snapshot"), "❌ Snapshot export failed: {}", e);
                false
            }
        }
    }
}
