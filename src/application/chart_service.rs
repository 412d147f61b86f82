use crate::application::config::EngineConfig;
use crate::application::history::{HistoryRequest, HistoryTrigger};
use crate::application::lifecycle::{
    DormancyGate, FrameTask, FrameTransition, HoverTracker, HoverUpdate, ImageEncoder, LegendValues, ResizeCoalescer,
    SnapshotExporter, SnapshotSink, legend_for, point_at,
};
use crate::domain::chart::{
    CoordinateProvider, CrosshairEvent, LogicalRange, OverlayCompositor, OverlaySurface, ProviderCapabilities,
    ReconcileOutcome, ReconciliationState, ScanResult, SeriesReconciler, SurfaceSize,
};
use crate::domain::errors::AppResult;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Marker, SeriesKey, SeriesKind, SeriesSnapshot, TimePoint, Timestamp};
use crate::{log_debug, log_info, log_warn};
use std::sync::Arc;

/// One chart container: reconciliation bookkeeping, lifecycle gates, hover
/// state and the current scan result.
///
/// The provider and overlay surface are owned by the host and lent to each
/// call, so the instance itself stays `Send + Sync` and can live in the
/// dashboard registry.
pub struct ChartInstance {
    id: String,
    kind: SeriesKind,
    capabilities: ProviderCapabilities,
    reconciler: SeriesReconciler,
    compositor: OverlayCompositor,
    state: ReconciliationState,
    points: Vec<TimePoint>,
    history: HistoryTrigger,
    gate: DormancyGate,
    frame: FrameTask,
    resize: ResizeCoalescer,
    hover: HoverTracker,
    snapshot: SnapshotExporter,
    scan: Option<Arc<ScanResult>>,
    markers: Vec<Marker>,
}

impl ChartInstance {
    /// Capabilities are read once here and never re-probed.
    pub fn new(
        id: impl Into<String>,
        kind: SeriesKind,
        config: &EngineConfig,
        capabilities: ProviderCapabilities,
    ) -> AppResult<Self> {
        config.validate()?;
        let id = id.into();
        log_info!(
            LogComponent::Application("ChartInstance"),
            "🚀 Chart '{}' ({}) created, capabilities {:?}",
            id,
            kind,
            capabilities
        );
        Ok(Self {
            id,
            kind,
            capabilities,
            reconciler: SeriesReconciler::new(config.time_jump_threshold_secs, config.calendar()?),
            compositor: OverlayCompositor::new(config.offscreen_margin_px),
            state: ReconciliationState::default(),
            points: Vec::new(),
            history: HistoryTrigger::new(config.history_margin_bars, config.history_debounce_ms),
            gate: DormancyGate::default(),
            frame: FrameTask::default(),
            resize: ResizeCoalescer::default(),
            hover: HoverTracker::default(),
            snapshot: SnapshotExporter::new(config.capture_flash_ms),
            scan: None,
            markers: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_active()
    }

    pub fn frame_task(&self) -> FrameTask {
        self.frame
    }

    /// Reconciles a full snapshot for `key`.
    pub fn apply_snapshot(
        &mut self,
        key: &SeriesKey,
        snapshot: &SeriesSnapshot,
        provider: &mut dyn CoordinateProvider,
    ) -> ReconcileOutcome {
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = self.reconciler.reconcile(state, key, self.kind, snapshot, provider);
        self.state = state;

        if outcome.key_changed {
            // zones of the previous key must not land on the new transform
            self.scan = None;
            self.history.reset();
            self.hover.reset();
        }
        self.points = outcome.points.clone();
        outcome
    }

    /// Same as [`Self::apply_snapshot`], but a page for a key that is no
    /// longer displayed is discarded.
    pub fn apply_history_page(
        &mut self,
        key: &SeriesKey,
        snapshot: &SeriesSnapshot,
        provider: &mut dyn CoordinateProvider,
    ) -> Option<ReconcileOutcome> {
        if !self.state.is_current(key) {
            log_warn!(
                LogComponent::Application("ChartInstance"),
                "⚠️ Dropping stale history page for {} ({} points)",
                key,
                snapshot.len()
            );
            return None;
        }
        Some(self.apply_snapshot(key, snapshot, provider))
    }

    pub fn on_visible_range_changed(&mut self, range: LogicalRange) -> Option<HistoryRequest> {
        self.history.check(&mut self.state, range)
    }

    pub fn history_load_finished(&mut self, key: &SeriesKey, now_ms: u64) {
        if !self.state.is_current(key) {
            log_debug!(LogComponent::Application("ChartInstance"), "Ignoring finished load for stale key {}", key);
            return;
        }
        self.history.load_finished(now_ms);
    }

    pub fn set_intersecting(&mut self, intersecting: bool) -> FrameTransition {
        self.gate.set_intersecting(intersecting);
        self.sync_frame()
    }

    pub fn set_dormant(&mut self, dormant: bool) -> FrameTransition {
        self.gate.set_dormant(dormant);
        self.sync_frame()
    }

    /// Browser tab visibility; independent of the host's dormant flag.
    pub fn set_tab_hidden(&mut self, hidden: bool) -> FrameTransition {
        self.gate.set_tab_hidden(hidden);
        self.sync_frame()
    }

    /// Aligns the frame task with the gate, e.g. once a surface is attached.
    pub fn sync_frame(&mut self) -> FrameTransition {
        let transition = self.frame.sync(self.gate.is_active());
        if transition != FrameTransition::Unchanged {
            log_debug!(LogComponent::Application("ChartInstance"), "Chart '{}' frame task {:?}", self.id, transition);
        }
        if transition == FrameTransition::Stop {
            self.hover.reset();
        }
        transition
    }

    pub fn request_resize(&mut self, width: f64, height: f64) {
        self.resize.request(SurfaceSize::new(width, height));
    }

    /// Applies the latest pending size to both canvases.
    pub fn flush_resize(&mut self, provider: &mut dyn CoordinateProvider, surface: &mut dyn OverlaySurface) -> bool {
        match self.resize.take() {
            Some(size) => {
                provider.resize(size);
                surface.resize(size);
                true
            }
            None => false,
        }
    }

    /// Timers only, no drawing. Safe to call while dormant.
    pub fn poll_timers(&mut self, now_ms: u64) {
        self.history.poll(&mut self.state, now_ms);
    }

    /// One animation frame.
    pub fn on_frame(&mut self, now_ms: u64, provider: &mut dyn CoordinateProvider, surface: &mut dyn OverlaySurface) {
        self.poll_timers(now_ms);
        if !self.gate.is_active() {
            return;
        }
        self.flush_resize(provider, surface);

        let frame = self.compositor.compose(self.scan.as_deref(), &*provider, surface.size());
        if let Err(e) = surface.execute(&frame) {
            log_warn!(LogComponent::Application("ChartInstance"), "⚠️ Overlay frame skipped: {}", e);
        }
    }

    pub fn on_crosshair_move(&mut self, event: CrosshairEvent) -> HoverUpdate {
        if !self.gate.is_active() {
            return HoverUpdate::Unchanged;
        }
        self.hover.on_move(event, &self.points, self.kind, self.reconciler.sessions())
    }

    /// Replaces the scan result; `None` clears the overlay on the next frame.
    /// A key change clears it as well.
    pub fn set_scan_result(&mut self, scan: Option<Arc<ScanResult>>) {
        self.scan = scan;
    }

    pub fn scan_result(&self) -> Option<&Arc<ScanResult>> {
        self.scan.as_ref()
    }

    /// Forwards markers when they differ from the last pushed list. Returns
    /// whether the provider was called.
    pub fn set_markers(&mut self, markers: Vec<Marker>, provider: &mut dyn CoordinateProvider) -> bool {
        if !self.capabilities.markers || markers == self.markers {
            return false;
        }
        provider.set_markers(&markers);
        self.markers = markers;
        true
    }

    #[allow(clippy::too_many_arguments)]
    pub fn export_snapshot(
        &mut self,
        provider: &dyn CoordinateProvider,
        surface: &dyn OverlaySurface,
        encoder: &dyn ImageEncoder,
        sink: &dyn SnapshotSink,
        is_automatic: bool,
        now_ms: u64,
    ) -> bool {
        self.snapshot.export(self.capabilities, provider, surface.pixels(), encoder, sink, is_automatic, now_ms)
    }

    pub fn is_flashing(&self, now_ms: u64) -> bool {
        self.snapshot.is_flashing(now_ms)
    }

    /// Reconciled point under a click, if any.
    pub fn on_click(&self, time: Timestamp) -> Option<TimePoint> {
        point_at(&self.points, time).copied()
    }

    pub fn latest_legend(&self) -> Option<LegendValues> {
        self.points.last().map(|p| legend_for(p, self.reconciler.sessions()))
    }
}
