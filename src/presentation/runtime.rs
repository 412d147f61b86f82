//! Browser wiring of one mounted chart container.
//!
//! The [`ChartInstance`] itself lives in the dashboard registry; this runtime
//! owns the JS-side pieces lent to it on every call (provider adapter,
//! overlay canvas, frame loop, observers and subscriptions).

use crate::application::{
    ChartInstance, FrameTransition, HistoryRequest, HoverUpdate, LegendValues, SnapshotSink, TooltipPayload,
};
use crate::domain::chart::{CrosshairEvent, LogicalRange, ScanResult};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::logging::{LogComponent, get_time_provider};
use crate::domain::market_data::{Marker, RawPoint, SeriesKey, Timestamp};
use crate::ecs::components::ChartComponent;
use crate::global_state::registry;
use crate::infrastructure::{CanvasOverlaySurface, CanvasPngEncoder, FrameLoop, JsCoordinateProvider};
use crate::{log_debug, log_error, log_trace, log_warn};
use hecs::Entity;
use js_sys::{Array, Function, JSON, Promise, Reflect};
use leptos::{RwSignal, SignalGetUntracked, SignalSet, SignalWithUntracked, create_rw_signal};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    HtmlCanvasElement, HtmlElement, IntersectionObserver, IntersectionObserverEntry, ResizeObserver,
    ResizeObserverEntry,
};

pub type SharedRuntime = Rc<RefCell<ChartRuntime>>;

/// Reactive outputs rendered by the overlay component.
#[derive(Clone, Copy)]
pub struct OverlaySignals {
    pub tooltip: RwSignal<Option<TooltipPayload>>,
    pub legend: RwSignal<Option<LegendValues>>,
    pub flashing: RwSignal<bool>,
}

impl OverlaySignals {
    pub fn new() -> Self {
        Self { tooltip: create_rw_signal(None), legend: create_rw_signal(None), flashing: create_rw_signal(false) }
    }
}

impl Default for OverlaySignals {
    fn default() -> Self {
        Self::new()
    }
}

/// Host callbacks, all optional.
#[derive(Default, Clone)]
pub struct RuntimeCallbacks {
    /// `loadMore(key, oldestTime) -> Promise<void>`
    pub load_more: Option<Function>,
    /// `onSnapshot(encodedImage, isAutomatic)`
    pub on_snapshot: Option<Function>,
    /// `onClick(point)`
    pub on_click: Option<Function>,
}

impl RuntimeCallbacks {
    pub fn from_js(value: &JsValue) -> Self {
        let get = |name: &str| {
            Reflect::get(value, &JsValue::from_str(name)).ok().and_then(|f| f.dyn_into::<Function>().ok())
        };
        Self { load_more: get("loadMore"), on_snapshot: get("onSnapshot"), on_click: get("onClick") }
    }
}

struct JsSnapshotSink<'a> {
    callback: Option<&'a Function>,
}

impl SnapshotSink for JsSnapshotSink<'_> {
    fn deliver(&self, encoded_image: String, is_automatic: bool) {
        if let Some(callback) = self.callback {
            if let Err(e) =
                callback.call2(&JsValue::NULL, &JsValue::from_str(&encoded_image), &JsValue::from_bool(is_automatic))
            {
                log_warn!(LogComponent::Presentation("Runtime"), "⚠️ onSnapshot threw {:?}", e);
            }
        }
    }
}

/// Parses a JS value through its JSON form.
pub fn from_js<T: DeserializeOwned>(value: &JsValue) -> AppResult<T> {
    let json = JSON::stringify(value)
        .map_err(|e| AppError::BridgeError(format!("JSON.stringify failed: {:?}", e)))?
        .as_string()
        .ok_or_else(|| AppError::BridgeError("value is not serializable".to_string()))?;
    Ok(serde_json::from_str(&json)?)
}

/// Runs `f` against the registered instance. `None` when the registry is
/// busy (re-entrant JS callback) or the chart was unmounted.
pub fn with_chart<R>(entity: Entity, f: impl FnOnce(&mut ChartInstance) -> R) -> Option<R> {
    let world = registry().try_lock().ok()?;
    let mut component = world.world.get::<&mut ChartComponent>(entity).ok()?;
    Some(f(&mut component.0))
}

fn now_ms() -> u64 {
    get_time_provider().current_timestamp()
}

pub struct ChartRuntime {
    entity: Entity,
    provider: JsCoordinateProvider,
    surface: Option<CanvasOverlaySurface>,
    encoder: CanvasPngEncoder,
    frame_loop: FrameLoop,
    signals: OverlaySignals,
    callbacks: RuntimeCallbacks,
    subscriptions: Vec<Closure<dyn FnMut(JsValue)>>,
    observers: Vec<(Closure<dyn FnMut(Array)>, ObserverHandle)>,
}

enum ObserverHandle {
    Resize(ResizeObserver),
    Intersection(IntersectionObserver),
}

impl ChartRuntime {
    pub fn new(
        entity: Entity,
        provider: JsCoordinateProvider,
        signals: OverlaySignals,
        callbacks: RuntimeCallbacks,
    ) -> SharedRuntime {
        Rc::new(RefCell::new(Self {
            entity,
            provider,
            surface: None,
            encoder: CanvasPngEncoder,
            frame_loop: FrameLoop::new(),
            signals,
            callbacks,
            subscriptions: Vec::new(),
            observers: Vec::new(),
        }))
    }

    /// Overlay canvas became available.
    pub fn attach_surface(runtime: &SharedRuntime, canvas: HtmlCanvasElement) {
        match CanvasOverlaySurface::new(canvas) {
            Ok(surface) => {
                runtime.borrow_mut().surface = Some(surface);
                let entity = runtime.borrow().entity;
                // a Start issued before the canvas existed was not applied
                let running = with_chart(entity, |chart| {
                    chart.sync_frame();
                    chart.frame_task().is_running()
                })
                .unwrap_or(false);
                if running {
                    Self::apply_transition(runtime, FrameTransition::Start);
                }
            }
            Err(e) => {
                log_error!(LogComponent::Presentation("Runtime"), "❌ Overlay canvas unusable: {}", e);
            }
        }
    }

    pub fn apply_snapshot(runtime: &SharedRuntime, key: &SeriesKey, points: &[RawPoint]) {
        let Ok(mut rt) = runtime.try_borrow_mut() else {
            log_warn!(LogComponent::Presentation("Runtime"), "⚠️ Snapshot for {} dropped, runtime busy", key);
            return;
        };
        let entity = rt.entity;
        let provider = &mut rt.provider;
        let legend = with_chart(entity, |chart| {
            chart.apply_snapshot(key, points, provider);
            chart.latest_legend()
        });
        match legend {
            Some(legend) => {
                if rt.signals.tooltip.with_untracked(Option::is_none) {
                    rt.signals.legend.set(legend);
                }
            }
            None => {
                log_warn!(LogComponent::Presentation("Runtime"), "⚠️ Snapshot for {} dropped, registry busy", key);
            }
        }
    }

    pub fn apply_history_page(runtime: &SharedRuntime, key: &SeriesKey, points: &[RawPoint]) {
        let Ok(mut rt) = runtime.try_borrow_mut() else {
            log_warn!(LogComponent::Presentation("Runtime"), "⚠️ History page for {} dropped, runtime busy", key);
            return;
        };
        let entity = rt.entity;
        let provider = &mut rt.provider;
        with_chart(entity, |chart| chart.apply_history_page(key, points, provider));
    }

    pub fn set_scan_result(&self, scan: Option<ScanResult>) {
        with_chart(self.entity, |chart| chart.set_scan_result(scan.map(Arc::new)));
    }

    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        let provider = &mut self.provider;
        with_chart(self.entity, |chart| chart.set_markers(markers, provider));
    }

    pub fn set_dormant(runtime: &SharedRuntime, dormant: bool) {
        let entity = runtime.borrow().entity;
        if let Some(transition) = with_chart(entity, |chart| chart.set_dormant(dormant)) {
            Self::apply_transition(runtime, transition);
        }
    }

    pub fn set_tab_hidden(runtime: &SharedRuntime, hidden: bool) {
        let entity = runtime.borrow().entity;
        if let Some(transition) = with_chart(entity, |chart| chart.set_tab_hidden(hidden)) {
            Self::apply_transition(runtime, transition);
        }
    }

    pub fn set_intersecting(runtime: &SharedRuntime, intersecting: bool) {
        let entity = runtime.borrow().entity;
        if let Some(transition) = with_chart(entity, |chart| chart.set_intersecting(intersecting)) {
            Self::apply_transition(runtime, transition);
        }
    }

    pub fn history_load_finished(&self, key: &SeriesKey) {
        with_chart(self.entity, |chart| chart.history_load_finished(key, now_ms()));
    }

    pub fn export_snapshot(&self, is_automatic: bool) -> bool {
        let Some(surface) = self.surface.as_ref() else {
            log_warn!(LogComponent::Presentation("Runtime"), "⚠️ Snapshot requested before overlay mounted");
            return false;
        };
        let sink = JsSnapshotSink { callback: self.callbacks.on_snapshot.as_ref() };
        with_chart(self.entity, |chart| {
            chart.export_snapshot(&self.provider, surface, &self.encoder, &sink, is_automatic, now_ms())
        })
        .unwrap_or(false)
    }

    fn apply_transition(runtime: &SharedRuntime, transition: FrameTransition) {
        let rt = runtime.borrow();
        match transition {
            FrameTransition::Start => {
                if rt.surface.is_none() {
                    return;
                }
                let weak = Rc::downgrade(runtime);
                if let Err(e) = rt.frame_loop.start(move |_| Self::on_frame(&weak)) {
                    log_error!(LogComponent::Presentation("Runtime"), "❌ Frame loop failed to start: {}", e);
                }
            }
            FrameTransition::Stop => {
                rt.frame_loop.stop();
                rt.signals.tooltip.set(None);
            }
            FrameTransition::Unchanged => {}
        }
    }

    fn on_frame(weak: &Weak<RefCell<ChartRuntime>>) {
        let Some(runtime) = weak.upgrade() else {
            return;
        };
        let Ok(mut rt) = runtime.try_borrow_mut() else {
            return;
        };
        let rt = &mut *rt;
        let Some(surface) = rt.surface.as_mut() else {
            return;
        };
        let now = now_ms();
        let provider = &mut rt.provider;
        let flashing = with_chart(rt.entity, |chart| {
            chart.on_frame(now, provider, surface);
            chart.is_flashing(now)
        });
        if let Some(flashing) = flashing {
            if rt.signals.flashing.get_untracked() != flashing {
                rt.signals.flashing.set(flashing);
            }
        }
    }

    fn request_history(&self, request: HistoryRequest) {
        let Some(load_more) = self.callbacks.load_more.clone() else {
            log_debug!(LogComponent::Presentation("Runtime"), "No loadMore callback, history request dropped");
            return;
        };
        let entity = self.entity;
        spawn_local(async move {
            let result = load_more.call2(
                &JsValue::NULL,
                &JsValue::from_str(request.key.value()),
                &JsValue::from_f64(request.oldest.as_f64()),
            );
            match result {
                Ok(value) => {
                    if let Ok(promise) = value.dyn_into::<Promise>() {
                        if let Err(e) = JsFuture::from(promise).await {
                            log_warn!(LogComponent::Presentation("Runtime"), "⚠️ loadMore rejected: {:?}", e);
                        }
                    }
                }
                Err(e) => {
                    log_warn!(LogComponent::Presentation("Runtime"), "⚠️ loadMore threw {:?}", e);
                }
            }
            // released after the debounce whether or not a page arrived
            with_chart(entity, |chart| chart.history_load_finished(&request.key, now_ms()));
        });
    }

    fn on_range_changed(runtime: &SharedRuntime, value: JsValue) {
        let Ok(rt) = runtime.try_borrow() else {
            log_trace!(LogComponent::Presentation("Runtime"), "Range change during reconcile ignored");
            return;
        };
        let Ok(range) = from_js::<LogicalRange>(&value) else {
            return;
        };
        if let Some(request) = with_chart(rt.entity, |chart| chart.on_visible_range_changed(range)).flatten() {
            rt.request_history(request);
        }
    }

    fn on_crosshair(runtime: &SharedRuntime, value: JsValue) {
        let Ok(rt) = runtime.try_borrow() else {
            return;
        };
        let number = |object: &JsValue, field: &str| Reflect::get(object, &JsValue::from_str(field)).ok()?.as_f64();
        let point = Reflect::get(&value, &JsValue::from_str("point"))
            .ok()
            .filter(|p| p.is_object())
            .and_then(|p| Some((number(&p, "x")?, number(&p, "y")?)));
        let time = number(&value, "time").map(|t| Timestamp::new(t as i64));

        let update = with_chart(rt.entity, |chart| chart.on_crosshair_move(CrosshairEvent { point, time }));
        match update {
            Some(HoverUpdate::Show(payload)) => rt.signals.tooltip.set(Some(payload)),
            Some(HoverUpdate::Hide(legend)) => {
                rt.signals.tooltip.set(None);
                rt.signals.legend.set(legend);
            }
            Some(HoverUpdate::Unchanged) | None => {}
        }
    }

    fn on_click(runtime: &SharedRuntime, value: JsValue) {
        let Ok((entity, Some(callback))) = runtime.try_borrow().map(|rt| (rt.entity, rt.callbacks.on_click.clone()))
        else {
            return;
        };
        let Some(time) = Reflect::get(&value, &JsValue::from_str("time")).ok().and_then(|t| t.as_f64()) else {
            return;
        };
        let point = with_chart(entity, |chart| chart.on_click(Timestamp::new(time as i64))).flatten();
        if let Some(point) = point {
            let payload = serde_json::to_string(&point).ok().and_then(|json| JSON::parse(&json).ok());
            if let Some(payload) = payload {
                let _ = callback.call1(&JsValue::NULL, &payload);
            }
        }
    }

    /// Hooks the provider's crosshair, click and range notifications.
    pub fn subscribe(runtime: &SharedRuntime) -> AppResult<()> {
        type Handler = fn(&SharedRuntime, JsValue);
        let hooks: [(&str, Handler); 3] = [
            ("subscribeCrosshairMove", Self::on_crosshair as Handler),
            ("subscribeClick", Self::on_click as Handler),
            ("subscribeVisibleLogicalRangeChange", Self::on_range_changed as Handler),
        ];
        for (method, handler) in hooks {
            let weak = Rc::downgrade(runtime);
            let closure = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
                if let Some(runtime) = weak.upgrade() {
                    handler(&runtime, value);
                }
            });
            let mut rt = runtime.borrow_mut();
            match rt.provider.subscribe(method, &closure) {
                Ok(()) => rt.subscriptions.push(closure),
                Err(e) => {
                    log_warn!(LogComponent::Presentation("Runtime"), "⚠️ {} unavailable: {}", method, e);
                }
            }
        }
        Ok(())
    }

    /// Resize and visibility observers on the container element.
    pub fn observe(runtime: &SharedRuntime, container: &HtmlElement) -> AppResult<()> {
        let weak = Rc::downgrade(runtime);
        let on_resize = Closure::<dyn FnMut(Array)>::new(move |entries: Array| {
            let Some(runtime) = weak.upgrade() else {
                return;
            };
            let Some(entry) = entries.iter().last().and_then(|e| e.dyn_into::<ResizeObserverEntry>().ok()) else {
                return;
            };
            let rect = entry.content_rect();
            let entity = runtime.borrow().entity;
            with_chart(entity, |chart| chart.request_resize(rect.width(), rect.height()));
        });
        let resize = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
            .map_err(|e| AppError::BridgeError(format!("ResizeObserver: {:?}", e)))?;
        resize.observe(container);

        let weak = Rc::downgrade(runtime);
        let on_intersect = Closure::<dyn FnMut(Array)>::new(move |entries: Array| {
            let Some(runtime) = weak.upgrade() else {
                return;
            };
            if let Some(entry) = entries.iter().last().and_then(|e| e.dyn_into::<IntersectionObserverEntry>().ok()) {
                Self::set_intersecting(&runtime, entry.is_intersecting());
            }
        });
        let intersection = IntersectionObserver::new(on_intersect.as_ref().unchecked_ref())
            .map_err(|e| AppError::BridgeError(format!("IntersectionObserver: {:?}", e)))?;
        intersection.observe(container);

        let mut rt = runtime.borrow_mut();
        rt.observers.push((on_resize, ObserverHandle::Resize(resize)));
        rt.observers.push((on_intersect, ObserverHandle::Intersection(intersection)));
        Ok(())
    }

    /// Stops the loop, disconnects observers and unregisters the chart.
    pub fn teardown(&mut self) {
        self.frame_loop.stop();
        for (_, observer) in self.observers.drain(..) {
            match observer {
                ObserverHandle::Resize(o) => o.disconnect(),
                ObserverHandle::Intersection(o) => o.disconnect(),
            }
        }
        // the adapter may still hold these; leaked closures upgrade to nothing
        for closure in self.subscriptions.drain(..) {
            closure.forget();
        }
        if let Ok(mut world) = registry().lock() {
            world.despawn_chart(self.entity);
        }
        log_debug!(LogComponent::Presentation("Runtime"), "Chart runtime torn down");
    }
}
