use gloo::events::EventListener;
use gloo_timers::callback::Interval;
use leptos::{SignalGetUntracked, SignalSet, mount_to, view};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::app::ChartOverlay;
use crate::application::{ChartInstance, EngineConfig};
use crate::domain::chart::{CoordinateProvider, ScanResult};
use crate::domain::errors::AppError;
use crate::domain::logging::{LogComponent, LogLevel, get_logger, get_time_provider, set_min_level};
use crate::domain::market_data::{Marker, RawPoint, SeriesKey, SeriesKind};
use crate::ecs::components::ScanComponent;
use crate::global_state::{active_charts, registry, tab_hidden};
use crate::infrastructure::JsCoordinateProvider;
use crate::presentation::runtime::{ChartRuntime, OverlaySignals, RuntimeCallbacks, SharedRuntime, from_js};
use crate::{log_debug, log_info, log_warn};

/// How often dormant charts still get their debounce timers polled.
const TICK_INTERVAL_MS: u32 = 250;

thread_local! {
    static MOUNTED: RefCell<Vec<Weak<RefCell<ChartRuntime>>>> = const { RefCell::new(Vec::new()) };
    static TICKER: RefCell<Option<(Interval, EventListener)>> = const { RefCell::new(None) };
}

fn to_js_error(err: AppError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn is_absent(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

/// Registry tick plus tab visibility, installed with the first mount.
fn ensure_dashboard_ticker() {
    TICKER.with(|ticker| {
        if ticker.borrow().is_some() {
            return;
        }
        let interval = Interval::new(TICK_INTERVAL_MS, || {
            let now = get_time_provider().current_timestamp();
            if let Ok(mut world) = registry().try_lock() {
                let active = world.tick(now).len();
                if active_charts().get_untracked() != active {
                    active_charts().set(active);
                }
            }
        });
        let document = gloo::utils::document();
        let visibility = EventListener::new(&document, "visibilitychange", move |_| {
            let hidden = gloo::utils::document().hidden();
            tab_hidden().set(hidden);
            MOUNTED.with(|mounted| {
                mounted.borrow_mut().retain(|weak| weak.strong_count() > 0);
                for runtime in mounted.borrow().iter().filter_map(Weak::upgrade) {
                    ChartRuntime::set_tab_hidden(&runtime, hidden);
                }
            });
        });
        *ticker.borrow_mut() = Some((interval, visibility));
    });
}

/// Hands `scan` to every mounted chart currently showing `key`. Applied on
/// the next registry tick.
#[wasm_bindgen(js_name = publishScan)]
pub fn publish_scan(key: String, scan: JsValue) -> Result<(), JsValue> {
    let key = SeriesKey::new(key).map_err(JsValue::from)?;
    let scan: ScanResult = from_js(&scan).map_err(to_js_error)?;
    let zones = scan.zones.len();
    registry()
        .lock()
        .map_err(|_| to_js_error(AppError::BridgeError("chart registry poisoned".to_string())))?
        .publish_scan(ScanComponent { key: key.clone(), scan: Arc::new(scan) });
    log_debug!(LogComponent::Presentation("WasmApi"), "Scan for {} queued ({} zones)", key, zones);
    Ok(())
}

/// Charts rendering right now, as of the last registry tick.
#[wasm_bindgen(js_name = activeChartCount)]
pub fn active_chart_count() -> usize {
    active_charts().get_untracked()
}

/// JS handle to one mounted chart overlay.
#[wasm_bindgen]
pub struct ChartOverlayHandle {
    runtime: SharedRuntime,
}

/// Mounts the overlay into `container` and binds it to the chart `adapter`.
///
/// `options` is an optional `EngineConfig` object; `callbacks` may carry
/// `loadMore`, `onSnapshot` and `onClick`.
#[wasm_bindgen(js_name = mountChartOverlay)]
pub fn mount_chart_overlay(
    container: HtmlElement,
    chart_id: String,
    kind: String,
    adapter: JsValue,
    options: JsValue,
    callbacks: JsValue,
) -> Result<ChartOverlayHandle, JsValue> {
    let config = if is_absent(&options) {
        EngineConfig::default()
    } else {
        from_js::<EngineConfig>(&options).map_err(to_js_error)?
    };
    config.validate().map_err(to_js_error)?;
    set_min_level(config.level().map_err(to_js_error)?);

    let kind: SeriesKind = kind
        .parse()
        .map_err(|_| to_js_error(AppError::ConfigError(format!("unknown series kind '{}'", kind))))?;
    let provider = JsCoordinateProvider::new(adapter).map_err(to_js_error)?;
    let chart = ChartInstance::new(chart_id.clone(), kind, &config, provider.capabilities()).map_err(to_js_error)?;

    let entity = registry()
        .lock()
        .map_err(|_| to_js_error(AppError::BridgeError("chart registry poisoned".to_string())))?
        .spawn_chart(chart);

    let signals = OverlaySignals::new();
    let runtime = ChartRuntime::new(entity, provider, signals, RuntimeCallbacks::from_js(&callbacks));
    ChartRuntime::subscribe(&runtime).map_err(to_js_error)?;
    ChartRuntime::observe(&runtime, &container).map_err(to_js_error)?;
    if tab_hidden().get_untracked() {
        ChartRuntime::set_tab_hidden(&runtime, true);
    }

    let for_canvas = Rc::downgrade(&runtime);
    mount_to(container, move || {
        view! {
            <ChartOverlay
                signals=signals
                on_canvas=move |canvas: web_sys::HtmlCanvasElement| {
                    if let Some(runtime) = for_canvas.upgrade() {
                        ChartRuntime::attach_surface(&runtime, canvas);
                    }
                }
            />
        }
    });

    MOUNTED.with(|mounted| mounted.borrow_mut().push(Rc::downgrade(&runtime)));
    ensure_dashboard_ticker();

    get_logger().log_with_metadata(
        LogLevel::Info,
        LogComponent::Presentation("WasmApi"),
        &format!("✅ Chart overlay '{}' mounted ({})", chart_id, kind),
        &serde_json::to_string(&config).unwrap_or_default(),
    );
    Ok(ChartOverlayHandle { runtime })
}

#[wasm_bindgen]
impl ChartOverlayHandle {
    /// Full series snapshot for `key`.
    #[wasm_bindgen(js_name = setData)]
    pub fn set_data(&self, key: String, points: JsValue) -> Result<(), JsValue> {
        let key = SeriesKey::new(key).map_err(JsValue::from)?;
        let points: Vec<RawPoint> = from_js(&points).map_err(to_js_error)?;
        ChartRuntime::apply_snapshot(&self.runtime, &key, &points);
        Ok(())
    }

    /// Snapshot produced by a `loadMore` call; dropped when `key` is stale.
    #[wasm_bindgen(js_name = applyHistoryPage)]
    pub fn apply_history_page(&self, key: String, points: JsValue) -> Result<(), JsValue> {
        let key = SeriesKey::new(key).map_err(JsValue::from)?;
        let points: Vec<RawPoint> = from_js(&points).map_err(to_js_error)?;
        ChartRuntime::apply_history_page(&self.runtime, &key, &points);
        Ok(())
    }

    #[wasm_bindgen(js_name = setScanResult)]
    pub fn set_scan_result(&self, scan: JsValue) -> Result<(), JsValue> {
        let scan = if is_absent(&scan) { None } else { Some(from_js::<ScanResult>(&scan).map_err(to_js_error)?) };
        self.runtime.borrow().set_scan_result(scan);
        Ok(())
    }

    #[wasm_bindgen(js_name = setMarkers)]
    pub fn set_markers(&self, markers: JsValue) -> Result<(), JsValue> {
        let markers: Vec<Marker> =
            if is_absent(&markers) { Vec::new() } else { from_js(&markers).map_err(to_js_error)? };
        match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.set_markers(markers),
            Err(_) => {
                log_warn!(LogComponent::Presentation("WasmApi"), "⚠️ setMarkers re-entered, ignored");
            }
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = setDormant)]
    pub fn set_dormant(&self, dormant: bool) {
        ChartRuntime::set_dormant(&self.runtime, dormant);
    }

    #[wasm_bindgen(js_name = historyLoadFinished)]
    pub fn history_load_finished(&self, key: String) {
        self.runtime.borrow().history_load_finished(&SeriesKey::from(key.as_str()));
    }

    /// Captures chart plus overlay and hands it to `onSnapshot`.
    #[wasm_bindgen(js_name = exportSnapshot)]
    pub fn export_snapshot(&self, is_automatic: bool) -> bool {
        match self.runtime.try_borrow() {
            Ok(runtime) => runtime.export_snapshot(is_automatic),
            Err(_) => false,
        }
    }

    pub fn destroy(&self) {
        match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => {
                runtime.teardown();
                log_info!(LogComponent::Presentation("WasmApi"), "Chart overlay destroyed");
            }
            Err(_) => {
                log_warn!(LogComponent::Presentation("WasmApi"), "⚠️ destroy() called from inside a chart callback");
            }
        }
    }
}
