//! `CoordinateProvider` backed by a JavaScript chart adapter object.
//!
//! The adapter exposes camelCase methods (`setData`, `timeToCoordinate`,
//! `getVisibleLogicalRange`, ...). Bridge failures are logged and turned into
//! "not representable" answers so the frame loop never sees a JS exception.

use crate::domain::chart::{
    CoordinateProvider, LogicalRange, PixelBuffer, ProviderCapabilities, SessionBandPoint, SurfaceSize,
};
use crate::domain::errors::{AppError, AppResult};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Marker, TimePoint, Timestamp};
use crate::log_warn;
use js_sys::{Function, JSON, Object, Reflect, Uint8ClampedArray};
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

pub struct JsCoordinateProvider {
    adapter: Object,
}

impl JsCoordinateProvider {
    pub fn new(adapter: JsValue) -> AppResult<Self> {
        let adapter = adapter
            .dyn_into::<Object>()
            .map_err(|_| AppError::BridgeError("chart adapter must be an object".to_string()))?;
        Ok(Self { adapter })
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.adapter, &JsValue::from_str(name)).ok()?.dyn_into::<Function>().ok()
    }

    fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    fn call(&self, name: &str, args: &[JsValue]) -> AppResult<JsValue> {
        let function = self.method(name).ok_or_else(|| AppError::BridgeError(format!("adapter has no {}()", name)))?;
        let result = match args {
            [] => function.call0(&self.adapter),
            [a] => function.call1(&self.adapter, a),
            [a, b, ..] => function.call2(&self.adapter, a, b),
        };
        result.map_err(|e| AppError::BridgeError(format!("{}() threw {:?}", name, e)))
    }

    /// Fire-and-forget call; failures only reach the log.
    fn invoke(&self, name: &str, args: &[JsValue]) {
        if let Err(e) = self.call(name, args) {
            log_warn!(LogComponent::Infrastructure("JsProvider"), "⚠️ {}", e);
        }
    }

    fn to_js<T: Serialize + ?Sized>(value: &T) -> AppResult<JsValue> {
        let json = serde_json::to_string(value)?;
        JSON::parse(&json).map_err(|e| AppError::BridgeError(format!("JSON.parse failed: {:?}", e)))
    }

    fn invoke_with<T: Serialize + ?Sized>(&self, name: &str, value: &T) {
        match Self::to_js(value) {
            Ok(arg) => self.invoke(name, &[arg]),
            Err(e) => {
                log_warn!(LogComponent::Infrastructure("JsProvider"), "⚠️ {} payload: {}", name, e);
            }
        }
    }

    fn number_field(value: &JsValue, field: &str) -> Option<f64> {
        Reflect::get(value, &JsValue::from_str(field)).ok()?.as_f64()
    }

    fn coordinate(&self, name: &str, arg: f64) -> Option<f64> {
        let value = self.call(name, &[JsValue::from_f64(arg)]).ok()?;
        value.as_f64().filter(|v| v.is_finite())
    }

    /// Registers `callback` through one of the adapter's `subscribe*` methods.
    pub fn subscribe<T: ?Sized>(&self, name: &str, callback: &Closure<T>) -> AppResult<()> {
        self.call(name, &[callback.as_ref().clone()]).map(|_| ())
    }
}

impl CoordinateProvider for JsCoordinateProvider {
    fn set_data(&mut self, points: &[TimePoint]) {
        self.invoke_with("setData", points);
    }

    fn set_session_band(&mut self, band: &[SessionBandPoint]) {
        self.invoke_with("setSessionBand", band);
    }

    fn time_to_coordinate(&self, time: Timestamp) -> Option<f64> {
        self.coordinate("timeToCoordinate", time.as_f64())
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        self.coordinate("priceToCoordinate", price)
    }

    fn visible_logical_range(&self) -> Option<LogicalRange> {
        let range = self.call("getVisibleLogicalRange", &[]).ok()?;
        Some(LogicalRange::new(Self::number_field(&range, "from")?, Self::number_field(&range, "to")?))
    }

    fn set_visible_logical_range(&mut self, range: LogicalRange) {
        self.invoke_with("setVisibleLogicalRange", &range);
    }

    fn visible_time_range(&self) -> Option<(Timestamp, Timestamp)> {
        let range = self.call("getVisibleTimeRange", &[]).ok()?;
        let from = Self::number_field(&range, "from")?;
        let to = Self::number_field(&range, "to")?;
        Some((Timestamp::new(from as i64), Timestamp::new(to as i64)))
    }

    fn scroll_to_live(&mut self) {
        self.invoke("scrollToLive", &[]);
    }

    fn fit_content(&mut self) {
        self.invoke("fitContent", &[]);
    }

    fn set_auto_scale(&mut self, enabled: bool) {
        self.invoke("setAutoScale", &[JsValue::from_bool(enabled)]);
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.invoke("resize", &[JsValue::from_f64(size.width), JsValue::from_f64(size.height)]);
    }

    fn clear_price_lines(&mut self) {
        if self.has_method("clearPriceLines") {
            self.invoke("clearPriceLines", &[]);
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { markers: self.has_method("setMarkers"), screenshot: self.has_method("takeScreenshot") }
    }

    fn set_markers(&mut self, markers: &[Marker]) {
        self.invoke_with("setMarkers", markers);
    }

    fn take_screenshot(&self) -> Option<PixelBuffer> {
        let shot = self.call("takeScreenshot", &[]).ok()?;
        let width = Self::number_field(&shot, "width")? as u32;
        let height = Self::number_field(&shot, "height")? as u32;
        let data = Reflect::get(&shot, &JsValue::from_str("data")).ok()?.dyn_into::<Uint8ClampedArray>().ok()?;
        let buffer = PixelBuffer { width, height, rgba: data.to_vec() };
        buffer.is_consistent().then_some(buffer)
    }
}
