pub mod runtime;
pub mod wasm_api;

pub use wasm_api::{ChartOverlayHandle, active_chart_count, mount_chart_overlay, publish_scan};
