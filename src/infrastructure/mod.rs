pub mod animation;
pub mod canvas_overlay;
pub mod js_provider;
pub mod services;

pub use animation::FrameLoop;
pub use canvas_overlay::{CanvasOverlaySurface, CanvasPngEncoder};
pub use js_provider::JsCoordinateProvider;
pub use services::{BrowserTimeProvider, ConsoleLogger};
