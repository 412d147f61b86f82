#![cfg(feature = "render")]

use price_chart_sync::domain::chart::{DrawCommand, OverlaySurface, PixelRect, SurfaceSize};
use price_chart_sync::infrastructure::CanvasOverlaySurface;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::HtmlCanvasElement;

wasm_bindgen_test_configure!(run_in_browser);

fn canvas() -> HtmlCanvasElement {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.create_element("canvas").ok())
        .and_then(|e| e.dyn_into::<HtmlCanvasElement>().ok())
        .expect("canvas element")
}

#[wasm_bindgen_test]
fn fill_rect_lands_in_pixels() {
    let mut surface = CanvasOverlaySurface::new(canvas()).expect("2d context");
    surface.resize(SurfaceSize::new(4.0, 4.0));
    surface
        .execute(&[
            DrawCommand::Clear,
            DrawCommand::FillRect {
                rect: PixelRect { x: 0.0, y: 0.0, width: 2.0, height: 2.0 },
                color: "rgba(255, 0, 0, 1)".to_string(),
            },
        ])
        .unwrap();

    let pixels = surface.pixels().expect("pixels");
    assert_eq!(pixels.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(pixels.pixel(3, 3), Some([0, 0, 0, 0]));
}

#[wasm_bindgen_test]
fn clear_wipes_previous_frame() {
    let mut surface = CanvasOverlaySurface::new(canvas()).expect("2d context");
    surface.resize(SurfaceSize::new(2.0, 2.0));
    surface
        .execute(&[DrawCommand::FillRect {
            rect: PixelRect { x: 0.0, y: 0.0, width: 2.0, height: 2.0 },
            color: "#00ff00".to_string(),
        }])
        .unwrap();
    surface.execute(&[DrawCommand::Clear]).unwrap();
    assert_eq!(surface.pixels().expect("pixels").pixel(1, 1), Some([0, 0, 0, 0]));
}
