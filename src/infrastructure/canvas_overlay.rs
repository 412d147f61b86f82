use crate::application::ImageEncoder;
use crate::domain::chart::{DrawCommand, OverlaySurface, PixelBuffer, SurfaceSize};
use crate::domain::errors::{AppError, AppResult, RenderingResult};
use crate::domain::logging::LogComponent;
use crate::log_debug;
use js_sys::Array;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

const LABEL_FONT: &str = "11px sans-serif";

fn js_err(context: &str, err: JsValue) -> AppError {
    AppError::RenderingError(format!("{}: {:?}", context, err))
}

fn context_2d(canvas: &HtmlCanvasElement) -> RenderingResult<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .map_err(|e| js_err("Failed to get 2D context", e))?
        .ok_or_else(|| AppError::RenderingError("2D context unavailable".to_string()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| AppError::RenderingError("Failed to cast to 2D context".to_string()))
}

/// Transparent canvas stacked on top of the chart widget.
pub struct CanvasOverlaySurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    size: SurfaceSize,
}

impl CanvasOverlaySurface {
    pub fn new(canvas: HtmlCanvasElement) -> RenderingResult<Self> {
        let ctx = context_2d(&canvas)?;
        let size = SurfaceSize::new(canvas.width() as f64, canvas.height() as f64);
        Ok(Self { canvas, ctx, size })
    }

    fn set_dash(&self, dashed: bool) -> RenderingResult<()> {
        let pattern = Array::new();
        if dashed {
            pattern.push(&JsValue::from_f64(6.0));
            pattern.push(&JsValue::from_f64(4.0));
        }
        self.ctx.set_line_dash(&pattern).map_err(|e| js_err("setLineDash", e))
    }

    fn draw(&self, command: &DrawCommand) -> RenderingResult<()> {
        let ctx = &self.ctx;
        match command {
            DrawCommand::Clear => ctx.clear_rect(0.0, 0.0, self.size.width, self.size.height),
            DrawCommand::FillRect { rect, color } => {
                ctx.set_fill_style_str(color);
                ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
            }
            DrawCommand::StrokeRect { rect, color, width } => {
                self.set_dash(false)?;
                ctx.set_stroke_style_str(color);
                ctx.set_line_width(*width);
                ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
            }
            DrawCommand::Line { from, to, color, width, dashed } => {
                self.set_dash(*dashed)?;
                ctx.set_stroke_style_str(color);
                ctx.set_line_width(*width);
                ctx.begin_path();
                ctx.move_to(from.0, from.1);
                ctx.line_to(to.0, to.1);
                ctx.stroke();
            }
            DrawCommand::Text { text, at, color } => {
                ctx.set_font(LABEL_FONT);
                ctx.set_fill_style_str(color);
                ctx.fill_text(text, at.0, at.1).map_err(|e| js_err("fillText", e))?;
            }
        }
        Ok(())
    }
}

impl OverlaySurface for CanvasOverlaySurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.canvas.set_width(size.width.max(0.0) as u32);
        self.canvas.set_height(size.height.max(0.0) as u32);
        self.size = size;
        log_debug!(
            LogComponent::Infrastructure("CanvasOverlay"),
            "Overlay resized to {}x{}",
            size.width,
            size.height
        );
    }

    fn execute(&mut self, frame: &[DrawCommand]) -> AppResult<()> {
        for command in frame {
            self.draw(command)?;
        }
        Ok(())
    }

    fn pixels(&self) -> Option<PixelBuffer> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        if width == 0 || height == 0 {
            return None;
        }
        let data = self.ctx.get_image_data(0.0, 0.0, width as f64, height as f64).ok()?;
        Some(PixelBuffer { width, height, rgba: data.data().0 })
    }
}

/// PNG data URL via a scratch canvas.
#[derive(Default)]
pub struct CanvasPngEncoder;

impl ImageEncoder for CanvasPngEncoder {
    fn encode(&self, image: &PixelBuffer) -> AppResult<String> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| AppError::ExportError("Document not available".to_string()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| js_err("createElement", e))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| AppError::ExportError("scratch element is not a canvas".to_string()))?;
        canvas.set_width(image.width);
        canvas.set_height(image.height);

        let ctx = context_2d(&canvas)?;
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(image.rgba.as_slice()), image.width, image.height)
            .map_err(|e| js_err("ImageData", e))?;
        ctx.put_image_data(&data, 0.0, 0.0).map_err(|e| js_err("putImageData", e))?;

        canvas.to_data_url_with_type("image/png").map_err(|e| AppError::ExportError(format!("{:?}", e)))
    }
}
