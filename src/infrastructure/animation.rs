use crate::domain::errors::{AppError, AppResult};
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` loop with an explicit start/stop lifecycle.
///
/// The callback re-arms itself only while the loop is running; `stop`
/// cancels the pending request so a stopped loop costs nothing.
pub struct FrameLoop {
    running: Rc<Cell<bool>>,
    pending: Rc<Cell<Option<i32>>>,
    callback: FrameCallback,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

fn request_frame(callback: &FrameCallback) -> AppResult<i32> {
    let window = web_sys::window().ok_or_else(|| AppError::BridgeError("Window not available".to_string()))?;
    let slot = callback.borrow();
    let closure = slot.as_ref().ok_or_else(|| AppError::BridgeError("frame callback missing".to_string()))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|e| AppError::BridgeError(format!("requestAnimationFrame: {:?}", e)))
}

impl FrameLoop {
    pub fn new() -> Self {
        Self { running: Rc::new(Cell::new(false)), pending: Rc::new(Cell::new(None)), callback: Rc::default() }
    }

    /// Starts calling `on_frame` every animation frame. No-op when running.
    pub fn start(&self, mut on_frame: impl FnMut(f64) + 'static) -> AppResult<()> {
        if self.running.get() {
            return Ok(());
        }

        let running = self.running.clone();
        let pending = self.pending.clone();
        let rearm = self.callback.clone();
        *self.callback.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            pending.set(None);
            if !running.get() {
                return;
            }
            on_frame(timestamp);
            if !running.get() {
                return;
            }
            match request_frame(&rearm) {
                Ok(handle) => pending.set(Some(handle)),
                Err(e) => {
                    running.set(false);
                    log_warn!(LogComponent::Infrastructure("FrameLoop"), "⚠️ Frame loop halted: {}", e);
                }
            }
        }) as Box<dyn FnMut(f64)>));

        self.running.set(true);
        match request_frame(&self.callback) {
            Ok(handle) => {
                self.pending.set(Some(handle));
                log_debug!(LogComponent::Infrastructure("FrameLoop"), "Frame loop started");
                Ok(())
            }
            Err(e) => {
                self.running.set(false);
                Err(e)
            }
        }
    }

    pub fn stop(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let (Some(handle), Some(window)) = (self.pending.take(), web_sys::window()) {
            let _ = window.cancel_animation_frame(handle);
        }
        log_debug!(LogComponent::Infrastructure("FrameLoop"), "Frame loop stopped");
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        // the closure holds a handle to its own slot
        self.callback.borrow_mut().take();
    }
}
