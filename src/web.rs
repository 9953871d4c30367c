use crate::controller::SimulationController;
use crate::error::FermatError;
use crate::gpu::{GpuContext, SurfaceTarget};
use crate::gpu_backend::GpuBackend;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use web_sys::{window, HtmlCanvasElement};

type SharedSurface = Rc<RefCell<SurfaceTarget>>;

struct Canvas {
    context: Arc<GpuContext>,
    target: SharedSurface,
}

thread_local! {
    static CANVAS: RefCell<Option<Canvas>> = RefCell::new(None);
}

fn to_js(error: FermatError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(js_name = attachCanvas)]
pub async fn attach_canvas(canvas_id: String) -> Result<(), JsValue> {
    let window = window().ok_or_else(|| JsValue::from_str("No window object"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(&canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("Canvas '{}' not found", canvas_id)))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Element is not a canvas"))?;

    let instance = wgpu::Instance::new(wgpu::Backends::BROWSER_WEBGPU);
    #[allow(unused_unsafe)]
    let surface = unsafe { instance.create_surface_from_canvas(&canvas) };
    let (adapter, context) = GpuContext::request(&instance, Some(&surface))
        .await
        .map_err(to_js)?;
    let target = SurfaceTarget::new(
        context.clone(),
        &adapter,
        surface,
        canvas.width(),
        canvas.height(),
    )
    .map_err(to_js)?;

    CANVAS.with(|cell| {
        *cell.borrow_mut() = Some(Canvas {
            context,
            target: Rc::new(RefCell::new(target)),
        })
    });
    Ok(())
}

#[wasm_bindgen]
pub struct FermatEngine {
    controller: SimulationController<GpuBackend<SharedSurface>>,
}

#[wasm_bindgen]
impl FermatEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(particle_count: f64) -> Result<FermatEngine, JsValue> {
        if !particle_count.is_finite() || particle_count.fract() != 0.0 {
            return Err(to_js(FermatError::InvalidParticleCount(particle_count as i64)));
        }
        let (context, target) = CANVAS.with(|cell| {
            cell.borrow()
                .as_ref()
                .map(|canvas| (canvas.context.clone(), canvas.target.clone()))
        })
        .ok_or_else(|| JsValue::from_str("attachCanvas must complete before new FermatEngine"))?;

        let config = crate::config::get_config_from_default_file();
        let controller =
            SimulationController::new(context, target, particle_count as i64, &config).map_err(to_js)?;
        Ok(FermatEngine { controller })
    }

    pub fn step(&mut self, delta_time_seconds: f32) -> Result<(), JsValue> {
        self.controller.step(delta_time_seconds).map_err(to_js)
    }

    // Returns the number of points drawn; zero when the canvas had no frame.
    pub fn render(&mut self) -> Result<u32, JsValue> {
        match self.controller.render() {
            Ok(stats) => Ok(stats.points),
            Err(FermatError::Surface(reason)) => {
                log::warn!("Skipping frame: {}", reason);
                Ok(0)
            }
            Err(e) => Err(to_js(e)),
        }
    }

    #[wasm_bindgen(js_name = setSource)]
    pub fn set_source(&mut self, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.controller.set_source(x, y, z).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setSink)]
    pub fn set_sink(&mut self, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.controller.set_sink(x, y, z).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLensRadius)]
    pub fn set_lens_radius(&mut self, radius: f32) -> Result<(), JsValue> {
        self.controller.set_lens_radius(radius).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setFlowSpeed)]
    pub fn set_flow_speed(&mut self, speed: f32) -> Result<(), JsValue> {
        self.controller.set_flow_speed(speed).map_err(to_js)
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    #[wasm_bindgen(js_name = particleCount)]
    pub fn particle_count(&self) -> u32 {
        self.controller.particle_count()
    }

    // The canvas is shared, so this resizes it for every engine.
    #[wasm_bindgen(js_name = resizeCanvas)]
    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        self.controller
            .backend_mut()
            .target_mut()
            .borrow_mut()
            .resize(width, height);
    }
}
