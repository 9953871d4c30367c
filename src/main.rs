#[cfg(not(target_arch = "wasm32"))]
mod native {
    use fermat::config::FermatConfig;
    use fermat::controller::SimulationController;
    use fermat::fps_estimator::FpsEstimator;
    use fermat::gpu::{GpuContext, SurfaceTarget};
    use fermat::gpu_backend::GpuBackend;
    use fermat::FermatError;
    use log::{error, info, warn};
    use winit::{
        event::{self, ElementState, KeyboardInput, VirtualKeyCode, WindowEvent},
        event_loop::{ControlFlow, EventLoop},
    };

    gflags::define! {
        --config: &str = "fermat_config.toml"
    }
    gflags::define! {
        --log_filter: &str = "warn,fermat=info"
    }
    gflags::define! {
        /// Overrides the configured particle count when non-zero.
        --particle_count: u32 = 0
    }
    gflags::define! {
        -h, --help = false
    }

    const LENS_STEP: f32 = 0.05;

    type Controller = SimulationController<GpuBackend<SurfaceTarget>>;

    fn read_config_from_file(path: &str) -> anyhow::Result<FermatConfig> {
        let config = std::fs::read_to_string(path)?.parse()?;
        Ok(config)
    }

    fn get_config() -> FermatConfig {
        match read_config_from_file(CONFIG.flag) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to parse config file({}): {:?}", CONFIG.flag, e);
                fermat::config::get_config_from_default_file()
            }
        }
    }

    // Source and sink circle each other when nobody is steering.
    fn drift_source(time: f32) -> [f32; 3] {
        [time.sin() * 0.6, (1.3 * time).cos() * 0.6, 0.0]
    }

    struct Steering {
        drifting: bool,
        time: f32,
        cursor: Option<[f32; 2]>,
    }

    impl Steering {
        fn apply(&mut self, controller: &mut Controller, dt: f32) -> fermat::Result<()> {
            if self.drifting {
                self.time += dt;
                let [x, y, z] = drift_source(self.time);
                controller.set_source(x, y, z)?;
                controller.set_sink(-x, -y, -z)?;
            } else if let Some([x, y]) = self.cursor {
                controller.set_source(x, y, 0.0)?;
            }
            Ok(())
        }
    }

    fn handle_key(
        key: VirtualKeyCode,
        controller: &mut Controller,
        steering: &mut Steering,
        control_flow: &mut ControlFlow,
    ) -> fermat::Result<()> {
        let lens_radius = controller.parameters().lens_radius;
        match key {
            VirtualKeyCode::Q | VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
            VirtualKeyCode::M => {
                steering.drifting = !steering.drifting;
                info!("Drift {}", if steering.drifting { "on" } else { "off" });
            }
            VirtualKeyCode::R => controller.reset(),
            VirtualKeyCode::Equals | VirtualKeyCode::Plus | VirtualKeyCode::NumpadAdd => {
                controller.set_lens_radius(lens_radius + LENS_STEP)?;
            }
            VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => {
                controller.set_lens_radius((lens_radius - LENS_STEP).max(0.0))?;
            }
            _ => (),
        }
        Ok(())
    }

    pub fn run() -> anyhow::Result<()> {
        gflags::parse();
        if HELP.flag {
            gflags::print_help_and_exit(0);
        }
        scrub_log::init_with_filter_string(LOG_FILTER.flag)
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {:?}", e))?;

        let config = get_config();
        let particle_count = if PARTICLE_COUNT.flag > 0 {
            PARTICLE_COUNT.flag
        } else {
            config.particle_count
        };

        let event_loop = EventLoop::new();
        info!("Initializing the window...");
        let window = winit::window::WindowBuilder::new()
            .with_title("Fermat")
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window_width,
                config.window_height,
            ))
            .build(&event_loop)?;
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(&window) };
        let (adapter, context) =
            futures::executor::block_on(GpuContext::request(&instance, Some(&surface)))?;
        let target = SurfaceTarget::new(context.clone(), &adapter, surface, size.width, size.height)?;
        let mut controller: Controller =
            SimulationController::new(context, target, particle_count as i64, &config)?;
        let mut fps = FpsEstimator::new(config.fps, config.max_frame_dt);
        let mut steering = Steering {
            drifting: true,
            time: 0.0,
            cursor: None,
        };
        let view_extent = config.render.view_extent;

        info!("Entering render loop...");
        event_loop.run(move |event, _, control_flow| {
            *control_flow = ControlFlow::Poll;
            match event {
                event::Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                    WindowEvent::Resized(size) => {
                        controller
                            .backend_mut()
                            .target_mut()
                            .resize(size.width, size.height);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let size = window.inner_size();
                        steering.cursor = Some(fermat::view::screen_to_world(
                            view_extent,
                            (size.width, size.height),
                            (position.x, position.y),
                        ));
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                virtual_keycode: Some(key),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => {
                        if let Err(e) = handle_key(key, &mut controller, &mut steering, control_flow) {
                            error!("{}", e);
                        }
                    }
                    _ => (),
                },
                event::Event::MainEventsCleared => window.request_redraw(),
                event::Event::RedrawRequested(_) => {
                    let dt = fps.tick();
                    let stepped = steering
                        .apply(&mut controller, dt)
                        .and_then(|_| controller.step(dt));
                    if let Err(e) = stepped {
                        error!("{}", e);
                    }
                    match controller.render() {
                        Ok(stats) => log::trace!("Drew {} points in a {}s frame", stats.points, dt),
                        Err(FermatError::Surface(reason)) => warn!("Skipping frame: {}", reason),
                        Err(e) => {
                            error!("{}", e);
                            *control_flow = ControlFlow::Exit;
                        }
                    }
                }
                _ => (),
            }
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn drift_keeps_the_source_in_view() {
            for i in 0..100 {
                let [x, y, z] = drift_source(i as f32 * 0.37);
                assert!(x.abs() <= 0.6 && y.abs() <= 0.6);
                assert_eq!(z, 0.0);
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

// The browser drives the engine through `fermat::web`.
#[cfg(target_arch = "wasm32")]
fn main() {}
