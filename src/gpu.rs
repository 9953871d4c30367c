use crate::error::{FermatError, Result};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn request(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface>,
    ) -> Result<(wgpu::Adapter, Arc<GpuContext>)> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface,
            })
            .await
            .ok_or(FermatError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Fermat device"),
                    features: wgpu::Features::empty(),
                    limits: adapter.limits(),
                },
                None,
            )
            .await
            .map_err(|e| FermatError::DeviceRequest(e.to_string()))?;
        Ok((adapter, Arc::new(GpuContext { device, queue })))
    }

    // Context without a presentation surface, for offscreen rendering.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn headless() -> Result<Arc<GpuContext>> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        let (_adapter, context) = futures::executor::block_on(GpuContext::request(&instance, None))?;
        Ok(context)
    }
}

pub struct TargetFrame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl TargetFrame {
    pub fn present(self) {
        if let Some(surface_texture) = self.surface_texture {
            surface_texture.present();
        }
    }
}

pub trait RenderTarget {
    fn format(&self) -> wgpu::TextureFormat;
    fn size(&self) -> (u32, u32);
    fn acquire(&mut self) -> Result<TargetFrame>;

    fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.size();
        width.max(1) as f32 / height.max(1) as f32
    }
}

// Lets several controllers created over time share one canvas.
impl<T: RenderTarget> RenderTarget for Rc<RefCell<T>> {
    fn format(&self) -> wgpu::TextureFormat {
        self.borrow().format()
    }
    fn size(&self) -> (u32, u32) {
        self.borrow().size()
    }
    fn acquire(&mut self) -> Result<TargetFrame> {
        self.borrow_mut().acquire()
    }
}

pub struct SurfaceTarget {
    context: Arc<GpuContext>,
    surface: wgpu::Surface,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    pub fn new(
        context: Arc<GpuContext>,
        adapter: &wgpu::Adapter,
        surface: wgpu::Surface,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let format = surface
            .get_preferred_format(adapter)
            .ok_or_else(|| FermatError::Surface("surface is incompatible with the adapter".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&context.device, &config);
        log::info!("Configured surface {}x{} ({:?})", config.width, config.height, format);
        Ok(SurfaceTarget {
            context,
            surface,
            config,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        log::info!("Resizing surface to ({}, {})", width, height);
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.context.device, &self.config);
    }
}

impl RenderTarget for SurfaceTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn acquire(&mut self) -> Result<TargetFrame> {
        match self.surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(TargetFrame {
                    view,
                    surface_texture: Some(surface_texture),
                })
            }
            Err(e) => {
                // Lost and outdated surfaces are usable again after reconfiguring;
                // the caller skips this frame either way.
                if matches!(e, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.surface.configure(&self.context.device, &self.config);
                }
                Err(FermatError::Surface(e.to_string()))
            }
        }
    }
}

pub struct TextureTarget {
    pub texture: wgpu::Texture,
    format: wgpu::TextureFormat,
    size: (u32, u32),
}

impl TextureTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(context: &GpuContext, width: u32, height: u32) -> Self {
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureTarget::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        });
        TextureTarget {
            texture,
            format: TextureTarget::FORMAT,
            size: (width, height),
        }
    }
}

impl RenderTarget for TextureTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn acquire(&mut self) -> Result<TargetFrame> {
        Ok(TargetFrame {
            view: self
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            surface_texture: None,
        })
    }
}
