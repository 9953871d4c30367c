use crate::backend::{DrawStats, ParticleBackend};
use crate::compute_stage::ComputeStage;
use crate::config::RenderParams;
use crate::error::Result;
use crate::gpu::{GpuContext, RenderTarget};
use crate::particle::{FlowUniforms, Particle, ParticleCount};
use crate::particle_buffer::ParticleBuffer;
use crate::render_stage::RenderStage;
use std::sync::Arc;

pub struct GpuBackend<T> {
    context: Arc<GpuContext>,
    particles: ParticleBuffer,
    compute: ComputeStage,
    render: RenderStage,
    target: T,
    // Commands of the last dispatch, submitted by the barrier.
    pending: Option<wgpu::CommandEncoder>,
}

impl<T: RenderTarget> GpuBackend<T> {
    pub fn new(
        context: Arc<GpuContext>,
        target: T,
        count: ParticleCount,
        params: &RenderParams,
    ) -> Result<Self> {
        let particles = ParticleBuffer::allocate(&context, count)?;
        let compute = ComputeStage::new(&context, &particles);
        let render = RenderStage::new(&context, target.format(), params);
        Ok(GpuBackend {
            context,
            particles,
            compute,
            render,
            target,
            pending: None,
        })
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn work_groups(&self) -> u32 {
        self.compute.work_groups()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn read_particles(&self) -> Result<Vec<Particle>> {
        self.particles.read_back(&self.context)
    }
}

impl<T: RenderTarget> ParticleBackend for GpuBackend<T> {
    fn particle_count(&self) -> ParticleCount {
        self.particles.count()
    }

    fn upload(&mut self, particles: &[Particle]) {
        self.particles.upload(&self.context.queue, particles);
    }

    fn dispatch(&mut self, uniforms: &FlowUniforms) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Flow step"),
            });
        self.compute.dispatch(&self.context.queue, &mut encoder, uniforms);
        self.pending = Some(encoder);
    }

    // Submission orders the compute pass before every later submission, and
    // wgpu inserts the storage to vertex transition between them.
    fn barrier(&mut self) {
        if let Some(encoder) = self.pending.take() {
            self.context.queue.submit(Some(encoder.finish()));
            self.context.device.poll(wgpu::Maintain::Poll);
        }
    }

    fn draw(&mut self) -> Result<DrawStats> {
        let frame = self.target.acquire()?;
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle draw"),
            });
        let points = self.render.draw(
            &self.context.queue,
            &mut encoder,
            &frame.view,
            &self.particles,
            self.target.aspect_ratio(),
        );
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(DrawStats { points })
    }
}
