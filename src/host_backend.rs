use crate::backend::{DrawStats, ParticleBackend};
use crate::error::Result;
use crate::kernel;
use crate::particle::{FlowUniforms, Particle, ParticleCount};

// CPU reference backend. The barrier swaps the visible buffer with the one the
// last dispatch wrote.
pub struct HostBackend {
    count: ParticleCount,
    visible: Vec<Particle>,
    written: Vec<Particle>,
    unsynchronized: bool,
    // Kernel applications per particle since allocation.
    invocations: Vec<u32>,
    last_frame: Vec<Particle>,
    draws: u64,
}

impl HostBackend {
    pub fn new(count: ParticleCount) -> Self {
        let len = count.get() as usize;
        log::info!("Allocated host storage for {} particles", len);
        HostBackend {
            count,
            visible: vec![Particle::default(); len],
            written: vec![Particle::default(); len],
            unsynchronized: false,
            invocations: vec![0; len],
            last_frame: Vec::new(),
            draws: 0,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.visible
    }

    pub fn invocations(&self) -> &[u32] {
        &self.invocations
    }

    // What the most recent draw read.
    pub fn last_frame(&self) -> &[Particle] {
        &self.last_frame
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl ParticleBackend for HostBackend {
    fn particle_count(&self) -> ParticleCount {
        self.count
    }

    fn upload(&mut self, particles: &[Particle]) {
        debug_assert_eq!(particles.len(), self.visible.len());
        let len = particles.len().min(self.visible.len());
        self.visible[..len].copy_from_slice(&particles[..len]);
        self.unsynchronized = false;
    }

    fn dispatch(&mut self, uniforms: &FlowUniforms) {
        kernel::dispatch(&self.visible, &mut self.written, &mut self.invocations, uniforms);
        self.unsynchronized = true;
    }

    fn barrier(&mut self) {
        if self.unsynchronized {
            std::mem::swap(&mut self.visible, &mut self.written);
            self.unsynchronized = false;
        }
    }

    fn draw(&mut self) -> Result<DrawStats> {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(&self.visible);
        self.draws += 1;
        Ok(DrawStats {
            points: self.count.get(),
        })
    }
}
