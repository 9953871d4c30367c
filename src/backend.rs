use crate::error::Result;
use crate::particle::{FlowUniforms, Particle, ParticleCount};

// The host backend runs the same kernel on the CPU so the sequencing rules can
// be checked without an adapter.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DrawStats {
    // Point primitives emitted by the draw, always the particle count.
    pub points: u32,
}

pub trait ParticleBackend {
    fn particle_count(&self) -> ParticleCount;

    // Replaces the whole particle buffer. Never part of the frame path.
    fn upload(&mut self, particles: &[Particle]);

    // Results are not observable until the next barrier.
    fn dispatch(&mut self, uniforms: &FlowUniforms);

    fn barrier(&mut self);

    fn draw(&mut self) -> Result<DrawStats>;
}
