use crate::error::{FermatError, Result};
use rand::{Rng, SeedableRng};
use std::convert::TryFrom;

// This should match the struct defined in the flow kernel. The render stage
// reads `position` and `velocity` straight out of the same memory.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Particle {
    pub position: [f32; 3],
    // Age in seconds when positive, countdown to spawn otherwise.
    pub life: f32,
    pub velocity: [f32; 3],
    pub seed: f32,
}

pub const PARTICLE_SIZE: usize = std::mem::size_of::<Particle>();
pub const POSITION_OFFSET: wgpu::BufferAddress = 0;
pub const VELOCITY_OFFSET: wgpu::BufferAddress = 16;

// WGSL aligns vec3<f32> to 16 bytes; the record must not need any padding.
const _: () = assert!(PARTICLE_SIZE == 32);

impl Particle {
    pub fn is_waiting(&self) -> bool {
        self.life <= 0.0
    }
}

// Uniform block consumed by the flow kernel, rebuilt for every step.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct FlowUniforms {
    pub source: [f32; 3],
    pub dt: f32,
    pub sink: [f32; 3],
    pub lens_radius: f32,
    pub speed: f32,
    pub count: u32,
    pub arrival_radius: f32,
    pub lens_index: f32,
}

const _: () = assert!(std::mem::size_of::<FlowUniforms>() == 48);

/// Number of particles in a buffer. Always at least one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleCount(u32);

impl ParticleCount {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn byte_size(self) -> wgpu::BufferAddress {
        self.0 as wgpu::BufferAddress * PARTICLE_SIZE as wgpu::BufferAddress
    }
}

impl TryFrom<i64> for ParticleCount {
    type Error = FermatError;
    fn try_from(count: i64) -> Result<Self> {
        if count <= 0 || count > u32::MAX as i64 {
            return Err(FermatError::InvalidParticleCount(count));
        }
        Ok(ParticleCount(count as u32))
    }
}

impl TryFrom<u32> for ParticleCount {
    type Error = FermatError;
    fn try_from(count: u32) -> Result<Self> {
        ParticleCount::try_from(count as i64)
    }
}

// Externally controlled inputs of the flow. Last writer wins.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationParameters {
    pub source: cgmath::Vector3<f32>,
    pub sink: cgmath::Vector3<f32>,
    pub lens_radius: f32,
    pub flow_speed: f32,
}

impl SimulationParameters {
    pub fn from_config(flow: &crate::config::FlowParams) -> Self {
        SimulationParameters {
            source: flow.source.into(),
            sink: flow.sink.into(),
            lens_radius: flow.lens_radius,
            flow_speed: flow.flow_speed,
        }
    }

    pub fn to_uniforms(
        &self,
        dt: f32,
        count: ParticleCount,
        flow: &crate::config::FlowParams,
    ) -> FlowUniforms {
        FlowUniforms {
            source: self.source.into(),
            dt,
            sink: self.sink.into(),
            lens_radius: self.lens_radius,
            speed: self.flow_speed,
            count: count.get(),
            arrival_radius: flow.arrival_radius,
            lens_index: flow.lens_index,
        }
    }
}

// Fresh buffer contents: every particle waits at the source and spawns after a
// countdown spread over `spawn_window`, so the flow starts as a stream rather
// than a single pulse.
pub fn seed_particles(
    count: ParticleCount,
    source: cgmath::Vector3<f32>,
    flow: &crate::config::FlowParams,
) -> Vec<Particle> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(flow.seed);
    (0..count.get())
        .map(|_| {
            let seed: f32 = rng.gen_range(0.0..1.0);
            Particle {
                position: source.into(),
                life: -seed * flow.spawn_window.max(0.0),
                velocity: [0.0; 3],
                seed,
            }
        })
        .collect()
}

pub(crate) fn finite_vector(name: &'static str, x: f32, y: f32, z: f32) -> Result<cgmath::Vector3<f32>> {
    if x.is_finite() && y.is_finite() && z.is_finite() {
        Ok(cgmath::Vector3::new(x, y, z))
    } else {
        Err(FermatError::NonFiniteParameter { name })
    }
}

pub(crate) fn finite_scalar(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FermatError::NonFiniteParameter { name })
    }
}
