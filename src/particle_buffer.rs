use crate::buffer_util::SizedBuffer;
use crate::error::{FermatError, Result};
use crate::gpu::GpuContext;
use crate::particle::{Particle, ParticleCount, PARTICLE_SIZE, POSITION_OFFSET, VELOCITY_OFFSET};
use crate::shader_utils::work_groups_for;

// Vertex view of a particle record. Nothing is copied: the render stage binds
// the storage buffer itself as its vertex buffer.
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    // Particle position.
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: POSITION_OFFSET,
        shader_location: 0,
    },
    // Particle velocity.
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: VELOCITY_OFFSET,
        shader_location: 1,
    },
];

#[cfg(not(target_arch = "wasm32"))]
fn pop_allocation_error(context: &GpuContext) -> Option<String> {
    futures::executor::block_on(context.device.pop_error_scope()).map(|error| error.to_string())
}

// The browser resolves error scopes asynchronously; report them to the log.
#[cfg(target_arch = "wasm32")]
fn pop_allocation_error(context: &GpuContext) -> Option<String> {
    let scope = context.device.pop_error_scope();
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(error) = scope.await {
            log::error!("Particle storage allocation failed: {}", error);
        }
    });
    None
}

/// Device-resident storage for a fixed number of particles. No resize.
pub struct ParticleBuffer {
    storage: SizedBuffer,
    count: ParticleCount,
}

impl ParticleBuffer {
    pub fn allocate(context: &GpuContext, count: ParticleCount) -> Result<Self> {
        let size = count.byte_size();
        let limits = context.device.limits();
        if size > limits.max_storage_buffer_binding_size as wgpu::BufferAddress {
            return Err(FermatError::AllocationFailure {
                requested: size,
                reason: format!(
                    "exceeds max_storage_buffer_binding_size ({})",
                    limits.max_storage_buffer_binding_size
                ),
            });
        }
        let work_groups = work_groups_for(count.get());
        if work_groups > limits.max_compute_workgroups_per_dimension {
            return Err(FermatError::AllocationFailure {
                requested: size,
                reason: format!(
                    "{} work groups exceed max_compute_workgroups_per_dimension ({})",
                    work_groups, limits.max_compute_workgroups_per_dimension
                ),
            });
        }

        context
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle storage"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        if let Some(reason) = pop_allocation_error(context) {
            return Err(FermatError::AllocationFailure {
                requested: size,
                reason,
            });
        }

        log::info!(
            "Allocated storage for {} particles ({} bytes)",
            count.get(),
            size
        );
        Ok(ParticleBuffer {
            storage: SizedBuffer { buffer, size },
            count,
        })
    }

    pub fn count(&self) -> ParticleCount {
        self.count
    }

    pub fn compute_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(PARTICLE_SIZE as _),
            },
            count: None,
        }
    }

    pub fn bind_for_compute(&self, binding: u32) -> wgpu::BindGroupEntry<'_> {
        wgpu::BindGroupEntry {
            binding,
            resource: self.storage.buffer.as_entire_binding(),
        }
    }

    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: PARTICLE_SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }

    pub fn bind_for_render(&self) -> wgpu::BufferSlice<'_> {
        self.storage.buffer.slice(..)
    }

    // One-time host to device seed. Never part of the frame path.
    pub fn upload(&self, queue: &wgpu::Queue, particles: &[Particle]) {
        debug_assert_eq!(particles.len(), self.count.get() as usize);
        let len = particles.len().min(self.count.get() as usize);
        queue.write_buffer(&self.storage.buffer, 0, bytemuck::cast_slice(&particles[..len]));
    }

    // Diagnostic copy of the buffer contents through a staging buffer.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn read_back(&self, context: &GpuContext) -> Result<Vec<Particle>> {
        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle readback"),
            size: self.storage.size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle readback"),
            });
        encoder.copy_buffer_to_buffer(&self.storage.buffer, 0, &staging, 0, self.storage.size);
        context.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let mapping = slice.map_async(wgpu::MapMode::Read);
        // Poll the device in a blocking manner so that our future resolves.
        context.device.poll(wgpu::Maintain::Wait);
        futures::executor::block_on(mapping)
            .map_err(|e| FermatError::Readback(e.to_string()))?;
        let particles = bytemuck::cast_slice::<u8, Particle>(&slice.get_mapped_range()).to_vec();
        staging.unmap();
        Ok(particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn vertex_layout_aliases_the_particle_record() {
        let layout = ParticleBuffer::vertex_layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(layout.attributes[0].shader_location, 0);
        assert_eq!(layout.attributes[1].offset, 16);
        assert_eq!(layout.attributes[1].shader_location, 1);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    #[ignore] // Requires a GPU adapter, run on demand.
    fn allocation_beyond_device_limits_fails() {
        let context = GpuContext::headless().unwrap();
        let limit = context.device.limits().max_storage_buffer_binding_size as i64;
        let count = ParticleCount::try_from(limit / PARTICLE_SIZE as i64 + 1).unwrap();
        match ParticleBuffer::allocate(&context, count) {
            Err(FermatError::AllocationFailure { .. }) => (),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("allocation should have been rejected"),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    #[ignore] // Requires a GPU adapter, run on demand.
    fn upload_round_trips_through_device_memory() {
        let context = GpuContext::headless().unwrap();
        let count = ParticleCount::try_from(300i64).unwrap();
        let buffer = ParticleBuffer::allocate(&context, count).unwrap();
        let particles: Vec<Particle> = (0..300)
            .map(|i| Particle {
                position: [i as f32, 0.0, 0.0],
                life: 1.0,
                velocity: [0.0; 3],
                seed: 0.5,
            })
            .collect();
        buffer.upload(&context.queue, &particles);
        assert_eq!(buffer.read_back(&context).unwrap(), particles);
    }
}
