use crate::buffer_util::{make_default_uniform_buffer, write_uniforms, SizedBuffer};
use crate::gpu::GpuContext;
use crate::particle::FlowUniforms;
use crate::particle_buffer::ParticleBuffer;
use crate::shader_utils::{create_wgsl_module, work_groups_for, WORK_GROUP_SIZE};

pub struct ComputeStage {
    work_groups: u32,
    bind_group: wgpu::BindGroup,
    uniform_buffer: SizedBuffer,
    pipeline: wgpu::ComputePipeline,
}

impl ComputeStage {
    pub fn new(context: &GpuContext, particles: &ParticleBuffer) -> Self {
        let device = &context.device;
        let uniform_buffer = make_default_uniform_buffer::<FlowUniforms>(device, "Flow uniforms");

        let work_groups = work_groups_for(particles.count().get());
        log::info!("Work groups: {}, Size: {}", work_groups, WORK_GROUP_SIZE);

        let module = create_wgsl_module(device, "Flow shader module", crate::include_shader!("flow.wgsl"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Flow bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: uniform_buffer.binding_size(),
                    },
                    count: None,
                },
                ParticleBuffer::compute_layout_entry(1),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Flow pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Flow pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "main",
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Flow bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.buffer.as_entire_binding(),
                },
                particles.bind_for_compute(1),
            ],
        });

        ComputeStage {
            work_groups,
            bind_group,
            uniform_buffer,
            pipeline,
        }
    }

    pub fn work_groups(&self) -> u32 {
        self.work_groups
    }

    // Records the pass into `encoder`. Nothing runs until the encoder is
    // submitted, and the uniform write is ordered before that submission.
    pub fn dispatch(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        uniforms: &FlowUniforms,
    ) {
        write_uniforms(queue, &self.uniform_buffer, uniforms);
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle flow"),
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);
        log::trace!("Dispatching {} work groups", self.work_groups);
        cpass.dispatch(self.work_groups, 1, 1);
    }
}
