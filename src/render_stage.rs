use crate::buffer_util::{make_uniform_buffer, write_uniforms, SizedBuffer};
use crate::config::RenderParams;
use crate::gpu::GpuContext;
use crate::particle_buffer::ParticleBuffer;
use crate::shader_utils::create_wgsl_module;
use crate::view;

// This should match `ViewUniforms` in points.wgsl.
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub point_color: [f32; 4],
}

impl ViewUniforms {
    pub fn new(params: &RenderParams, aspect: f32) -> Self {
        ViewUniforms {
            view_proj: view::to_raw(&view::view_projection(params.view_extent, aspect)),
            point_color: params.point_color,
        }
    }
}

pub struct RenderStage {
    params: RenderParams,
    uniform_buffer: SizedBuffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl RenderStage {
    pub fn new(context: &GpuContext, format: wgpu::TextureFormat, params: &RenderParams) -> Self {
        let device = &context.device;
        let uniform_buffer =
            make_uniform_buffer(device, "View uniforms", &ViewUniforms::new(params, 1.0));
        let module = create_wgsl_module(device, "Points shader module", crate::include_shader!("points.wgsl"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Points bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: uniform_buffer.binding_size(),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Points pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: "vs_main",
                buffers: &[ParticleBuffer::vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: "fs_main",
                targets: &[wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                }],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Points bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.buffer.as_entire_binding(),
            }],
        });

        RenderStage {
            params: *params,
            uniform_buffer,
            bind_group,
            pipeline,
        }
    }

    // Returns the number of points drawn.
    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        particles: &ParticleBuffer,
        aspect: f32,
    ) -> u32 {
        write_uniforms(queue, &self.uniform_buffer, &ViewUniforms::new(&self.params, aspect));

        let [r, g, b, a] = self.params.background;
        let clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
        let count = particles.count().get();
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle points"),
            color_attachments: &[wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: true,
                },
            }],
            depth_stencil_attachment: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, particles.bind_for_render());
        rpass.draw(0..count, 0..1);
        count
    }
}
