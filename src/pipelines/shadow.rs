//! Shadow mapping: a depth pass rendered from the light and the bind group the
//! lit pass samples it through.

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::light::{LightKind, LightUniform},
    render::{Instanced, draw_depth},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    light_view_proj: [[f32; 4]; 4],
    /// enabled, depth bias, texel size, unused
    params: [f32; 4],
}

impl ShadowUniform {
    fn new(enabled: bool, bias: f32, resolution: u32) -> Self {
        Self {
            light_view_proj: Matrix4::identity().into(),
            params: [
                if enabled { 1.0 } else { 0.0 },
                bias,
                1.0 / resolution.max(1) as f32,
                0.0,
            ],
        }
    }
}

/// View-projection of the light that keeps a sphere of `radius` around
/// `center` inside the depth map.
///
/// Directional lights get an orthographic box, point lights a perspective
/// frustum from their position.
pub fn light_view_proj(light: &LightUniform, center: Point3<f32>, radius: f32) -> Matrix4<f32> {
    let radius = radius.max(1e-3);
    match light.kind() {
        LightKind::Directional => {
            let dir = light.position().normalize();
            let eye = center + dir * (2.0 * radius);
            let view = Matrix4::look_at_rh(eye, center, up_for(dir));
            let proj = cgmath::ortho(-radius, radius, -radius, radius, 0.5 * radius, 4.0 * radius);
            OPENGL_TO_WGPU_MATRIX * proj * view
        }
        LightKind::Point => {
            let eye = Point3::from_vec(light.position());
            let offset = center - eye;
            let distance = offset.magnitude();
            let (fovy, near) = if distance > radius * 1.05 {
                let half = (radius / distance).asin() * 1.1;
                (Rad(2.0 * half), (distance - radius).max(0.05))
            } else {
                (Deg(150.0).into(), 0.05)
            };
            let dir = if distance > 0.0 {
                offset / distance
            } else {
                -Vector3::unit_y()
            };
            let view = Matrix4::look_to_rh(eye, dir, up_for(dir));
            let proj = cgmath::perspective(fovy, 1.0, near, distance + radius);
            OPENGL_TO_WGPU_MATRIX * proj * view
        }
    }
}

fn up_for(dir: Vector3<f32>) -> Vector3<f32> {
    if dir.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    }
}

#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub uniform: ShadowUniform,
    pub buffer: wgpu::Buffer,
    /// Sampled by the lit pipeline at group 3.
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    /// Uniform only, bound while rendering the depth map.
    pub pass_bind_group: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
    /// Region the depth map has to cover.
    pub scene_center: Point3<f32>,
    pub scene_radius: f32,
}

impl ShadowMap {
    pub const DEFAULT_RESOLUTION: u32 = 2048;

    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let texture = Texture::create_shadow_map(device, resolution);
        let uniform = ShadowUniform::new(false, 0.002, resolution);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Shadow Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = mk_bind_group_layout(device);
        let sampler = texture
            .sampler
            .clone()
            .unwrap_or_else(|| crate::data_structures::texture::create_comparison_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("shadow_bind_group"),
        });

        let pass_bind_group_layout = mk_pass_bind_group_layout(device);
        let pass_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pass_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_pass_bind_group"),
        });
        let pipeline = mk_shadow_pipeline(device, &pass_bind_group_layout);

        Self {
            texture,
            uniform,
            buffer,
            bind_group_layout,
            bind_group,
            pass_bind_group,
            pipeline,
            scene_center: Point3::origin(),
            scene_radius: 10.0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.uniform.params[0] > 0.5
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.uniform.params[0] = if enabled { 1.0 } else { 0.0 };
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.uniform.params[1] = bias;
    }

    /// Recompute the light transform and upload it.
    pub fn update(&mut self, queue: &wgpu::Queue, light: &LightUniform) {
        self.uniform = self.uniform_for(light);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }

    /// Current settings with the light transform for `light`.
    pub fn uniform_for(&self, light: &LightUniform) -> ShadowUniform {
        ShadowUniform {
            light_view_proj: light_view_proj(light, self.scene_center, self.scene_radius).into(),
            params: self.uniform.params,
        }
    }

    /// Records the depth pass over `lits` into the shadow map.
    pub fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, lits: &[Instanced]) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        draw_depth(&mut render_pass, &self.pipeline, &self.pass_bind_group, lits);
    }
}

fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("shadow_bind_group_layout"),
    })
}

fn mk_pass_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("shadow_pass_bind_group_layout"),
    })
}

fn mk_shadow_pipeline(
    device: &wgpu::Device,
    pass_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[pass_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Shadow Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[ModelVertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        // depth only
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}
