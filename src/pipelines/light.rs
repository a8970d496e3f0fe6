//! The single scene light and the pipeline that draws its marker.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    model::{Model, ModelVertex, Vertex},
    texture,
};

/// Directional lights shine from `position` towards the origin without falloff,
/// point lights sit at `position` and fade with distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    kind: u32,
    pub color: [f32; 3],
    pub ambient: f32,
    /// Constant, linear and quadratic falloff of a point light.
    pub attenuation: [f32; 3],
    // uniforms are laid out in 16 byte rows
    _padding: u32,
}

impl LightUniform {
    pub fn directional(direction_to_light: Vector3<f32>, color: [f32; 3]) -> Self {
        Self {
            position: direction_to_light.normalize().into(),
            kind: 0,
            color,
            ambient: 0.05,
            attenuation: [1.0, 0.0, 0.0],
            _padding: 0,
        }
    }

    pub fn point(position: Vector3<f32>, color: [f32; 3]) -> Self {
        Self {
            position: position.into(),
            kind: 1,
            color,
            ambient: 0.05,
            attenuation: [1.0, 0.045, 0.0075],
            _padding: 0,
        }
    }

    pub fn kind(&self) -> LightKind {
        match self.kind {
            0 => LightKind::Directional,
            _ => LightKind::Point,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position.into()
    }

    /// Relative intensity at `distance`, 1 for directional lights.
    pub fn falloff(&self, distance: f32) -> f32 {
        match self.kind() {
            LightKind::Directional => 1.0,
            LightKind::Point => {
                let [c, l, q] = self.attenuation;
                1.0 / (c + l * distance + q * distance * distance)
            }
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    /// Marker drawn at the light position, none for directional lights.
    pub model: Option<Model>,
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(uniform: LightUniform, model: Option<Model>, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            model,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Light Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, light_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Light Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("light.wgsl").into()),
    };
    crate::pipelines::basic::mk_render_pipeline(
        device,
        &layout,
        color_format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(texture::Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 48);
    }

    #[test]
    fn directional_light_is_normalised_and_does_not_fade() {
        let light = LightUniform::directional(Vector3::new(3.0, 0.0, 4.0), [1.0; 3]);
        assert_eq!(light.kind(), LightKind::Directional);
        assert_relative_eq!(light.position().magnitude(), 1.0, epsilon = 1e-6);
        assert_eq!(light.falloff(1000.0), 1.0);
    }

    #[test]
    fn point_light_fades_with_distance() {
        let light = LightUniform::point(Vector3::new(0.0, 2.0, 0.0), [1.0; 3]);
        assert_eq!(light.kind(), LightKind::Point);
        assert_eq!(light.falloff(0.0), 1.0);
        assert!(light.falloff(10.0) < light.falloff(5.0));
    }
}
