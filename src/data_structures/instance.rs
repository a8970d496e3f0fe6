//! Per-instance transforms uploaded next to the vertex buffer.

use cgmath::{One, SquareMatrix};

use crate::data_structures::model;

/// Position, attitude and per-axis scale of one drawn copy of a model.
///
/// A unit sphere with `scale = (a, b, c)` becomes the triaxial ellipsoid with
/// those semi-axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Inverse transpose of the linear part, `R S⁻¹`. Normals stay perpendicular
    /// to the surface under non-uniform scale; the shader renormalises them.
    pub fn normal_matrix(&self) -> cgmath::Matrix3<f32> {
        let inverse_scale = cgmath::Matrix3::from_diagonal(cgmath::Vector3::new(
            1.0 / self.scale.x,
            1.0 / self.scale.y,
            1.0 / self.scale.z,
        ));
        cgmath::Matrix3::from(self.rotation) * inverse_scale
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: self.normal_matrix().into(),
        }
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// What actually lives in the instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

/**
 * The model matrix takes four vec4 slots (5-8), the normal matrix three vec3 slots (9-11).
 * Locations 0-2 belong to `ModelVertex`.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // advance once per instance rather than per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Rad, Rotation3, Vector3};

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_stretch() {
        let instance = Instance {
            rotation: cgmath::Quaternion::from_angle_y(Rad(0.7)),
            scale: Vector3::new(3.0, 1.0, 0.5),
            ..Instance::new()
        };
        // plane x + y = 0 in model space, with tangent (1, -1, 0)
        let tangent = Vector3::new(1.0f32, -1.0, 0.0);
        let normal = Vector3::new(1.0f32, 1.0, 0.0);
        let linear = cgmath::Matrix3::from(instance.rotation)
            * cgmath::Matrix3::from_diagonal(instance.scale);
        let world_tangent = linear * tangent;
        let world_normal = instance.normal_matrix() * normal;
        assert_relative_eq!(world_tangent.dot(world_normal), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn matrix_places_origin_at_position() {
        let instance = Instance::from(Vector3::new(1.0, -2.0, 4.0)).with_scale(2.0);
        let origin = instance.to_matrix() * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin.truncate(), Vector3::new(1.0, -2.0, 4.0));
    }
}
