//! CPU-side triangle meshes: conversion from parsed OBJ models, normal
//! generation, the procedural ellipsoid and the upload to vertex/index buffers.

use cgmath::{InnerSpace, Vector3, Zero};
use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// One triangle mesh with a single index shared by positions, normals and UVs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl MeshData {
    /// Converts a triangulated, single-index tobj model. Normals are generated
    /// when the file has none; texture coordinates are flipped to wgpu's top-left
    /// origin.
    pub fn from_tobj(m: &tobj::Model) -> anyhow::Result<Self> {
        let mesh = &m.mesh;
        let vertex_count = mesh.positions.len() / 3;
        if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
            anyhow::bail!(
                "mesh {} references vertex {} but has only {}",
                m.name,
                bad,
                vertex_count
            );
        }
        if mesh.indices.len() % 3 != 0 {
            anyhow::bail!("mesh {} is not triangulated", m.name);
        }

        let positions = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let tex_coords = if mesh.texcoords.len() / 2 == vertex_count {
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| [t[0], 1.0 - t[1]])
                .collect()
        } else {
            vec![[0.0, 0.0]; vertex_count]
        };

        let mut data = Self {
            name: m.name.clone(),
            positions,
            normals: Vec::new(),
            tex_coords,
            indices: mesh.indices.clone(),
            material: mesh.material_id,
        };
        if mesh.normals.len() / 3 == vertex_count {
            data.normals = mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect();
        } else {
            data.compute_normals();
        }
        Ok(data)
    }

    /// Area-weighted vertex normals from the face geometry.
    pub fn compute_normals(&mut self) {
        let mut sums = vec![Vector3::<f32>::zero(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vector3::from(self.positions[a]);
            let pb = Vector3::from(self.positions[b]);
            let pc = Vector3::from(self.positions[c]);
            // |cross| is twice the area, so larger faces weigh more
            let face = (pb - pa).cross(pc - pa);
            sums[a] += face;
            sums[b] += face;
            sums[c] += face;
        }
        self.normals = sums
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0, 1.0, 0.0]
                }
            })
            .collect();
    }

    /// UV sphere stretched to the semi-axes `(a, b, c)` along x, y and z.
    ///
    /// Normals are the analytic ellipsoid normals, triangles wind counter-clockwise
    /// seen from outside.
    pub fn ellipsoid(semi_axes: [f32; 3], stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);
        let [a, b, c] = semi_axes;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        for i in 0..=stacks {
            let v = i as f32 / stacks as f32;
            let theta = v * std::f32::consts::PI;
            let (sin_t, cos_t) = theta.sin_cos();
            for j in 0..=slices {
                let u = j as f32 / slices as f32;
                let phi = u * std::f32::consts::TAU;
                let (sin_p, cos_p) = phi.sin_cos();
                let unit = Vector3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
                positions.push([a * unit.x, b * unit.y, c * unit.z]);
                let n = Vector3::new(unit.x / a, unit.y / b, unit.z / c);
                normals.push(n.normalize().into());
                tex_coords.push([u, v]);
            }
        }

        let row = slices + 1;
        let mut indices = Vec::new();
        for i in 0..stacks {
            for j in 0..slices {
                let p00 = i * row + j;
                let p01 = p00 + 1;
                let p10 = p00 + row;
                let p11 = p10 + 1;
                indices.extend_from_slice(&[p00, p01, p10, p10, p01, p11]);
            }
        }

        Self {
            name: String::from("ellipsoid"),
            positions,
            normals,
            tex_coords,
            indices,
            material: None,
        }
    }

    pub fn vertices(&self) -> Vec<model::ModelVertex> {
        (0..self.positions.len())
            .map(|i| model::ModelVertex {
                position: self.positions[i],
                tex_coords: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect()
    }

    pub fn upload(&self, device: &wgpu::Device) -> model::Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        model::Mesh {
            name: self.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
            material: self.material.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_triangle_normal_points_up_the_winding() {
        let mut mesh = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        mesh.compute_normals();
        for n in &mesh.normals {
            assert_eq!(*n, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn shared_vertex_normal_is_area_weighted() {
        // a large triangle facing +z and a small one facing +x share vertex 0
        let mut mesh = MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [4.0, 0.0, 0.0],
                [0.0, 4.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            indices: vec![0, 1, 2, 0, 3, 4],
            ..Default::default()
        };
        mesh.compute_normals();
        let n = Vector3::from(mesh.normals[0]);
        assert!(n.z > n.x * 10.0);
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-6);
        // unreferenced vertices get a placeholder rather than NaN
        let mut lonely = MeshData {
            positions: vec![[0.0; 3]],
            ..Default::default()
        };
        lonely.compute_normals();
        assert_eq!(lonely.normals, vec![[0.0, 1.0, 0.0]]);
    }

    #[test]
    fn ellipsoid_faces_outwards() {
        let mesh = MeshData::ellipsoid([3.0, 2.0, 1.0], 12, 24);
        assert_eq!(mesh.positions.len(), 13 * 25);
        assert_eq!(mesh.indices.len(), 12 * 24 * 6);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            let p = Vector3::from(*p);
            let n = Vector3::from(*n);
            assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
            assert!(p.dot(n) > 0.0);
            let on_surface = (p.x / 3.0).powi(2) + (p.y / 2.0).powi(2) + p.z.powi(2);
            assert_relative_eq!(on_surface, 1.0, epsilon = 1e-5);
        }
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vector3::from(mesh.positions[tri[k] as usize]));
            let face = (b - a).cross(c - a);
            if face.magnitude() > 1e-6 {
                assert!(face.dot(a + b + c) > 0.0, "inward triangle {tri:?}");
            }
        }
    }

    #[test]
    fn vertices_fill_missing_attributes() {
        let mesh = MeshData {
            positions: vec![[1.0, 2.0, 3.0]],
            ..Default::default()
        };
        let vertices = mesh.vertices();
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[0].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
    }
}
