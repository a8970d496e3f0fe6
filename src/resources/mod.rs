use std::io::{BufReader, Cursor};

use crate::{
    data_structures::model,
    resources::{mesh::MeshData, texture::load_string},
};

/**
 * This module contains all logic for loading meshes, textures and shaders from
 * external files.
 */
pub mod mesh;
pub mod shader;
pub mod texture;

fn obj_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Parses OBJ text into CPU-side meshes. Material libraries are ignored.
pub fn load_mesh_data(obj_text: &str) -> anyhow::Result<Vec<MeshData>> {
    let mut reader = BufReader::new(Cursor::new(obj_text));
    let (models, _) = tobj::load_obj_buf(&mut reader, &obj_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;
    let meshes = models
        .iter()
        .map(MeshData::from_tobj)
        .collect::<anyhow::Result<Vec<_>>>()?;
    if meshes.iter().all(|m| m.indices.is_empty()) {
        anyhow::bail!("OBJ input contains no faces");
    }
    Ok(meshes)
}

pub async fn load_model_obj(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<model::Model> {
    let obj_text = load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) =
        tobj::load_obj_buf_async(&mut obj_reader, &obj_options(), |p| async move {
            match load_string(&p).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("material library {p} unavailable: {e}");
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        })
        .await?;

    let obj_materials = obj_materials.unwrap_or_default();
    let materials = texture::load_materials(&obj_materials, device, queue, layout).await;

    let mut meshes = Vec::new();
    for (idx, m) in models.iter().enumerate() {
        match MeshData::from_tobj(m) {
            Ok(data) if !data.indices.is_empty() => meshes.push(data.upload(device)),
            Ok(_) => log::debug!("skipping mesh {idx} of {file_name}: no faces"),
            Err(e) => log::warn!("mesh at index {idx} in file {file_name} could not be loaded: {e}"),
        }
    }
    if meshes.is_empty() {
        anyhow::bail!("{file_name} contains no drawable meshes");
    }
    log::info!("loaded {file_name}: {} mesh(es), {} material(s)", meshes.len(), materials.len());

    Ok(model::Model { meshes, materials })
}

/// Builds a single-mesh model from CPU data with `material`.
pub fn model_from_mesh(
    data: &MeshData,
    device: &wgpu::Device,
    material: model::Material,
) -> model::Model {
    let mut mesh = data.upload(device);
    mesh.material = 0;
    model::Model {
        meshes: vec![mesh],
        materials: vec![material],
    }
}

pub fn ellipsoid_model(
    semi_axes: [f32; 3],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> model::Model {
    let data = MeshData::ellipsoid(semi_axes, 48, 96);
    let material = model::Material::new(
        device,
        "ellipsoid",
        crate::data_structures::texture::Texture::create_solid(
            device,
            queue,
            [200, 190, 175, 255],
            "regolith",
        ),
        layout,
    );
    model_from_mesh(&data, device, material)
}

/// Loads the asteroid shape from `file_name`, or generates an ellipsoid with
/// `semi_axes` when the file is missing or unreadable.
pub async fn load_asteroid_model(
    file_name: &str,
    semi_axes: [f32; 3],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> model::Model {
    match load_model_obj(file_name, device, queue, layout).await {
        Ok(model) => model,
        Err(e) => {
            log::warn!("using a procedural ellipsoid instead of {file_name}: {e}");
            ellipsoid_model(semi_axes, device, queue, layout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_POSITIONS: &str = "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\n";

    #[test]
    fn parses_plain_vertex_faces() {
        let text = format!("{TRIANGLE_POSITIONS}f 1 2 3\n");
        let meshes = load_mesh_data(&text).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].positions.len(), 3);
        assert_eq!(meshes[0].indices, vec![0, 1, 2]);
        // no vn lines, normals come from the face
        assert_eq!(meshes[0].normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn parses_texture_coordinate_faces() {
        let text = format!("{TRIANGLE_POSITIONS}vt 0.0 0.0\nvt 1.0 0.0\nvt 0.0 1.0\nf 1/1 2/2 3/3\n");
        let mesh = &load_mesh_data(&text).unwrap()[0];
        assert_eq!(mesh.tex_coords.len(), 3);
        // v is flipped to a top-left origin
        assert!(mesh.tex_coords.contains(&[0.0, 0.0]));
        assert!(mesh.tex_coords.contains(&[0.0, 1.0]));
        assert!(mesh.tex_coords.contains(&[1.0, 1.0]));
    }

    #[test]
    fn parses_normal_only_faces() {
        let text = format!("{TRIANGLE_POSITIONS}vn 0.0 0.0 -1.0\nf 1//1 2//1 3//1\n");
        let mesh = &load_mesh_data(&text).unwrap()[0];
        assert_eq!(mesh.normals, vec![[0.0, 0.0, -1.0]; 3]);
        assert_eq!(mesh.tex_coords, vec![[0.0, 0.0]; 3]);
    }

    #[test]
    fn parses_full_faces() {
        let text = format!(
            "{TRIANGLE_POSITIONS}vt 0.5 0.5\nvn 0.0 0.0 1.0\nf 1/1/1 2/1/1 3/1/1\n"
        );
        let mesh = &load_mesh_data(&text).unwrap()[0];
        assert_eq!(mesh.indices.len(), 3);
        assert_eq!(mesh.tex_coords, vec![[0.5, 0.5]; 3]);
        assert_eq!(mesh.normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn quads_are_triangulated() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = &load_mesh_data(text).unwrap()[0];
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(load_mesh_data("v 1.0 oops 0.0\nf 1 1 1\n").is_err());
        assert!(load_mesh_data("v 0 0 0\nv 1 0 0\n").is_err());
        assert!(load_mesh_data("").is_err());
    }
}
