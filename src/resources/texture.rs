use anyhow::Context as _;

use crate::data_structures::{model, texture};

/// Texture and sampler at bindings 0 and 1, shared by lit materials and flat geometry.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Assets live in `./assets`, relative to the working directory.
pub fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    let txt = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format)
}

/// Like [`load_texture`] but never fails: unreadable images become a checkerboard.
pub async fn load_texture_or_checkerboard(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> texture::Texture {
    match load_texture(file_name, device, queue, None).await {
        Ok(texture) => texture,
        Err(e) => {
            log::warn!("falling back to a checkerboard for {file_name}: {e}");
            texture::Texture::create_checkerboard(device, queue, 256, 8)
        }
    }
}

/// Materials referenced by an OBJ file. Entries without a diffuse map get their
/// diffuse colour as a solid texture; there is always at least one material.
pub async fn load_materials(
    obj_materials: &[tobj::Material],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Vec<model::Material> {
    let mut materials = Vec::new();
    for m in obj_materials {
        let diffuse_texture = match &m.diffuse_texture {
            Some(file_name) => load_texture_or_checkerboard(file_name, device, queue).await,
            None => {
                let [r, g, b] = m.diffuse.unwrap_or([1.0, 1.0, 1.0]);
                let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                texture::Texture::create_solid(device, queue, [to_u8(r), to_u8(g), to_u8(b), 255], &m.name)
            }
        };
        materials.push(model::Material::new(device, &m.name, diffuse_texture, layout));
    }
    if materials.is_empty() {
        materials.push(default_material(device, queue, layout));
    }
    materials
}

pub fn default_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> model::Material {
    let white = texture::Texture::create_solid(device, queue, [255; 4], "white");
    model::Material::new(device, "default", white, layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_asset_names_the_path() {
        let err = load_string("models/does_not_exist.obj").await.unwrap_err();
        assert!(err.to_string().contains("does_not_exist.obj"), "{err}");
        assert!(err.downcast_ref::<std::io::Error>().is_some());
        assert!(load_binary("textures/does_not_exist.png").await.is_err());
    }
}
