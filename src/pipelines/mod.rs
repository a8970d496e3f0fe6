//! Render pipelines and the uniforms they read.
//!
//! - `basic` has the lit Blinn-Phong pipeline and the shared pipeline builder
//! - `light` holds the scene light and the marker pipeline
//! - `shadow` renders and samples the shadow map
//! - `flat` draws 2D geometry in clip space

pub mod basic;
pub mod flat;
pub mod light;
pub mod shadow;

/// Every pipeline a frame can use, built once against the surface format.
#[derive(Debug)]
pub struct Pipelines {
    pub lit: wgpu::RenderPipeline,
    pub light: wgpu::RenderPipeline,
    pub flat: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        light_layout: &wgpu::BindGroupLayout,
        shadow_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            lit: basic::mk_lit_pipeline(
                device,
                color_format,
                material_layout,
                camera_layout,
                light_layout,
                shadow_layout,
            ),
            light: light::mk_render_pipeline(device, color_format, camera_layout, light_layout),
            flat: flat::mk_flat_pipeline(device, color_format, material_layout),
        }
    }
}
