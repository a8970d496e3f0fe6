//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]. The runtime collects
//! those into [`Batches`] once per pass and draws each batch with its pipeline:
//! lit models in the shadow pass and in the main pass, flat geometry and custom
//! closures in the main pass only. The photometer reuses the lit batch.
//!
//! # Key types
//!
//! - [`Render<'a, 'pass>`] describes render operations
//! - [`Instanced<'a>`] is a model plus its instance buffer
//! - [`Flat<'a>`] is 2D geometry with a texture bind group

use wgpu::RenderPass;

use crate::{
    context::Context,
    data_structures::{
        instanced::InstancedModel,
        model::{DrawModel, Model, SceneBindings},
    },
    pipelines::flat::FlatMesh,
};

/// Data for instanced object rendering: a model and its instance buffer.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Data for flat 2D rendering: vertex and index buffers with a bind group.
#[derive(Clone)]
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: usize,
}

pub type CustomRender<'a, 'pass> = Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>;

/// Specifies how a flow's objects should be rendered.
///
/// - `None` renders nothing
/// - `Lit(Instanced)` renders one model with lighting and shadows
/// - `Lits(Vec<Instanced>)` renders a batch of lit models
/// - `Flat(Flat)` renders 2D geometry in clip space
/// - `Composed(Vec<Render>)` recursively renders a composition
/// - `Custom(...)` invokes a closure with the main render pass
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Lit(Instanced<'a>),
    Lits(Vec<Instanced<'a>>),
    Flat(Flat<'a>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(CustomRender<'a, 'pass>),
}

/// Everything a frame draws, sorted by pipeline.
pub struct Batches<'a, 'pass> {
    pub lits: Vec<Instanced<'a>>,
    pub flats: Vec<Flat<'a>>,
    pub customs: Vec<CustomRender<'a, 'pass>>,
}

impl<'a, 'pass> Default for Batches<'a, 'pass> {
    fn default() -> Self {
        Self {
            lits: Vec::new(),
            flats: Vec::new(),
            customs: Vec::new(),
        }
    }
}

impl<'a, 'pass> Render<'a, 'pass> {
    pub fn collect(self, batches: &mut Batches<'a, 'pass>) {
        match self {
            Render::Lit(instanced) => batches.lits.push(instanced),
            Render::Lits(mut vec) => batches.lits.append(&mut vec),
            Render::Flat(flat) => batches.flats.push(flat),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect(batches)),
            Render::Custom(f) => batches.customs.push(f),
            Render::None => (),
        }
    }

    pub fn into_batches(self) -> Batches<'a, 'pass> {
        let mut batches = Batches::default();
        self.collect(&mut batches);
        batches
    }
}

impl<'a, 'pass> From<&'a InstancedModel> for Render<'a, 'pass> {
    fn from(model: &'a InstancedModel) -> Self {
        Render::Lit(Instanced {
            instance: &model.instance_buffer,
            model: &model.model,
            amount: model.instances.len(),
        })
    }
}

impl<'a, 'pass> From<&'a FlatMesh> for Render<'a, 'pass> {
    fn from(mesh: &'a FlatMesh) -> Self {
        Render::Flat(Flat {
            vertex: &mesh.vertex_buffer,
            index: &mesh.index_buffer,
            group: &mesh.material.bind_group,
            amount: mesh.num_indices as usize,
        })
    }
}

fn drawable(instanced: &Instanced) -> bool {
    if instanced.amount == 0 || instanced.instance.size() == 0 {
        log::warn!("you attempted to render something with zero instances");
        return false;
    }
    true
}

/// Draws lit models with `pipeline`, which must follow the lit bind group layout.
pub fn draw_lits(
    render_pass: &mut RenderPass<'_>,
    pipeline: &wgpu::RenderPipeline,
    lits: &[Instanced],
    scene: SceneBindings,
) {
    render_pass.set_pipeline(pipeline);
    for instanced in lits.iter().filter(|i| drawable(i)) {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_instanced(instanced.model, 0..instanced.amount as u32, scene);
    }
}

/// Depth-only draw into the shadow map.
pub fn draw_depth(
    render_pass: &mut RenderPass<'_>,
    pipeline: &wgpu::RenderPipeline,
    pass_bind_group: &wgpu::BindGroup,
    lits: &[Instanced],
) {
    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, pass_bind_group, &[]);
    for instanced in lits.iter().filter(|i| drawable(i)) {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_depth(instanced.model, 0..instanced.amount as u32);
    }
}

pub fn draw_flats(
    render_pass: &mut RenderPass<'_>,
    pipeline: &wgpu::RenderPipeline,
    flats: &[Flat],
) {
    render_pass.set_pipeline(pipeline);
    for flat in flats {
        render_pass.set_bind_group(0, flat.group, &[]);
        render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
        render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..flat.amount as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_renders_are_flattened_in_order() {
        let render: Render<'_, '_> = Render::Composed(vec![
            Render::None,
            Render::Custom(Box::new(|_, _| ())),
            Render::Composed(vec![Render::Custom(Box::new(|_, _| ()))]),
            Render::Lits(Vec::new()),
        ]);
        let batches = render.into_batches();
        assert_eq!(batches.customs.len(), 2);
        assert!(batches.lits.is_empty());
        assert!(batches.flats.is_empty());
    }
}
