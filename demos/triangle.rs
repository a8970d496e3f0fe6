//! A single coloured triangle drawn with a shader loaded from disk.

use asteroid_lab::{
    context::{Context, InitContext},
    data_structures::texture::Texture,
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::{basic::mk_render_pipeline_from_module, flat::FlatVertex},
    render::Render,
    resources::shader::Shader,
};
use wgpu::util::DeviceExt;

struct Triangle {
    pipeline: Option<wgpu::RenderPipeline>,
    vertices: wgpu::Buffer,
}

impl Triangle {
    async fn new(ctx: InitContext) -> Self {
        let vertices = [
            FlatVertex::coloured([0.0, 0.6], [1.0, 0.2, 0.2]),
            FlatVertex::coloured([-0.6, -0.5], [0.2, 1.0, 0.2]),
            FlatVertex::coloured([0.6, -0.5], [0.2, 0.2, 1.0]),
        ];
        let vertices = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Triangle Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline = match Shader::from_file(&ctx.device, "shaders/triangle.wgsl").await {
            Ok(shader) => {
                let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Triangle Pipeline Layout"),
                    bind_group_layouts: &[],
                    push_constant_ranges: &[],
                });
                Some(mk_render_pipeline_from_module(
                    &ctx.device,
                    &layout,
                    ctx.surface_format,
                    Some(wgpu::BlendState::REPLACE),
                    Some(Texture::DEPTH_FORMAT),
                    &[FlatVertex::desc()],
                    &shader.module,
                ))
            }
            Err(e) => {
                log::error!("triangle shader unavailable, nothing will be drawn: {e:#}");
                None
            }
        };

        Self { pipeline, vertices }
    }
}

impl GraphicsFlow<(), ()> for Triangle {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("asteroid-lab: triangle");
        ctx.clear_colour = wgpu::Color {
            r: 0.05,
            g: 0.05,
            b: 0.08,
            a: 1.0,
        };
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        let Some(pipeline) = &self.pipeline else {
            return Render::None;
        };
        Render::Custom(Box::new(move |_, render_pass| {
            render_pass.set_pipeline(pipeline);
            render_pass.set_vertex_buffer(0, self.vertices.slice(..));
            render_pass.draw(0..3, 0..1);
        }))
    }
}

fn main() -> anyhow::Result<()> {
    let triangle: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Triangle::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![triangle])
}
