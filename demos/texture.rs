//! Two textured quads: an image from disk and a generated checkerboard.

use asteroid_lab::{
    context::{Context, InitContext},
    data_structures::{model::Material, texture::Texture},
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::flat::{FlatMesh, FlatVertex},
    render::Render,
    resources::texture::load_texture_or_checkerboard,
};

const QUAD_INDICES: &[u16] = &[0, 1, 2, 2, 3, 0];

fn quad(left: f32, right: f32) -> [FlatVertex; 4] {
    [
        FlatVertex::textured([left, -0.5], [0.0, 1.0]),
        FlatVertex::textured([right, -0.5], [1.0, 1.0]),
        FlatVertex::textured([right, 0.5], [1.0, 0.0]),
        FlatVertex::textured([left, 0.5], [0.0, 0.0]),
    ]
}

struct Textured {
    image: FlatMesh,
    checkerboard: FlatMesh,
}

impl Textured {
    async fn new(ctx: InitContext) -> Self {
        let regolith =
            load_texture_or_checkerboard("textures/regolith.png", &ctx.device, &ctx.queue).await;
        let image = FlatMesh::new(
            &ctx.device,
            "Regolith Quad",
            &quad(-0.9, -0.1),
            QUAD_INDICES,
            Material::new(&ctx.device, "regolith", regolith, &ctx.material_layout),
        );

        let checker = Texture::create_checkerboard(&ctx.device, &ctx.queue, 256, 8);
        let checkerboard = FlatMesh::new(
            &ctx.device,
            "Checkerboard Quad",
            &quad(0.1, 0.9),
            QUAD_INDICES,
            Material::new(&ctx.device, "checkerboard", checker, &ctx.material_layout),
        );

        Self { image, checkerboard }
    }
}

impl GraphicsFlow<(), ()> for Textured {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("asteroid-lab: textures");
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Composed(vec![(&self.image).into(), (&self.checkerboard).into()])
    }
}

fn main() -> anyhow::Result<()> {
    let textured: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Textured::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![textured])
}
