//! A field of tumbling asteroids under a sun that slowly circles the scene.

use asteroid_lab::{
    Deg, InnerSpace, Quaternion, Rotation3, Vector3,
    context::{Context, InitContext},
    data_structures::{instance::Instance, instanced::InstancedModel},
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::light::LightUniform,
    render::Render,
    resources::load_asteroid_model,
};
use instant::Duration;

const GRID: i32 = 5;
const SPACING: f32 = 2.5;

struct Field {
    asteroids: InstancedModel,
    spin_axes: Vec<Vector3<f32>>,
    sun_angle: f32,
}

impl Field {
    async fn new(ctx: InitContext) -> Self {
        let model = load_asteroid_model(
            "models/asteroid.obj",
            [0.9, 0.75, 0.6],
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        )
        .await;

        let mut instances = Vec::new();
        let mut spin_axes = Vec::new();
        for x in 0..GRID {
            for z in 0..GRID {
                let offset = (GRID - 1) as f32 / 2.0;
                let position = Vector3::new(
                    (x as f32 - offset) * SPACING,
                    0.0,
                    (z as f32 - offset) * SPACING - 4.0,
                );
                let seed = (x * GRID + z) as f32;
                spin_axes.push(Vector3::new(seed.sin(), 1.0, seed.cos()).normalize());
                instances.push(Instance::from(position).with_scale(0.4 + 0.04 * (seed % 5.0)));
            }
        }

        Self {
            asteroids: InstancedModel::new(&ctx.device, model, instances),
            spin_axes,
            sun_angle: 0.0,
        }
    }
}

impl GraphicsFlow<(), ()> for Field {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("asteroid-lab: directional light");
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        let dt = dt.as_secs_f32();
        for (instance, axis) in self.asteroids.instances.iter_mut().zip(&self.spin_axes) {
            instance.rotation =
                (Quaternion::from_axis_angle(*axis, Deg(30.0 * dt)) * instance.rotation).normalize();
        }
        self.asteroids.update(&ctx.device, &ctx.queue);

        self.sun_angle += 0.3 * dt;
        let direction = Vector3::new(self.sun_angle.cos(), 0.8, self.sun_angle.sin());
        Out::Configure(Box::new(move |ctx| {
            ctx.light.uniform = LightUniform::directional(direction, [1.0, 0.97, 0.9]);
        }))
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        (&self.asteroids).into()
    }
}

fn main() -> anyhow::Result<()> {
    let field: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Field::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![field])
}
