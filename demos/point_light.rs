//! A point light orbiting an asteroid. The marker sphere shows where it is.

use asteroid_lab::{
    Deg, Quaternion, Rotation3, Vector3,
    context::{Context, InitContext},
    data_structures::{instance::Instance, instanced::InstancedModel},
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::light::LightUniform,
    render::Render,
    resources::{ellipsoid_model, load_asteroid_model},
};
use instant::Duration;

const ORBIT_RADIUS: f32 = 3.0;

struct Orbit {
    asteroid: InstancedModel,
    angle: f32,
}

impl Orbit {
    async fn new(ctx: InitContext) -> Self {
        let model = load_asteroid_model(
            "models/asteroid.obj",
            [0.9, 0.75, 0.6],
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        )
        .await;
        let mut asteroid = InstancedModel::single(&ctx.device, model);
        asteroid.instances[0].scale = Vector3::new(1.5, 1.5, 1.5);
        asteroid.update(&ctx.device, &ctx.queue);
        Self { asteroid, angle: 0.0 }
    }

    fn light_position(&self) -> Vector3<f32> {
        Vector3::new(
            ORBIT_RADIUS * self.angle.cos(),
            1.0 + 0.5 * (2.0 * self.angle).sin(),
            ORBIT_RADIUS * self.angle.sin(),
        )
    }
}

impl GraphicsFlow<(), ()> for Orbit {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("asteroid-lab: point light");
        ctx.light.model = Some(ellipsoid_model(
            [0.12; 3],
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        ));
        ctx.light.uniform = LightUniform::point(self.light_position(), [1.0, 0.9, 0.7]);
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        let dt = dt.as_secs_f32();
        self.angle = (self.angle + 0.8 * dt) % std::f32::consts::TAU;

        let instance: &mut Instance = &mut self.asteroid.instances[0];
        instance.rotation = Quaternion::from_angle_y(Deg(10.0 * dt)) * instance.rotation;
        self.asteroid.update(&ctx.device, &ctx.queue);

        let position = self.light_position();
        Out::Configure(Box::new(move |ctx| {
            ctx.light.uniform.position = position.into();
        }))
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        (&self.asteroid).into()
    }
}

fn main() -> anyhow::Result<()> {
    let orbit: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Orbit::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![orbit])
}
