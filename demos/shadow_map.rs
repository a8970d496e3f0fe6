//! An asteroid and its moonlet casting shadows on a flat plate.
//!
//! Tab selects a parameter, left/right change it.

use asteroid_lab::{
    Deg, Point3, Quaternion, Rad, Rotation3, Vector3, WindowEvent,
    context::{Context, InitContext},
    data_structures::{instance::Instance, instanced::InstancedModel},
    flow::{FlowConstructor, GraphicsFlow, Out},
    panel::{ControlPanel, Parameter},
    pipelines::light::LightUniform,
    render::Render,
    resources::{ellipsoid_model, load_asteroid_model},
};
use instant::Duration;

struct Shadows {
    ground: InstancedModel,
    bodies: InstancedModel,
    panel: ControlPanel,
    moon_angle: f32,
}

impl Shadows {
    async fn new(ctx: InitContext) -> Self {
        let plate = ellipsoid_model([6.0, 0.05, 6.0], &ctx.device, &ctx.queue, &ctx.material_layout);
        let ground = InstancedModel::new(
            &ctx.device,
            plate,
            vec![Instance::from(Vector3::new(0.0, -1.5, 0.0))],
        );

        let rock = load_asteroid_model(
            "models/asteroid.obj",
            [0.9, 0.75, 0.6],
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        )
        .await;
        let bodies = InstancedModel::new(
            &ctx.device,
            rock,
            vec![Instance::new(), Instance::new().with_scale(0.3)],
        );

        let panel = ControlPanel::new("shadow map")
            .with_parameter(Parameter::new("shadows", 1.0, 0.0, 1.0, 1.0))
            .with_parameter(Parameter::new("bias", 0.002, 0.0, 0.02, 0.0005))
            .with_parameter(Parameter::new("sun height", 1.5, 0.2, 4.0, 0.1));

        Self {
            ground,
            bodies,
            panel,
            moon_angle: 0.0,
        }
    }

    fn configure(&self) -> Out<(), ()> {
        let enabled = self.panel.value("shadows").unwrap_or(1.0) > 0.5;
        let bias = self.panel.value("bias").unwrap_or(0.002) as f32;
        let height = self.panel.value("sun height").unwrap_or(1.5) as f32;
        Out::Configure(Box::new(move |ctx| {
            ctx.shadow.set_enabled(enabled);
            ctx.shadow.set_bias(bias);
            ctx.light.uniform = LightUniform::directional(Vector3::new(0.6, height, 0.4), [1.0, 1.0, 1.0]);
        }))
    }
}

impl GraphicsFlow<(), ()> for Shadows {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.shadow.scene_center = Point3::new(0.0, -0.5, 0.0);
        ctx.shadow.scene_radius = 7.0;
        ctx.set_title(&self.panel.text());
        self.configure()
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        let dt = dt.as_secs_f32();
        self.moon_angle = (self.moon_angle + 0.6 * dt) % std::f32::consts::TAU;

        let [primary, moon] = &mut self.bodies.instances[..] else {
            return Out::Empty;
        };
        primary.rotation = Quaternion::from_angle_y(Deg(20.0 * dt)) * primary.rotation;
        moon.position = Vector3::new(2.2 * self.moon_angle.cos(), 0.2, 2.2 * self.moon_angle.sin());
        moon.rotation = Quaternion::from_angle_y(Rad(-self.moon_angle));
        self.bodies.update(&ctx.device, &ctx.queue);
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut (), event: &WindowEvent) -> Out<(), ()> {
        if self.panel.handle_window_events(event) {
            ctx.set_title(&self.panel.text());
            return self.configure();
        }
        if matches!(event, WindowEvent::KeyboardInput { .. }) {
            ctx.set_title(&self.panel.text());
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Composed(vec![(&self.ground).into(), (&self.bodies).into()])
    }
}

fn main() -> anyhow::Result<()> {
    let shadows: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Shadows::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![shadows])
}
