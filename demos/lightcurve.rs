//! Synthetic lightcurve of a single spinning asteroid.
//!
//! The photometer renders the asteroid from a fixed observer at regular
//! simulated times. After two full rotations the curve is written to
//! `lightcurve.txt`; the window keeps spinning the asteroid afterwards.

use asteroid_lab::{
    Deg, Point3, Quaternion, Rad, Rotation3, Vector3,
    context::{Context, InitContext},
    data_structures::instanced::InstancedModel,
    flow::{FlowConstructor, GraphicsFlow, Out},
    lightcurve::{Lightcurve, LightcurveConfig, Photometer, sample_count, sample_time},
    pipelines::light::LightUniform,
    render::Render,
    resources::load_asteroid_model,
};
use instant::Duration;

/// Spin period in days.
const PERIOD: f64 = 0.25;
/// Simulated days per wall-clock second.
const TIME_SCALE: f64 = 0.05;
const ROTATIONS: f64 = 2.0;
const MAX_SAMPLES_PER_FRAME: usize = 4;

struct Spinner {
    asteroid: InstancedModel,
    config: LightcurveConfig,
    photometer: Option<Photometer>,
    lightcurve: Lightcurve,
    time: f64,
    next_sample: u64,
    written: bool,
}

impl Spinner {
    async fn new(ctx: InitContext) -> Self {
        let model = load_asteroid_model(
            "models/asteroid.obj",
            [0.9, 0.7, 0.6],
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
        )
        .await;
        Self {
            asteroid: InstancedModel::single(&ctx.device, model),
            config: LightcurveConfig::default(),
            photometer: None,
            lightcurve: Lightcurve::new(),
            time: 0.0,
            next_sample: 0,
            written: false,
        }
    }

    fn orient(&mut self, time: f64, ctx: &Context) {
        let spin = Rad((std::f64::consts::TAU * time / PERIOD) as f32);
        self.asteroid.instances[0].rotation =
            Quaternion::from_angle_x(Deg(20.0)) * Quaternion::from_angle_y(spin);
        self.asteroid.update(&ctx.device, &ctx.queue);
    }

    fn sample(&mut self, ctx: &Context, time: f64) {
        let Some(photometer) = &self.photometer else {
            return;
        };
        let eye = Point3::new(0.0, 0.5, 6.0);
        let target = Point3::new(0.0, 0.0, 0.0);
        match photometer.measure(ctx, eye, target, (&self.asteroid).into()) {
            Ok(brightness) => self.lightcurve.push(time, brightness),
            Err(e) => {
                log::error!("photometer failed, sampling stopped: {e:#}");
                self.photometer = None;
            }
        }
    }
}

impl GraphicsFlow<(), ()> for Spinner {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("asteroid-lab: lightcurve");
        ctx.light.uniform = LightUniform::directional(Vector3::new(1.0, 0.3, 1.0), [1.0, 1.0, 1.0]);
        ctx.light.uniform.ambient = 0.0;
        self.photometer = Some(Photometer::new(ctx, &self.config));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        self.time += dt.as_secs_f64() * TIME_SCALE;

        if !self.written {
            let interval = self.config.sample_interval;
            let total = sample_count(ROTATIONS * PERIOD, interval);
            let mut taken = 0;
            while self.next_sample < total && taken < MAX_SAMPLES_PER_FRAME {
                let t = sample_time(self.next_sample, interval);
                if t > self.time {
                    break;
                }
                self.orient(t, ctx);
                self.sample(ctx, t);
                self.next_sample += 1;
                taken += 1;
            }
            if self.next_sample >= total || self.photometer.is_none() {
                if let Err(e) = self.lightcurve.write_to(&self.config.output_path) {
                    log::error!("{e:#}");
                }
                self.written = true;
            }
        }

        self.orient(self.time, ctx);
        Out::Empty
    }

    fn on_tick(&mut self, ctx: &Context, _: &mut ()) -> Out<(), ()> {
        let brightness = self.lightcurve.last().map_or(0.0, |(_, b)| b);
        let state = if self.written { "written" } else { "sampling" };
        ctx.set_title(&format!(
            "asteroid-lab: lightcurve | t={:.3} d | {} samples | last={brightness:.4} | {state}",
            self.time,
            self.lightcurve.len()
        ));
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        (&self.asteroid).into()
    }
}

fn main() -> anyhow::Result<()> {
    let spinner: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Spinner::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![spinner])
}
