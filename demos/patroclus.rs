//! Patroclus and Menoetius: mutual orbit plus the lightcurve an observer close
//! to the orbital plane would record, including mutual events.
//!
//! One full mutual orbit is sampled and written to `demo4_lightcurve.txt`.

use asteroid_lab::{
    Deg, Point3, Vector3, WindowEvent,
    context::{Context, InitContext},
    data_structures::instanced::InstancedModel,
    flow::{FlowConstructor, GraphicsFlow, Out},
    lightcurve::{Lightcurve, LightcurveConfig, Photometer},
    panel::{ControlPanel, Parameter},
    physics::{BinarySystem, DriftTracker, G, Preset, SimulationConfig},
    pipelines::light::LightUniform,
    render::Render,
    resources::ellipsoid_model,
};
use instant::Duration;

const KM_PER_UNIT: f64 = 50.0;

fn mutual_orbit_period(preset: Preset) -> f64 {
    let (primary, secondary) = preset.bodies();
    let d = preset.separation();
    std::f64::consts::TAU * (d * d * d / (G * (primary.mass + secondary.mass))).sqrt()
}

struct Trojans {
    bodies: InstancedModel,
    config: SimulationConfig,
    system: BinarySystem,
    tracker: DriftTracker,
    panel: ControlPanel,
    lightcurve_config: LightcurveConfig,
    photometer: Option<Photometer>,
    lightcurve: Lightcurve,
    period: f64,
    written: bool,
    paused: bool,
}

impl Trojans {
    async fn new(ctx: InitContext) -> Self {
        let sphere = ellipsoid_model([1.0; 3], &ctx.device, &ctx.queue, &ctx.material_layout);
        let config = SimulationConfig::for_preset(Preset::Patroclus);
        let system = config.build();
        let tracker = DriftTracker::new(&system);
        let bodies = InstancedModel::new(&ctx.device, sphere, system.instances(KM_PER_UNIT).to_vec());
        let lightcurve_config = LightcurveConfig {
            sample_interval: 0.01,
            output_path: "demo4_lightcurve.txt".into(),
            ..Default::default()
        };
        let panel = ControlPanel::new(Preset::Patroclus.name()).with_parameter(Parameter::new(
            "steps/frame",
            config.steps_per_frame as f64,
            1.0,
            32.0,
            1.0,
        ));

        Self {
            bodies,
            config,
            system,
            tracker,
            panel,
            lightcurve_config,
            photometer: None,
            lightcurve: Lightcurve::new(),
            period: mutual_orbit_period(Preset::Patroclus),
            written: false,
            paused: false,
        }
    }

    fn sample(&mut self, ctx: &Context) {
        let Some(photometer) = &self.photometer else {
            return;
        };
        // just above the orbital plane so the bodies eclipse each other
        let eye = Point3::new(0.0, -60.0, 2.0);
        let target = Point3::new(0.0, 0.0, 0.0);
        match photometer.measure(ctx, eye, target, (&self.bodies).into()) {
            Ok(brightness) => self.lightcurve.push(self.system.time, brightness),
            Err(e) => {
                log::error!("photometer failed, sampling stopped: {e:#}");
                self.photometer = None;
            }
        }
    }

    fn finish_lightcurve(&mut self) {
        if let Err(e) = self.lightcurve.write_to(&self.lightcurve_config.output_path) {
            log::error!("{e:#}");
        }
        self.written = true;
    }
}

impl GraphicsFlow<(), ()> for Trojans {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.camera.position = Point3::new(0.0, -6.0, 30.0);
        ctx.camera.camera.look_at(Point3::new(0.0, 0.0, 0.0));
        // sunlight from the observer's side, slightly off the line of sight
        ctx.light.uniform = LightUniform::directional(Vector3::new(0.3, -1.0, 0.05), [1.0, 1.0, 1.0]);
        ctx.light.uniform.ambient = 0.0;
        ctx.shadow.set_enabled(true);
        ctx.shadow.scene_radius = 12.0;

        let mut photometer = Photometer::new(ctx, &self.lightcurve_config);
        photometer.set_fovy(Deg(22.0));
        self.photometer = Some(photometer);
        log::info!("sampling one mutual orbit of {:.3} days", self.period);
        ctx.set_title(&self.panel.text());
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), _: Duration) -> Out<(), ()> {
        if self.paused {
            return Out::Empty;
        }
        let steps = self
            .panel
            .value("steps/frame")
            .map_or(self.config.steps_per_frame, |v| v as usize);
        if let Err(e) = self.system.advance(steps, self.config.dt) {
            log::error!("simulation paused: {e}");
            self.paused = true;
            if !self.written {
                self.finish_lightcurve();
            }
            return Out::Empty;
        }
        self.bodies
            .set_instances(&ctx.device, &ctx.queue, self.system.instances(KM_PER_UNIT));

        if !self.written {
            if self
                .lightcurve
                .due(self.system.time, self.lightcurve_config.sample_interval)
            {
                self.sample(ctx);
            }
            if self.system.time >= self.period || self.photometer.is_none() {
                self.finish_lightcurve();
            }
        }
        Out::Empty
    }

    fn on_tick(&mut self, ctx: &Context, _: &mut ()) -> Out<(), ()> {
        let drift = self.tracker.drift(&self.system);
        self.panel.set_status("t", format!("{:.2} d", self.system.time));
        self.panel.set_status("dE", format!("{:.2e}", drift.energy));
        self.panel.set_status("dL", format!("{:.2e}", drift.angular_momentum));
        let brightness = self.lightcurve.last().map_or(0.0, |(_, b)| b);
        self.panel.set_status("brightness", format!("{brightness:.4}"));
        self.panel.set_status(
            "lightcurve",
            if self.written { "written" } else { "sampling" },
        );
        let text = self.panel.text();
        log::debug!("{text}");
        ctx.set_title(&text);
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut (), event: &WindowEvent) -> Out<(), ()> {
        if self.panel.handle_window_events(event) {
            ctx.set_title(&self.panel.text());
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        (&self.bodies).into()
    }
}

fn main() -> anyhow::Result<()> {
    let trojans: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Trojans::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![trojans])
}
