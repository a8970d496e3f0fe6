//! Didymos and Dimorphos under their mutual gravity.
//!
//! Keys: Tab/arrows adjust the panel, R restarts with the current parameters,
//! P pauses, Enter starts the CPU stress job.

use asteroid_lab::{
    Point3, Vector3, WindowEvent,
    context::{Context, InitContext},
    data_structures::instanced::InstancedModel,
    flow::{FlowConstructor, GraphicsFlow, Out},
    panel::{BackgroundJob, ControlPanel, Parameter, stress_task},
    physics::{BinarySystem, DriftTracker, Preset, SimulationConfig, quaternion},
    render::Render,
    resources::ellipsoid_model,
};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

const KM_PER_UNIT: f64 = 0.25;
const STRESS_ITERATIONS: u64 = 200_000_000;

struct Binary {
    bodies: InstancedModel,
    config: SimulationConfig,
    system: BinarySystem,
    tracker: DriftTracker,
    panel: ControlPanel,
    stress: BackgroundJob,
    paused: bool,
}

impl Binary {
    async fn new(ctx: InitContext) -> Self {
        let sphere = ellipsoid_model([1.0; 3], &ctx.device, &ctx.queue, &ctx.material_layout);
        let config = SimulationConfig::for_preset(Preset::Didymos);
        let system = config.build();
        let tracker = DriftTracker::new(&system);
        let bodies = InstancedModel::new(&ctx.device, sphere, system.instances(KM_PER_UNIT).to_vec());
        let panel = ControlPanel::new(Preset::Didymos.name())
            .with_parameter(Parameter::new("dt", config.dt, 1.0e-5, 1.0e-3, 2.5e-5))
            .with_parameter(Parameter::new(
                "steps/frame",
                config.steps_per_frame as f64,
                1.0,
                64.0,
                1.0,
            ))
            .with_parameter(Parameter::new("kick", 0.0, -0.5, 0.5, 0.05));

        Self {
            bodies,
            config,
            system,
            tracker,
            panel,
            stress: BackgroundJob::new(),
            paused: false,
        }
    }

    fn restart(&mut self) {
        self.config.dt = self.panel.value("dt").unwrap_or(self.config.dt);
        let kick = self.panel.value("kick").unwrap_or(0.0);
        // tangential kick in km/day
        self.config.velocity_kick = Vector3::new(0.0, kick, 0.0);
        self.system = self.config.build();
        self.tracker = DriftTracker::new(&self.system);
        self.paused = false;
        log::info!("restarted {} with {:?}", self.config.preset.name(), self.config);
    }

    fn refresh_panel(&mut self) {
        let drift = self.tracker.drift(&self.system);
        let [roll, pitch, yaw] = quaternion::to_euler(self.system.state.q1).to_degrees();
        self.panel.set_status("t", format!("{:.3} d", self.system.time));
        self.panel.set_status("separation", format!("{:.4} km", self.system.state.separation()));
        self.panel.set_status("dE", format!("{:.2e}", drift.energy));
        self.panel.set_status("dL", format!("{:.2e}", drift.angular_momentum));
        self.panel.set_status("primary rpy", format!("{roll:.0}/{pitch:.0}/{yaw:.0}"));
        let state = if self.paused {
            "paused"
        } else if self.stress.is_running() {
            "stress"
        } else {
            "running"
        };
        self.panel.set_status("state", state);
    }
}

impl GraphicsFlow<(), ()> for Binary {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.camera.position = Point3::new(0.0, 0.0, 14.0);
        ctx.camera.camera.look_at(Point3::new(0.0, 0.0, 0.0));
        self.refresh_panel();
        ctx.set_title(&self.panel.text());
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), _: Duration) -> Out<(), ()> {
        if self.paused {
            return Out::Empty;
        }
        self.config.steps_per_frame = self
            .panel
            .value("steps/frame")
            .map_or(self.config.steps_per_frame, |v| v as usize);
        if let Err(e) = self.system.advance(self.config.steps_per_frame, self.config.dt) {
            log::error!("simulation paused: {e}");
            self.paused = true;
        }
        self.bodies
            .set_instances(&ctx.device, &ctx.queue, self.system.instances(KM_PER_UNIT));
        Out::Empty
    }

    fn on_tick(&mut self, ctx: &Context, _: &mut ()) -> Out<(), ()> {
        self.refresh_panel();
        let text = self.panel.text();
        log::debug!("{text}");
        ctx.set_title(&text);
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut (), event: &WindowEvent) -> Out<(), ()> {
        if self.panel.handle_window_events(event) {
            ctx.set_title(&self.panel.text());
            return Out::Empty;
        }
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(key),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } = event
        {
            match key {
                KeyCode::KeyR => self.restart(),
                KeyCode::KeyP => self.paused = !self.paused,
                KeyCode::Enter => {
                    if !self.stress.trigger(|| {
                        stress_task(STRESS_ITERATIONS);
                    }) {
                        log::info!("stress job is still running");
                    }
                }
                _ => (),
            }
            self.refresh_panel();
            ctx.set_title(&self.panel.text());
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        (&self.bodies).into()
    }
}

fn main() -> anyhow::Result<()> {
    let binary: FlowConstructor<(), ()> = Box::new(|ctx| {
        Box::pin(async move { Box::new(Binary::new(ctx).await) as Box<dyn GraphicsFlow<_, _>> })
    });
    asteroid_lab::flow::run(vec![binary])
}
