//! Physical constants and the two binary systems used by the demos.
//!
//! Units are km, kg and days throughout.

use cgmath::{Vector3, Zero};

use super::{
    body::RigidBody,
    integrator::{BinarySystem, Renormalization},
    state::BinaryState,
};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Newtonian constant of gravitation in km³ kg⁻¹ day⁻².
pub const G: f64 = 6.674_30e-20 * SECONDS_PER_DAY * SECONDS_PER_DAY;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Preset {
    /// (65803) Didymos and its moonlet Dimorphos.
    #[default]
    Didymos,
    /// (617) Patroclus and Menoetius, a near-equal Jupiter trojan pair.
    Patroclus,
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Didymos => "Didymos-Dimorphos",
            Preset::Patroclus => "Patroclus-Menoetius",
        }
    }

    pub fn bodies(&self) -> (RigidBody, RigidBody) {
        match self {
            Preset::Didymos => (
                RigidBody::ellipsoid(5.32e11, Vector3::new(0.416, 0.418, 0.390)),
                RigidBody::ellipsoid(4.3e9, Vector3::new(0.0885, 0.087, 0.058)),
            ),
            Preset::Patroclus => (
                RigidBody::ellipsoid(6.74e17, Vector3::new(63.0, 57.0, 52.0)),
                RigidBody::ellipsoid(5.26e17, Vector3::new(58.0, 52.0, 48.0)),
            ),
        }
    }

    /// Mutual orbit radius in km.
    pub fn separation(&self) -> f64 {
        match self {
            Preset::Didymos => 1.19,
            Preset::Patroclus => 680.0,
        }
    }

    /// Spin period of the primary in days, `None` for a synchronous spin.
    pub fn primary_spin_period(&self) -> Option<f64> {
        match self {
            Preset::Didymos => Some(2.26 / 24.0),
            Preset::Patroclus => None,
        }
    }

    /// Recommended integration step in days.
    pub fn time_step(&self) -> f64 {
        match self {
            Preset::Didymos => 1.0e-4,
            Preset::Patroclus => 1.0e-3,
        }
    }

    /// Circular mutual orbit in the xy-plane, long axes aligned with the line of
    /// centres, the secondary spinning synchronously.
    pub fn initial_state(&self) -> BinaryState {
        let (primary, secondary) = self.bodies();
        let d = self.separation();
        let speed = (G * (primary.mass + secondary.mass) / d).sqrt();
        let mean_motion = speed / d;
        let primary_spin = self
            .primary_spin_period()
            .map_or(mean_motion, |period| std::f64::consts::TAU / period);

        BinaryState::new(Vector3::new(d, 0.0, 0.0), Vector3::new(0.0, speed, 0.0)).with_spins(
            Vector3::unit_z() * primary_spin,
            Vector3::unit_z() * mean_motion,
        )
    }

    pub fn system(&self) -> BinarySystem {
        let (primary, secondary) = self.bodies();
        BinarySystem::new(G, primary, secondary, self.initial_state())
    }
}

/// Everything a demo needs to drive a [`BinarySystem`] from the frame loop.
#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    pub preset: Preset,
    /// Integration step in days.
    pub dt: f64,
    /// RK4 steps taken per rendered frame.
    pub steps_per_frame: usize,
    pub renormalization: Renormalization,
    /// Overrides the default contact distance (sum of the largest semi-axes).
    pub contact_distance: Option<f64>,
    /// Extra velocity added to the circular orbit, km/day.
    pub velocity_kick: Vector3<f64>,
}

impl SimulationConfig {
    pub fn for_preset(preset: Preset) -> Self {
        Self {
            preset,
            dt: preset.time_step(),
            steps_per_frame: 4,
            renormalization: Renormalization::AfterStep,
            contact_distance: None,
            velocity_kick: Vector3::zero(),
        }
    }

    pub fn build(&self) -> BinarySystem {
        let (primary, secondary) = self.preset.bodies();
        let mut state = self.preset.initial_state();
        state.v += self.velocity_kick;
        let mut system =
            BinarySystem::new(G, primary, secondary, state).with_renormalization(self.renormalization);
        if let Some(contact) = self.contact_distance {
            system.contact_distance = contact;
        }
        system
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::for_preset(Preset::default())
    }
}
