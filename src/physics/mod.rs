//! Binary asteroid dynamics.
//!
//! Two rigid ellipsoids orbit each other under their mutual gravity, expanded to
//! second order in the inertia tensors. The relative orbit and both attitudes
//! form one 20-component state that is advanced with fixed-step RK4.
//!
//! - `body` holds mass properties and Euler's rigid-body equations
//! - `potential` is the mutual potential, its force and the gravity-gradient torques
//! - `integrator` combines the six component equations and steps them
//! - `diagnostics` tracks energy and angular momentum drift
//! - `preset` has the Didymos and Patroclus systems

mod body;
mod diagnostics;
mod error;
mod integrator;
mod potential;
mod preset;
pub mod quaternion;
mod state;

pub use body::{RigidBody, attitude_matrix};
pub use diagnostics::{Drift, DriftTracker};
pub use error::PhysicsError;
pub use integrator::{BinaryDynamics, BinarySystem, Renormalization, rk4_step};
pub use potential::MutualGravity;
pub use preset::{G, Preset, SECONDS_PER_DAY, SimulationConfig};
pub use state::{BinaryState, STATE_LEN};

use crate::data_structures::instance::Instance;

impl BinarySystem {
    /// Render transforms of both bodies for a unit-sphere mesh.
    ///
    /// `km_per_unit` converts kilometres into scene units.
    pub fn instances(&self, km_per_unit: f64) -> [Instance; 2] {
        let (p1, p2) = self.positions();
        let scale = 1.0 / km_per_unit;
        let to_instance = |position: cgmath::Vector3<f64>, q: cgmath::Quaternion<f64>, body: &RigidBody| {
            let q = quaternion::renormalize(q);
            Instance {
                position: (position * scale).cast().unwrap_or(cgmath::Vector3::new(0.0, 0.0, 0.0)),
                rotation: q.cast().unwrap_or(cgmath::Quaternion::new(1.0, 0.0, 0.0, 0.0)),
                scale: (body.semi_axes * scale).cast().unwrap_or(cgmath::Vector3::new(1.0, 1.0, 1.0)),
            }
        };
        [
            to_instance(p1, self.state.q1, &self.primary),
            to_instance(p2, self.state.q2, &self.secondary),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    #[test]
    fn patroclus_conserves_energy_and_momentum() {
        let mut system = Preset::Patroclus.system();
        let tracker = DriftTracker::new(&system);
        system.advance(10_000, 0.001).unwrap();
        let drift = tracker.drift(&system);
        assert!(drift.energy < 1e-4, "energy drift {}", drift.energy);
        assert!(drift.angular_momentum < 1e-4, "momentum drift {}", drift.angular_momentum);
        assert_relative_eq!(system.time, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn didymos_conserves_energy_over_an_orbit() {
        let mut system = Preset::Didymos.system();
        let tracker = DriftTracker::new(&system);
        system.advance(5_000, Preset::Didymos.time_step()).unwrap();
        let drift = tracker.drift(&system);
        assert!(drift.energy < 1e-4, "energy drift {}", drift.energy);
        assert!(drift.angular_momentum < 1e-4, "momentum drift {}", drift.angular_momentum);
    }

    #[test]
    fn quaternions_stay_unit_with_renormalization() {
        let mut system = SimulationConfig {
            renormalization: Renormalization::AfterStep,
            ..SimulationConfig::for_preset(Preset::Didymos)
        }
        .build();
        for _ in 0..500 {
            system.step(2.0e-3).unwrap();
            assert!(system.quaternion_norm_error() < 1e-12);
        }
    }

    #[test]
    fn orbit_stays_bound_and_near_circular() {
        let mut system = Preset::Patroclus.system();
        let d0 = system.state.separation();
        for _ in 0..50 {
            system.advance(100, 0.001).unwrap();
            let ratio = system.state.separation() / d0;
            assert!(ratio > 0.95 && ratio < 1.05, "separation ratio {ratio}");
        }
        // the orbit plane is xy, the momentum points along +z
        let l = system.angular_momentum().normalize();
        assert_relative_eq!(l.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn instances_place_bodies_about_the_barycentre() {
        let system = Preset::Patroclus.system();
        let [a, b] = system.instances(100.0);
        let m1 = system.primary.mass as f32;
        let m2 = system.secondary.mass as f32;
        let barycentre = (a.position * m1 + b.position * m2) / (m1 + m2);
        assert!(barycentre.magnitude() < 1e-3);
        assert_relative_eq!(b.position.x - a.position.x, 6.8, epsilon = 1e-4);
        assert_relative_eq!(a.scale.x, 0.63, epsilon = 1e-6);
    }
}
