//! Conserved quantities. They are only reported, the integrator never
//! corrects for drift.

use cgmath::{InnerSpace, Vector3};

use super::{body::attitude_matrix, integrator::BinarySystem};

impl BinarySystem {
    pub fn energy(&self) -> f64 {
        let dynamics = self.dynamics();
        let s = &self.state;
        let orbital = 0.5 * dynamics.reduced_mass() * s.v.magnitude2();
        let spin = self.primary.rotational_energy(s.w1) + self.secondary.rotational_energy(s.w2);
        orbital + spin + dynamics.gravity(s).potential(s.r)
    }

    /// Total angular momentum about the barycentre, inertial frame.
    pub fn angular_momentum(&self) -> Vector3<f64> {
        let s = &self.state;
        let orbital = s.r.cross(s.v) * self.dynamics().reduced_mass();
        let spin1 = attitude_matrix(s.q1) * self.primary.angular_momentum_body(s.w1);
        let spin2 = attitude_matrix(s.q2) * self.secondary.angular_momentum_body(s.w2);
        orbital + spin1 + spin2
    }

    /// Largest deviation of either quaternion from unit norm.
    pub fn quaternion_norm_error(&self) -> f64 {
        let e1 = (self.state.q1.magnitude() - 1.0).abs();
        let e2 = (self.state.q2.magnitude() - 1.0).abs();
        e1.max(e2)
    }
}

/// Remembers the conserved quantities at construction and reports relative drift.
#[derive(Clone, Copy, Debug)]
pub struct DriftTracker {
    pub initial_energy: f64,
    pub initial_angular_momentum: Vector3<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Drift {
    pub energy: f64,
    pub angular_momentum: f64,
}

impl DriftTracker {
    pub fn new(system: &BinarySystem) -> Self {
        Self {
            initial_energy: system.energy(),
            initial_angular_momentum: system.angular_momentum(),
        }
    }

    pub fn drift(&self, system: &BinarySystem) -> Drift {
        let energy = relative(system.energy() - self.initial_energy, self.initial_energy.abs());
        let momentum = system.angular_momentum() - self.initial_angular_momentum;
        let angular_momentum = relative(
            momentum.magnitude(),
            self.initial_angular_momentum.magnitude(),
        );
        Drift {
            energy,
            angular_momentum,
        }
    }
}

fn relative(delta: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        delta.abs() / reference
    } else {
        delta.abs()
    }
}
