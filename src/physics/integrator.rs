use std::ops::{Add, Mul};

use cgmath::{Matrix, Vector3};

use super::{
    body::{RigidBody, attitude_matrix},
    error::PhysicsError,
    potential::MutualGravity,
    quaternion::attitude_rate,
    state::BinaryState,
};

/// One classical fourth-order Runge-Kutta step. No error estimate is made.
pub fn rk4_step<S, F>(state: S, dt: f64, rhs: F) -> S
where
    S: Copy + Add<Output = S> + Mul<f64, Output = S>,
    F: Fn(&S) -> S,
{
    let k1 = rhs(&state);
    let k2 = rhs(&(state + k1 * (0.5 * dt)));
    let k3 = rhs(&(state + k2 * (0.5 * dt)));
    let k4 = rhs(&(state + k3 * dt));
    state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// When attitude quaternions are rescaled to unit length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Renormalization {
    /// Rescale before every step, the result of a step may drift off unit norm.
    BeforeStep,
    /// Rescale every completed step so the stored state always holds unit quaternions.
    #[default]
    AfterStep,
    /// Let the norm drift.
    Never,
}

/// Right-hand side of the coupled orbit and attitude equations.
///
/// Split into the six component equations so each can be checked on its own.
pub struct BinaryDynamics<'a> {
    pub g: f64,
    pub primary: &'a RigidBody,
    pub secondary: &'a RigidBody,
}

impl<'a> BinaryDynamics<'a> {
    pub fn reduced_mass(&self) -> f64 {
        let (m1, m2) = (self.primary.mass, self.secondary.mass);
        m1 * m2 / (m1 + m2)
    }

    pub fn gravity(&self, s: &BinaryState) -> MutualGravity<'a> {
        MutualGravity::new(
            self.g,
            self.primary,
            self.secondary,
            self.primary.inertia_world(s.q1),
            self.secondary.inertia_world(s.q2),
        )
    }

    pub fn translational_velocity(&self, s: &BinaryState) -> Vector3<f64> {
        s.v
    }

    pub fn translational_acceleration(&self, gravity: &MutualGravity, s: &BinaryState) -> Vector3<f64> {
        gravity.force(s.r) / self.reduced_mass()
    }

    pub fn primary_attitude_rate(&self, s: &BinaryState) -> cgmath::Quaternion<f64> {
        attitude_rate(s.q1, s.w1)
    }

    pub fn primary_angular_acceleration(&self, torque: Vector3<f64>, s: &BinaryState) -> Vector3<f64> {
        let torque_body = attitude_matrix(s.q1).transpose() * torque;
        self.primary.angular_acceleration(s.w1, torque_body)
    }

    pub fn secondary_attitude_rate(&self, s: &BinaryState) -> cgmath::Quaternion<f64> {
        attitude_rate(s.q2, s.w2)
    }

    pub fn secondary_angular_acceleration(&self, torque: Vector3<f64>, s: &BinaryState) -> Vector3<f64> {
        let torque_body = attitude_matrix(s.q2).transpose() * torque;
        self.secondary.angular_acceleration(s.w2, torque_body)
    }

    pub fn derivative(&self, s: &BinaryState) -> BinaryState {
        let gravity = self.gravity(s);
        let (t1, t2) = gravity.torques(s.r);
        BinaryState {
            r: self.translational_velocity(s),
            v: self.translational_acceleration(&gravity, s),
            q1: self.primary_attitude_rate(s),
            w1: self.primary_angular_acceleration(t1, s),
            q2: self.secondary_attitude_rate(s),
            w2: self.secondary_angular_acceleration(t2, s),
        }
    }
}

/// A binary asteroid advanced with fixed-step RK4.
#[derive(Clone, Debug)]
pub struct BinarySystem {
    pub g: f64,
    pub primary: RigidBody,
    pub secondary: RigidBody,
    pub state: BinaryState,
    /// Elapsed simulation time in days.
    pub time: f64,
    pub renormalization: Renormalization,
    /// Separation in km below which stepping stops with [`PhysicsError::Contact`].
    pub contact_distance: f64,
}

impl BinarySystem {
    pub fn new(g: f64, primary: RigidBody, secondary: RigidBody, state: BinaryState) -> Self {
        let contact_distance = primary.radius() + secondary.radius();
        let state = state.renormalized();
        Self {
            g,
            primary,
            secondary,
            state,
            time: 0.0,
            renormalization: Renormalization::default(),
            contact_distance,
        }
    }

    pub fn with_renormalization(mut self, renormalization: Renormalization) -> Self {
        self.renormalization = renormalization;
        self
    }

    pub fn dynamics(&self) -> BinaryDynamics<'_> {
        BinaryDynamics {
            g: self.g,
            primary: &self.primary,
            secondary: &self.secondary,
        }
    }

    pub fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidStep(dt));
        }
        let start = match self.renormalization {
            Renormalization::BeforeStep => self.state.renormalized(),
            _ => self.state,
        };

        let dynamics = self.dynamics();
        let next = rk4_step(start, dt, |s| dynamics.derivative(s));
        let next = match self.renormalization {
            Renormalization::AfterStep => next.renormalized(),
            _ => next,
        };

        let time = self.time + dt;
        if !next.is_finite() {
            return Err(PhysicsError::NonFinite { time });
        }
        let separation = next.separation();
        if separation < self.contact_distance {
            return Err(PhysicsError::Contact {
                separation,
                contact: self.contact_distance,
                time,
            });
        }

        self.state = next;
        self.time = time;
        Ok(())
    }

    /// Take `steps` steps of size `dt`, stopping at the first failure.
    pub fn advance(&mut self, steps: usize, dt: f64) -> Result<(), PhysicsError> {
        for _ in 0..steps {
            self.step(dt)?;
        }
        Ok(())
    }

    pub fn total_mass(&self) -> f64 {
        self.primary.mass + self.secondary.mass
    }

    /// Barycentric positions of the primary and the secondary.
    pub fn positions(&self) -> (Vector3<f64>, Vector3<f64>) {
        let m = self.total_mass();
        (
            self.state.r * (-self.secondary.mass / m),
            self.state.r * (self.primary.mass / m),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Clone, Copy)]
    struct Oscillator {
        x: f64,
        p: f64,
    }

    impl Add for Oscillator {
        type Output = Self;
        fn add(self, rhs: Self) -> Self {
            Self {
                x: self.x + rhs.x,
                p: self.p + rhs.p,
            }
        }
    }

    impl Mul<f64> for Oscillator {
        type Output = Self;
        fn mul(self, rhs: f64) -> Self {
            Self {
                x: self.x * rhs,
                p: self.p * rhs,
            }
        }
    }

    fn integrate_oscillator(dt: f64) -> f64 {
        let mut s = Oscillator { x: 1.0, p: 0.0 };
        let steps = (1.0 / dt).round() as usize;
        for _ in 0..steps {
            s = rk4_step(s, dt, |s| Oscillator { x: s.p, p: -s.x });
        }
        (s.x - 1.0f64.cos()).abs()
    }

    #[test]
    fn rk4_is_fourth_order() {
        let coarse = integrate_oscillator(0.1);
        let fine = integrate_oscillator(0.05);
        let order = (coarse / fine).log2();
        assert!(order > 3.7 && order < 4.3, "observed order {order}");
    }

    #[test]
    fn rk4_integrates_exponential() {
        let mut x = 1.0f64;
        for _ in 0..100 {
            x = rk4_step(x, 0.01, |x| *x);
        }
        assert_relative_eq!(x, 1.0f64.exp(), max_relative = 1e-9);
    }

    #[test]
    fn rejects_bad_time_step() {
        let body = RigidBody::ellipsoid(1.0, Vector3::new(0.1, 0.1, 0.1));
        let mut system = BinarySystem::new(
            1.0,
            body,
            body,
            BinaryState::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)),
        );
        assert_eq!(system.step(0.0), Err(PhysicsError::InvalidStep(0.0)));
        assert!(system.step(f64::NAN).is_err());
        assert_eq!(system.time, 0.0);
    }

    #[test]
    fn head_on_fall_stops_at_contact() {
        let body = RigidBody::ellipsoid(1.0, Vector3::new(0.1, 0.1, 0.1));
        let mut system = BinarySystem::new(
            1.0,
            body,
            body,
            BinaryState::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)),
        );
        let err = system.advance(100_000, 1e-3).unwrap_err();
        match err {
            PhysicsError::Contact { separation, contact, .. } => {
                assert!(separation < contact);
                assert_relative_eq!(contact, 0.2);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(system.state.separation() >= system.contact_distance);
    }

    #[test]
    fn barycentre_stays_at_origin() {
        let primary = RigidBody::ellipsoid(3.0, Vector3::new(0.1, 0.1, 0.1));
        let secondary = RigidBody::ellipsoid(1.0, Vector3::new(0.1, 0.1, 0.1));
        let system = BinarySystem::new(
            1.0,
            primary,
            secondary,
            BinaryState::new(Vector3::new(4.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)),
        );
        let (p1, p2) = system.positions();
        let barycentre = p1 * primary.mass + p2 * secondary.mass;
        assert_relative_eq!(barycentre.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!((p2 - p1).x, 4.0, epsilon = 1e-12);
    }
}
