use std::ops::{Add, Mul};

use cgmath::{Quaternion, Vector3, Zero};

use super::quaternion::renormalize;

/// Number of scalar components in [`BinaryState::to_vector`].
pub const STATE_LEN: usize = 20;

/// Full state of a binary system: relative orbit plus both attitudes.
///
/// `r` and `v` are the position and velocity of the secondary relative to the
/// primary, `q1`/`q2` rotate body coordinates into the inertial frame and
/// `w1`/`w2` are body-frame angular velocities.
///
/// The same type doubles as the time derivative of a state so RK4 can combine
/// stages with plain `+` and `*`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinaryState {
    pub r: Vector3<f64>,
    pub v: Vector3<f64>,
    pub q1: Quaternion<f64>,
    pub w1: Vector3<f64>,
    pub q2: Quaternion<f64>,
    pub w2: Vector3<f64>,
}

impl BinaryState {
    pub fn new(r: Vector3<f64>, v: Vector3<f64>) -> Self {
        Self {
            r,
            v,
            q1: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            w1: Vector3::zero(),
            q2: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            w2: Vector3::zero(),
        }
    }

    pub fn with_spins(mut self, w1: Vector3<f64>, w2: Vector3<f64>) -> Self {
        self.w1 = w1;
        self.w2 = w2;
        self
    }

    pub fn with_attitudes(mut self, q1: Quaternion<f64>, q2: Quaternion<f64>) -> Self {
        self.q1 = q1;
        self.q2 = q2;
        self
    }

    pub fn separation(&self) -> f64 {
        cgmath::InnerSpace::magnitude(self.r)
    }

    pub fn renormalized(mut self) -> Self {
        self.q1 = renormalize(self.q1);
        self.q2 = renormalize(self.q2);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|c| c.is_finite())
    }

    /// Flatten into `(r, v, q1, w1, q2, w2)`, quaternions scalar first.
    pub fn to_vector(&self) -> [f64; STATE_LEN] {
        [
            self.r.x, self.r.y, self.r.z, //
            self.v.x, self.v.y, self.v.z, //
            self.q1.s, self.q1.v.x, self.q1.v.y, self.q1.v.z, //
            self.w1.x, self.w1.y, self.w1.z, //
            self.q2.s, self.q2.v.x, self.q2.v.y, self.q2.v.z, //
            self.w2.x, self.w2.y, self.w2.z,
        ]
    }

    pub fn from_vector(x: &[f64; STATE_LEN]) -> Self {
        Self {
            r: Vector3::new(x[0], x[1], x[2]),
            v: Vector3::new(x[3], x[4], x[5]),
            q1: Quaternion::new(x[6], x[7], x[8], x[9]),
            w1: Vector3::new(x[10], x[11], x[12]),
            q2: Quaternion::new(x[13], x[14], x[15], x[16]),
            w2: Vector3::new(x[17], x[18], x[19]),
        }
    }
}

impl Add for BinaryState {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            r: self.r + rhs.r,
            v: self.v + rhs.v,
            q1: self.q1 + rhs.q1,
            w1: self.w1 + rhs.w1,
            q2: self.q2 + rhs.q2,
            w2: self.w2 + rhs.w2,
        }
    }
}

impl Mul<f64> for BinaryState {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            r: self.r * rhs,
            v: self.v * rhs,
            q1: self.q1 * rhs,
            w1: self.w1 * rhs,
            q2: self.q2 * rhs,
            w2: self.w2 * rhs,
        }
    }
}
