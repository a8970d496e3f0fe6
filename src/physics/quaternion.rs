//! Quaternion attitude helpers.
//!
//! Quaternions are scalar-first and rotate body coordinates into the inertial
//! frame. Angular velocities are always expressed in the body frame.

use cgmath::{InnerSpace, Quaternion, Vector3};

/// Kinematic equation `q̇ = ½ q ⊗ (0, ω)`.
pub fn attitude_rate(q: Quaternion<f64>, omega_body: Vector3<f64>) -> Quaternion<f64> {
    q * Quaternion::from_sv(0.0, omega_body) * 0.5
}

/// Rescale to unit length. A degenerate (zero) quaternion becomes the identity.
pub fn renormalize(q: Quaternion<f64>) -> Quaternion<f64> {
    let norm = q.magnitude();
    if norm > f64::EPSILON {
        q / norm
    } else {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    }
}

/// Roll, pitch and yaw in radians.
///
/// Uses the aerospace Z-Y-X sequence: yaw about z, then pitch about the new y,
/// then roll about the new x.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn to_degrees(self) -> [f64; 3] {
        [
            self.roll.to_degrees(),
            self.pitch.to_degrees(),
            self.yaw.to_degrees(),
        ]
    }
}

pub fn to_euler(q: Quaternion<f64>) -> EulerAngles {
    let q = renormalize(q);
    let (w, x, y, z) = (q.s, q.v.x, q.v.y, q.v.z);

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    // clamp so rounding noise near ±90° pitch does not produce NaN
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    EulerAngles { roll, pitch, yaw }
}

pub fn from_euler(angles: EulerAngles) -> Quaternion<f64> {
    let (sr, cr) = (angles.roll * 0.5).sin_cos();
    let (sp, cp) = (angles.pitch * 0.5).sin_cos();
    let (sy, cy) = (angles.yaw * 0.5).sin_cos();

    Quaternion::new(
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    )
}
