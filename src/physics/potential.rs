//! Mutual gravitational potential of two extended bodies, truncated after the
//! second-order (inertia tensor) terms.
//!
//! With `r` pointing from the primary to the secondary, `d = |r|` and `I_k` the
//! inertial-frame inertia tensors:
//!
//! ```text
//! V = -G m1 m2 / d
//!     - (G m2 / 2) (tr I1 / d³ - 3 rᵀ I1 r / d⁵)
//!     - (G m1 / 2) (tr I2 / d³ - 3 rᵀ I2 r / d⁵)
//! ```

use cgmath::{InnerSpace, Matrix3, SquareMatrix, Vector3};

use super::body::RigidBody;

/// Orientation dependent part `tr I / d³ - 3 rᵀ I r / d⁵`.
fn quadrupole(inertia: &Matrix3<f64>, r: Vector3<f64>) -> f64 {
    let d2 = r.magnitude2();
    let d = d2.sqrt();
    let d3 = d2 * d;
    inertia.trace() / d3 - 3.0 * r.dot(*inertia * r) / (d3 * d2)
}

/// Gradient of [`quadrupole`] with respect to `r`.
fn quadrupole_gradient(inertia: &Matrix3<f64>, r: Vector3<f64>) -> Vector3<f64> {
    let d2 = r.magnitude2();
    let d = d2.sqrt();
    let d5 = d2 * d2 * d;
    let d7 = d5 * d2;
    let ir = *inertia * r;
    r * (-3.0 * inertia.trace() / d5 + 15.0 * r.dot(ir) / d7) - ir * (6.0 / d5)
}

/// Inertia tensors of both bodies in the inertial frame, computed once per
/// right-hand-side evaluation.
pub struct MutualGravity<'a> {
    pub g: f64,
    pub primary: &'a RigidBody,
    pub secondary: &'a RigidBody,
    pub i1: Matrix3<f64>,
    pub i2: Matrix3<f64>,
}

impl<'a> MutualGravity<'a> {
    pub fn new(
        g: f64,
        primary: &'a RigidBody,
        secondary: &'a RigidBody,
        i1: Matrix3<f64>,
        i2: Matrix3<f64>,
    ) -> Self {
        Self {
            g,
            primary,
            secondary,
            i1,
            i2,
        }
    }

    pub fn potential(&self, r: Vector3<f64>) -> f64 {
        let (m1, m2) = (self.primary.mass, self.secondary.mass);
        let d = r.magnitude();
        -self.g * m1 * m2 / d
            - 0.5 * self.g * m2 * quadrupole(&self.i1, r)
            - 0.5 * self.g * m1 * quadrupole(&self.i2, r)
    }

    /// Force acting on the secondary, `-∂V/∂r`.
    pub fn force(&self, r: Vector3<f64>) -> Vector3<f64> {
        let (m1, m2) = (self.primary.mass, self.secondary.mass);
        let d = r.magnitude();
        r * (-self.g * m1 * m2 / (d * d * d))
            + quadrupole_gradient(&self.i1, r) * (0.5 * self.g * m2)
            + quadrupole_gradient(&self.i2, r) * (0.5 * self.g * m1)
    }

    /// Gravity-gradient torques on the primary and the secondary, inertial frame.
    pub fn torques(&self, r: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        let d2 = r.magnitude2();
        let d5 = d2 * d2 * d2.sqrt();
        let t1 = r.cross(self.i1 * r) * (3.0 * self.g * self.secondary.mass / d5);
        // the primary sits at -r as seen from the secondary; the sign cancels
        let t2 = r.cross(self.i2 * r) * (3.0 * self.g * self.primary.mass / d5);
        (t1, t2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Quaternion, Rad, Rotation3};

    fn bodies() -> (RigidBody, RigidBody) {
        (
            RigidBody::ellipsoid(5.0e3, Vector3::new(1.3, 1.0, 0.8)),
            RigidBody::ellipsoid(2.0e3, Vector3::new(0.9, 0.6, 0.5)),
        )
    }

    #[test]
    fn force_is_negative_gradient_of_potential() {
        let (p, s) = bodies();
        let q1 = Quaternion::from_axis_angle(Vector3::new(0.2, 0.9, 0.1).normalize(), Rad(0.8));
        let q2 = Quaternion::from_axis_angle(Vector3::new(-0.6, 0.1, 0.7).normalize(), Rad(2.1));
        let gravity = MutualGravity::new(1.0, &p, &s, p.inertia_world(q1), s.inertia_world(q2));
        let r = Vector3::new(4.0, -2.5, 1.5);
        let h = 1e-5;
        let force = gravity.force(r);
        for axis in 0..3 {
            let mut dr = Vector3::new(0.0, 0.0, 0.0);
            dr[axis] = h;
            let numeric = -(gravity.potential(r + dr) - gravity.potential(r - dr)) / (2.0 * h);
            assert_relative_eq!(force[axis], numeric, max_relative = 1e-6);
        }
    }

    #[test]
    fn spheres_reduce_to_point_masses() {
        let p = RigidBody::ellipsoid(3.0, Vector3::new(1.0, 1.0, 1.0));
        let s = RigidBody::ellipsoid(2.0, Vector3::new(0.5, 0.5, 0.5));
        let gravity = MutualGravity::new(
            1.0,
            &p,
            &s,
            p.inertia_body(),
            s.inertia_body(),
        );
        let r = Vector3::new(3.0, 4.0, 0.0);
        let force = gravity.force(r);
        let expected = r * (-6.0 / 125.0);
        assert_relative_eq!(force.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(force.y, expected.y, epsilon = 1e-12);
        let (t1, t2) = gravity.torques(r);
        assert_relative_eq!(t1.magnitude(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t2.magnitude(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn orbital_and_spin_torques_balance() {
        let (p, s) = bodies();
        let q1 = Quaternion::from_angle_z(Rad(0.4));
        let q2 = Quaternion::from_angle_x(Rad(-1.0));
        let gravity = MutualGravity::new(2.0, &p, &s, p.inertia_world(q1), s.inertia_world(q2));
        let r = Vector3::new(3.0, 1.0, -0.5);
        let (t1, t2) = gravity.torques(r);
        let orbital = r.cross(gravity.force(r));
        let total = orbital + t1 + t2;
        assert_relative_eq!(total.magnitude(), 0.0, epsilon = 1e-9 * orbital.magnitude().max(1.0));
    }
}
