//! Rigid ellipsoidal bodies.

use cgmath::{ElementWise, InnerSpace, Matrix, Matrix3, Quaternion, Vector3};

/// A homogeneous triaxial ellipsoid.
///
/// Only the principal moments are stored; the body frame is the principal
/// frame so the inertia tensor in body coordinates is diagonal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBody {
    /// Mass in kg.
    pub mass: f64,
    /// Semi-axes `(a, b, c)` in km along the body x, y and z axes.
    pub semi_axes: Vector3<f64>,
    /// Principal moments of inertia in kg km².
    pub inertia: Vector3<f64>,
}

impl RigidBody {
    pub fn ellipsoid(mass: f64, semi_axes: Vector3<f64>) -> Self {
        let (a2, b2, c2) = (
            semi_axes.x * semi_axes.x,
            semi_axes.y * semi_axes.y,
            semi_axes.z * semi_axes.z,
        );
        let inertia = Vector3::new(b2 + c2, a2 + c2, a2 + b2) * (mass / 5.0);
        Self {
            mass,
            semi_axes,
            inertia,
        }
    }

    /// Largest semi-axis, used as a bounding radius.
    pub fn radius(&self) -> f64 {
        self.semi_axes.x.max(self.semi_axes.y).max(self.semi_axes.z)
    }

    pub fn inertia_body(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.inertia.x,
            0.0,
            0.0,
            0.0,
            self.inertia.y,
            0.0,
            0.0,
            0.0,
            self.inertia.z,
        )
    }

    /// Inertia tensor expressed in the inertial frame, `A Î Aᵀ`.
    pub fn inertia_world(&self, attitude: Quaternion<f64>) -> Matrix3<f64> {
        let a = attitude_matrix(attitude);
        a * self.inertia_body() * a.transpose()
    }

    /// Body-frame angular momentum `Î ω`.
    pub fn angular_momentum_body(&self, omega: Vector3<f64>) -> Vector3<f64> {
        self.inertia.mul_element_wise(omega)
    }

    pub fn rotational_energy(&self, omega: Vector3<f64>) -> f64 {
        0.5 * omega.dot(self.angular_momentum_body(omega))
    }

    /// Euler's equations: `Î ω̇ = τ − ω × Î ω`, all in the body frame.
    pub fn angular_acceleration(
        &self,
        omega: Vector3<f64>,
        torque_body: Vector3<f64>,
    ) -> Vector3<f64> {
        let gyroscopic = omega.cross(self.angular_momentum_body(omega));
        (torque_body - gyroscopic).div_element_wise(self.inertia)
    }
}

/// Rotation matrix (body to inertial) of a possibly non-unit quaternion.
///
/// RK4 stage states are not renormalised, so the quaternion is normalised here
/// before it is turned into a matrix.
pub fn attitude_matrix(q: Quaternion<f64>) -> Matrix3<f64> {
    Matrix3::from(q.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Rad, Rotation3, SquareMatrix};

    #[test]
    fn sphere_has_isotropic_inertia() {
        let body = RigidBody::ellipsoid(10.0, Vector3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(body.inertia.x, 16.0);
        assert_relative_eq!(body.inertia.y, 16.0);
        assert_relative_eq!(body.inertia.z, 16.0);
    }

    #[test]
    fn world_inertia_keeps_trace() {
        let body = RigidBody::ellipsoid(3.0, Vector3::new(3.0, 2.0, 1.0));
        let q = Quaternion::from_axis_angle(Vector3::new(1.0, 2.0, 0.5).normalize(), Rad(0.7));
        let world = body.inertia_world(q);
        assert_relative_eq!(world.trace(), body.inertia_body().trace(), epsilon = 1e-12);
        // the tensor must stay symmetric
        assert_relative_eq!(world.x.y, world.y.x, epsilon = 1e-12);
        assert_relative_eq!(world.x.z, world.z.x, epsilon = 1e-12);
        assert_relative_eq!(world.y.z, world.z.y, epsilon = 1e-12);
    }

    #[test]
    fn spin_about_principal_axis_is_steady() {
        let body = RigidBody::ellipsoid(1.0, Vector3::new(3.0, 2.0, 1.0));
        let accel = body.angular_acceleration(Vector3::new(0.0, 0.0, 4.0), Vector3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(accel.magnitude(), 0.0);
    }
}
