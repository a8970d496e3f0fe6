use thiserror::Error;

/// Ways a binary integration can break down.
///
/// The integrator itself has no error control, so these are only raised by the
/// sanity checks performed after each completed step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("state vector became non-finite at t = {time} days")]
    NonFinite { time: f64 },

    #[error(
        "separation {separation} km dropped below the contact distance {contact} km at t = {time} days"
    )]
    Contact {
        separation: f64,
        contact: f64,
        time: f64,
    },

    #[error("time step must be positive and finite, got {0}")]
    InvalidStep(f64),
}
