//! GPU-side data: models, textures and instances.
//!
//! - `model` contains mesh and material definitions and the draw traits
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data
//! - `instanced` pairs a model with its instance buffer

pub mod instance;
pub mod instanced;
pub mod model;
pub mod texture;
