//! asteroid-lab
//!
//! Small rendering demos on wgpu (triangle, textures, directional and point
//! lights, shadow mapping) and a binary-asteroid toolkit: a rigid-body
//! mutual-gravity integrator and synthetic lightcurves measured from
//! off-screen renders.
//!
//! High-level modules
//! - `camera`: fly camera, controller and view/projection uniforms
//! - `context`: window and GPU context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, instances, textures
//! - `flow`: the demo runtime (event loop and per-frame hooks)
//! - `lightcurve`: off-screen photometry and lightcurve output
//! - `panel`: keyboard-driven parameter panel and background jobs
//! - `physics`: binary-asteroid dynamics (RK4, quaternions, mutual potential)
//! - `pipelines`: lit, light marker, shadow and flat pipelines
//! - `resources`: OBJ, texture and shader loading
//! - `render`: render composition and batching
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod lightcurve;
pub mod panel;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
