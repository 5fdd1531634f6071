//! Orrery engine crate.
//!
//! Platform, GPU and rendering pieces used by the solar-system simulation:
//! a winit runtime, a wgpu device with a depth attachment, WGSL programs with
//! GL-style uniform setters, sphere meshes and a texture store.

pub mod core;
pub mod device;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
