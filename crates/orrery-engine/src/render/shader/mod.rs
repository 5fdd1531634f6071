//! WGSL shader programs.
//!
//! A program is built in three steps: each stage is parsed and validated with
//! naga (`compile_stage`), the two stages are checked against each other and
//! the fixed binding layout (`link`), and the result is wrapped in a
//! `ShaderProgram` that exposes named uniform setters and owns the wgpu
//! pipeline.
//!
//! Binding layout shared by every program:
//! - `@group(0) @binding(0)`: uniform block (dynamic offset, one slot per draw)
//! - `@group(1) @binding(0)`: `texture_2d<f32>`
//! - `@group(1) @binding(1)`: filtering sampler

mod compile;
mod error;
mod link;
mod program;
mod uniforms;

pub use compile::{compile_stage, CompiledStage, Stage};
pub use error::ShaderError;
pub use link::{link, LinkedProgram, UniformKind, UniformLayout, UniformMember, TEXTURE_GROUP, UNIFORM_GROUP};
pub use program::{ProgramId, ShaderProgram, ShaderSources};
pub use uniforms::{read_mat4, UniformBlock};
