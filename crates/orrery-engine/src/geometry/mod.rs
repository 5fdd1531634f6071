//! CPU-side procedural geometry.
//!
//! Geometry here is plain data (interleaved vertices + u32 indices) and never
//! touches the GPU; `render::MeshBuffer` uploads it.

mod sphere;

pub use sphere::{SphereGeometry, SphereVertex, UpAxis};
