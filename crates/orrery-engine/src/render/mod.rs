//! GPU rendering subsystem.
//!
//! Bodies record draws into a `DrawList` through `ShaderProgram` and
//! `MeshBuffer`; `SceneRenderer` uploads what those draws need and replays
//! them in a single depth-tested pass.
//!
//! Convention:
//! - right-handed world space, camera looks down -Z
//! - depth is standard Z (clear 1.0, `Less`)

mod color;
mod ctx;
mod draw;
mod mesh;
mod renderer;
pub mod shader;
mod texture;

pub use color::Color;
pub use ctx::{RenderCtx, RenderTarget};
pub use draw::{DrawCmd, DrawList, MAX_TEXTURE_UNITS};
pub use mesh::{MeshBuffer, MeshId};
pub use renderer::SceneRenderer;
pub use shader::{ProgramId, ShaderError, ShaderProgram};
pub use texture::{
    mip_level_count, PixelFormat, TextureError, TextureHandle, TextureId, TexturePixels,
    TextureStore,
};
