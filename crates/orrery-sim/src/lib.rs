//! Animated solar system on top of `orrery-engine`.
//!
//! A sun, four planets and the Moon, each a textured sphere. Planets circle
//! the sun at constant angular speed; the Moon circles the Earth.

mod app;
mod body;
mod camera;
mod controls;
pub mod shaders;
mod solar_system;

pub use app::Application;
pub use body::{Body, BodyParams, BODY_TEXTURE_UNIFORM, BODY_TEXTURE_UNIT};
pub use camera::{CameraMovement, FlyCamera};
pub use controls::{FrameControls, SPEED_STEP};
pub use solar_system::{SceneConfig, SolarSystem, EARTH};
