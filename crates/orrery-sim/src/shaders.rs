//! WGSL sources for the two scene programs.
//!
//! `SolarSystem` loads these from the shader directory at runtime so they can
//! be edited without a rebuild; the embedded copies back the tests.

pub const SUN_VERT: &str = include_str!("../shaders/sun.vert.wgsl");
pub const SUN_FRAG: &str = include_str!("../shaders/sun.frag.wgsl");
pub const PLANET_VERT: &str = include_str!("../shaders/planet.vert.wgsl");
pub const PLANET_FRAG: &str = include_str!("../shaders/planet.frag.wgsl");

pub const SUN_VERT_FILE: &str = "sun.vert.wgsl";
pub const SUN_FRAG_FILE: &str = "sun.frag.wgsl";
pub const PLANET_VERT_FILE: &str = "planet.vert.wgsl";
pub const PLANET_FRAG_FILE: &str = "planet.frag.wgsl";
