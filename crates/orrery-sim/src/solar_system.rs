use std::path::{Path, PathBuf};

use glam::Vec3;

use orrery_engine::geometry::SphereGeometry;
use orrery_engine::render::{Color, DrawList, MeshBuffer, ShaderProgram, TextureStore};

use crate::body::{Body, BodyParams};
use crate::camera::FlyCamera;
use crate::controls::FrameControls;
use crate::shaders;

/// Where scene assets live and how the frame is cleared.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub shader_dir: PathBuf,
    pub texture_dir: PathBuf,
    pub clear_color: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shader_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders"),
            texture_dir: PathBuf::from("textures"),
            clear_color: Color::rgba(0.0, 0.0, 0.05, 1.0),
        }
    }
}

/// One row of the scene table.
struct BodySpec {
    name: &'static str,
    params: BodyParams,
    texture: &'static str,
}

const SUN: BodySpec = BodySpec {
    name: "sun",
    params: BodyParams::new(0.0, 0.0, 10.0, 5.0),
    texture: "sunmap.jpg",
};

const PLANETS: [BodySpec; 4] = [
    BodySpec {
        name: "mercury",
        params: BodyParams::new(15.0, 47.0, 20.0, 1.0),
        texture: "mercurymap.jpg",
    },
    BodySpec {
        name: "venus",
        params: BodyParams::new(22.0, 35.0, 15.0, 1.8),
        texture: "venusmap.jpg",
    },
    BodySpec {
        name: "earth",
        params: BodyParams::new(30.0, 30.0, 25.0, 2.0),
        texture: "earthmap1k.jpg",
    },
    BodySpec {
        name: "mars",
        params: BodyParams::new(40.0, 24.0, 20.0, 1.5),
        texture: "marsmap1k.jpg",
    },
];

const MOON: BodySpec = BodySpec {
    name: "moon",
    params: BodyParams::new(5.0, 80.0, 15.0, 0.5),
    texture: "moonmap1k.jpg",
};

/// Index of the Earth in `SolarSystem::planets`.
pub const EARTH: usize = 2;

pub const LIGHT_DIR: Vec3 = Vec3::new(0.0, -1.0, 0.0);
pub const LIGHT_COLOR: Vec3 = Vec3::new(1.0, 1.0, 0.9);
pub const POINT_LIGHT_POS: Vec3 = Vec3::new(0.0, 10.0, 0.0);
pub const POINT_LIGHT_COLOR: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// The scene: body tree, camera, the two programs and the shared sphere mesh.
pub struct SolarSystem {
    config: SceneConfig,
    camera: FlyCamera,

    sun: Body,
    planets: Vec<Body>,

    sun_program: ShaderProgram,
    planet_program: ShaderProgram,
    mesh: MeshBuffer,
}

impl SolarSystem {
    /// Loads programs from `config.shader_dir` and textures from
    /// `config.texture_dir`. Missing assets are logged and degrade to an
    /// unusable program or a blank body.
    pub fn new(config: SceneConfig, textures: &mut TextureStore) -> Self {
        let dir = &config.shader_dir;
        let sun_program = ShaderProgram::from_files(
            "sun",
            dir.join(shaders::SUN_VERT_FILE),
            dir.join(shaders::SUN_FRAG_FILE),
        );
        let planet_program = ShaderProgram::from_files(
            "planet",
            dir.join(shaders::PLANET_VERT_FILE),
            dir.join(shaders::PLANET_FRAG_FILE),
        );
        Self::with_programs(config, textures, sun_program, planet_program)
    }

    pub fn with_programs(
        config: SceneConfig,
        textures: &mut TextureStore,
        sun_program: ShaderProgram,
        planet_program: ShaderProgram,
    ) -> Self {
        let load = |row: &BodySpec, textures: &mut TextureStore| {
            log::debug!("creating {}", row.name);
            Body::load(row.params, config.texture_dir.join(row.texture), textures)
        };

        let sun = load(&SUN, textures);
        let mut planets: Vec<Body> = PLANETS.iter().map(|row| load(row, textures)).collect();
        planets[EARTH].add_moon(load(&MOON, textures));

        log::info!(
            "solar system ready: {} planets, {} textures",
            planets.len(),
            textures.live_count()
        );

        Self {
            config,
            camera: FlyCamera::default(),
            sun,
            planets,
            sun_program,
            planet_program,
            mesh: MeshBuffer::new(&SphereGeometry::default()),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &FlyCamera {
        &self.camera
    }

    pub fn sun(&self) -> &Body {
        &self.sun
    }

    pub fn planets(&self) -> &[Body] {
        &self.planets
    }

    pub fn moon(&self) -> Option<&Body> {
        self.planets.get(EARTH)?.moons().first()
    }

    /// Applies one frame of user input (everything except exit).
    pub fn apply_controls(&mut self, controls: &FrameControls, dt: f32) {
        for &movement in &controls.movement {
            self.camera.process_keyboard(movement, dt);
        }
        if controls.look != (0.0, 0.0) {
            self.camera.process_mouse_movement(controls.look.0, controls.look.1);
        }
        if controls.zoom != 0.0 {
            self.camera.process_mouse_scroll(controls.zoom);
        }

        if controls.sun_rotation_delta != 0.0 {
            self.sun.adjust_rotation_speed(controls.sun_rotation_delta);
        }
        if controls.moon_orbit_delta != 0.0 {
            if let Some(moon) = self.planets.get_mut(EARTH).and_then(|e| e.moon_mut(0)) {
                moon.adjust_orbit_speed(controls.moon_orbit_delta);
            }
        }
    }

    /// Steps the sun, then each planet (which carries its moons).
    pub fn update(&mut self, dt: f32) {
        self.sun.update(dt);
        for planet in &mut self.planets {
            planet.update(dt);
        }
    }

    /// Records the frame's draws: the sun with the sun program, then the
    /// planets and their moons with the lit planet program.
    pub fn render(&mut self, aspect: f32, list: &mut DrawList) {
        let projection = self.camera.projection(aspect);
        let view = self.camera.view_matrix();

        let sun_program = &mut self.sun_program;
        sun_program.use_program(list);
        sun_program.set_mat4("projection", projection);
        sun_program.set_mat4("view", view);
        self.sun.render(sun_program, &self.mesh, view, projection, list);

        let planet_program = &mut self.planet_program;
        planet_program.use_program(list);
        planet_program.set_mat4("projection", projection);
        planet_program.set_mat4("view", view);
        planet_program.set_vec3("light_dir", LIGHT_DIR);
        planet_program.set_vec3("light_color", LIGHT_COLOR);
        planet_program.set_vec3("point_light_pos", POINT_LIGHT_POS);
        planet_program.set_vec3("point_light_color", POINT_LIGHT_COLOR);
        planet_program.set_vec3("view_pos", self.camera.position);
        for planet in &self.planets {
            planet.render(planet_program, &self.mesh, view, projection, list);
        }
    }

    /// GPU-side resources the renderer needs to replay recorded draws.
    pub fn render_resources(&mut self) -> ([&mut ShaderProgram; 2], &mut MeshBuffer) {
        (
            [&mut self.sun_program, &mut self.planet_program],
            &mut self.mesh,
        )
    }
}
