use std::path::Path;

use glam::{Mat4, Vec3};

use orrery_engine::render::{DrawList, MeshBuffer, ShaderProgram, TextureHandle, TextureStore};

/// Texture unit every body samples from.
pub const BODY_TEXTURE_UNIT: u32 = 0;

/// Sampler uniform name shared by the sun and planet programs.
pub const BODY_TEXTURE_UNIFORM: &str = "texture1";

/// Orbital and rotational parameters of a body.
///
/// Speeds are in degrees per second.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyParams {
    pub orbit_radius: f32,
    pub orbit_speed: f32,
    pub rotation_speed: f32,
    pub scale: f32,
}

impl BodyParams {
    pub const fn new(orbit_radius: f32, orbit_speed: f32, rotation_speed: f32, scale: f32) -> Self {
        Self {
            orbit_radius,
            orbit_speed,
            rotation_speed,
            scale,
        }
    }
}

/// A sun, planet or moon.
///
/// Orbits are circles in the XZ plane around the origin (or, for a moon,
/// around its parent's current position). Bodies own their moons and their
/// texture.
#[derive(Debug)]
pub struct Body {
    position: Vec3,
    orbit_radius: f32,
    orbit_speed: f32,
    rotation_speed: f32,
    scale: f32,
    orbit_angle: f32,
    rotation_angle: f32,

    // Field order is drop order: moons release their textures before ours.
    moons: Vec<Body>,
    texture: Option<TextureHandle>,
}

impl Body {
    pub fn new(params: BodyParams, texture: Option<TextureHandle>) -> Self {
        Self {
            position: Vec3::new(params.orbit_radius, 0.0, 0.0),
            orbit_radius: params.orbit_radius,
            orbit_speed: params.orbit_speed,
            rotation_speed: params.rotation_speed,
            scale: params.scale,
            orbit_angle: 0.0,
            rotation_angle: 0.0,
            moons: Vec::new(),
            texture: None,
        }
        .with_texture(texture)
    }

    /// Creates a body textured with the image at `path`.
    ///
    /// A texture that fails to load leaves the body blank.
    pub fn load(params: BodyParams, path: impl AsRef<Path>, textures: &mut TextureStore) -> Self {
        let path = path.as_ref();
        let texture = match textures.load(path) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("body texture unavailable, drawing blank: {e}");
                None
            }
        };
        Self::new(params, texture)
    }

    fn with_texture(mut self, texture: Option<TextureHandle>) -> Self {
        self.texture = texture;
        self
    }

    /// Sets both angles (degrees) and recomputes the orbital position.
    pub fn with_angles(mut self, orbit_angle: f32, rotation_angle: f32) -> Self {
        self.orbit_angle = orbit_angle;
        self.rotation_angle = rotation_angle;
        let offset = orbit_offset(self.orbit_radius, self.orbit_angle);
        self.position.x = offset.x;
        self.position.z = offset.z;
        self
    }

    /// Advances both angles by `dt` seconds and moves the body along its
    /// orbit, then carries the moons along with it.
    ///
    /// Moons are stepped here and positioned relative to this body's new
    /// position; their own `update` is not called.
    pub fn update(&mut self, dt: f32) {
        self.orbit_angle = advance_angle(self.orbit_angle, self.orbit_speed, dt);
        self.rotation_angle = advance_angle(self.rotation_angle, self.rotation_speed, dt);

        let offset = orbit_offset(self.orbit_radius, self.orbit_angle);
        self.position.x = offset.x;
        self.position.z = offset.z;

        let center = self.position;
        for moon in &mut self.moons {
            moon.rotation_angle = advance_angle(moon.rotation_angle, moon.rotation_speed, dt);
            moon.orbit_angle = advance_angle(moon.orbit_angle, moon.orbit_speed, dt);
            moon.position = center + orbit_offset(moon.orbit_radius, moon.orbit_angle);
        }
    }

    /// `translate(position) · rotate_y(rotation) · scale`.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(self.rotation_angle.to_radians())
            * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Records this body and then its moons with `program` and `mesh`.
    pub fn render(
        &self,
        program: &mut ShaderProgram,
        mesh: &MeshBuffer,
        view: Mat4,
        projection: Mat4,
        list: &mut DrawList,
    ) {
        program.use_program(list);
        program.set_mat4("model", self.model_matrix());
        program.set_mat4("view", view);
        program.set_mat4("projection", projection);

        list.bind_texture(BODY_TEXTURE_UNIT, self.texture.as_ref().map(TextureHandle::id));
        program.set_int(BODY_TEXTURE_UNIFORM, BODY_TEXTURE_UNIT as i32);

        mesh.draw(program, list);

        for moon in &self.moons {
            moon.render(program, mesh, view, projection, list);
        }
    }

    /// Adds `delta` to the rotation speed, never going below zero.
    pub fn adjust_rotation_speed(&mut self, delta: f32) {
        self.rotation_speed = (self.rotation_speed + delta).max(0.0);
    }

    /// Adds `delta` to the orbit speed, never going below zero.
    pub fn adjust_orbit_speed(&mut self, delta: f32) {
        self.orbit_speed = (self.orbit_speed + delta).max(0.0);
    }

    pub fn add_moon(&mut self, moon: Body) {
        self.moons.push(moon);
    }

    pub fn moons(&self) -> &[Body] {
        &self.moons
    }

    pub fn moon_mut(&mut self, index: usize) -> Option<&mut Body> {
        self.moons.get_mut(index)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orbit_radius(&self) -> f32 {
        self.orbit_radius
    }

    pub fn orbit_speed(&self) -> f32 {
        self.orbit_speed
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn orbit_angle(&self) -> f32 {
        self.orbit_angle
    }

    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }
}

/// Adds `speed · dt` degrees and subtracts 360 once if the result passed it.
///
/// Large steps can leave the angle above 360.
fn advance_angle(angle: f32, speed: f32, dt: f32) -> f32 {
    let next = angle + speed * dt;
    if next > 360.0 { next - 360.0 } else { next }
}

fn orbit_offset(radius: f32, angle_deg: f32) -> Vec3 {
    let theta = angle_deg.to_radians();
    Vec3::new(radius * theta.cos(), 0.0, radius * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_engine::geometry::SphereGeometry;
    use orrery_engine::render::TexturePixels;

    use crate::shaders;

    const EPS: f32 = 1e-4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn approx_v(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    fn params(r: f32, orbit: f32, rot: f32, scale: f32) -> BodyParams {
        BodyParams::new(r, orbit, rot, scale)
    }

    #[test]
    fn new_body_starts_on_the_x_axis() {
        let b = Body::new(params(15.0, 47.0, 20.0, 1.0), None);
        assert_eq!(b.position(), Vec3::new(15.0, 0.0, 0.0));
        assert_eq!(b.orbit_angle(), 0.0);
        assert_eq!(b.rotation_angle(), 0.0);
        assert!(!b.has_texture());
    }

    #[test]
    fn update_advances_angles_and_orbits() {
        let mut b = Body::new(params(30.0, 30.0, 25.0, 2.0), None);
        b.update(1.0);

        assert!(approx(b.orbit_angle(), 30.0));
        assert!(approx(b.rotation_angle(), 25.0));
        let theta = 30f32.to_radians();
        assert!(approx_v(b.position(), Vec3::new(30.0 * theta.cos(), 0.0, 30.0 * theta.sin())));
    }

    #[test]
    fn angle_wraps_once_per_update() {
        let mut b = Body::new(params(1.0, 100.0, 90.0, 1.0), None);
        for _ in 0..4 {
            b.update(1.0);
        }
        // Orbit: 400 -> 40 on the fourth step. Rotation reaches 360 and stays.
        assert!(approx(b.orbit_angle(), 40.0));
        assert!(approx(b.rotation_angle(), 360.0));
        b.update(1.0);
        assert!(approx(b.rotation_angle(), 90.0));

        // A single step past two full turns is only reduced once.
        let mut fast = Body::new(params(1.0, 800.0, 750.0, 1.0), None);
        fast.update(1.0);
        assert!(approx(fast.orbit_angle(), 440.0));
        assert!(approx(fast.rotation_angle(), 390.0));
    }

    #[test]
    fn exactly_360_is_not_wrapped() {
        let mut b = Body::new(params(1.0, 360.0, 360.0, 1.0), None);
        b.update(1.0);
        assert!(approx(b.orbit_angle(), 360.0));
        assert!(approx(b.rotation_angle(), 360.0));
    }

    #[test]
    fn moon_angles_wrap_once_through_the_parent() {
        let mut planet = Body::new(params(10.0, 0.0, 0.0, 1.0), None);
        planet.add_moon(Body::new(params(2.0, 800.0, 500.0, 0.5), None));

        planet.update(1.0);
        let moon = &planet.moons()[0];
        assert!(approx(moon.orbit_angle(), 440.0));
        assert!(approx(moon.rotation_angle(), 140.0));

        planet.update(1.0);
        let moon = &planet.moons()[0];
        // 440 + 800 = 1240, reduced once.
        assert!(approx(moon.orbit_angle(), 880.0));
        assert!(approx(moon.rotation_angle(), 280.0));
    }

    #[test]
    fn update_leaves_y_untouched() {
        let mut b = Body::new(params(10.0, 10.0, 0.0, 1.0), None);
        b.position.y = 3.0;
        b.update(0.5);
        assert_eq!(b.position().y, 3.0);
    }

    #[test]
    fn moon_follows_parent_current_position() {
        let mut earth = Body::new(params(30.0, 0.0, 0.0, 2.0), None);
        let moon = Body::new(params(3.0, 0.0, 0.0, 0.5), None).with_angles(90.0, 0.0);
        earth.add_moon(moon);

        earth.update(0.0);

        let moon = &earth.moons()[0];
        assert!(approx_v(moon.position(), earth.position() + Vec3::new(0.0, 0.0, 3.0)));
    }

    #[test]
    fn moons_are_stepped_by_the_parent() {
        let mut earth = Body::new(params(30.0, 30.0, 25.0, 2.0), None);
        earth.add_moon(Body::new(params(5.0, 80.0, 15.0, 0.5), None));

        earth.update(0.5);

        let moon = &earth.moons()[0];
        assert!(approx(moon.orbit_angle(), 40.0));
        assert!(approx(moon.rotation_angle(), 7.5));
        let theta = 40f32.to_radians();
        let expected = earth.position() + Vec3::new(5.0 * theta.cos(), 0.0, 5.0 * theta.sin());
        assert!(approx_v(moon.position(), expected));
    }

    #[test]
    fn grandchild_moons_are_not_stepped() {
        let mut planet = Body::new(params(10.0, 10.0, 0.0, 1.0), None);
        let mut moon = Body::new(params(2.0, 10.0, 0.0, 0.5), None);
        moon.add_moon(Body::new(params(1.0, 50.0, 0.0, 0.1), None));
        planet.add_moon(moon);

        planet.update(1.0);

        let grandchild = &planet.moons()[0].moons()[0];
        assert_eq!(grandchild.orbit_angle(), 0.0);
    }

    #[test]
    fn speed_adjustments_clamp_at_zero() {
        let mut b = Body::new(params(5.0, 0.05, 0.05, 1.0), None);
        b.adjust_orbit_speed(-1.0);
        b.adjust_rotation_speed(-1.0);
        assert_eq!(b.orbit_speed(), 0.0);
        assert_eq!(b.rotation_speed(), 0.0);

        b.adjust_rotation_speed(0.1);
        assert!(approx(b.rotation_speed(), 0.1));
    }

    #[test]
    fn model_matrix_translates_rotates_and_scales() {
        let mut b = Body::new(params(10.0, 0.0, 0.0, 2.0), None).with_angles(0.0, 90.0);
        b.position = Vec3::new(10.0, 0.0, 0.0);

        let p = b.model_matrix().transform_point3(Vec3::X);
        assert!(approx_v(p, Vec3::new(10.0, 0.0, -2.0)));
    }

    #[test]
    fn load_with_missing_texture_gives_blank_body() {
        let mut store = TextureStore::new();
        let b = Body::load(params(1.0, 1.0, 1.0, 1.0), "/nonexistent/marsmap1k.jpg", &mut store);
        assert!(!b.has_texture());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn dropping_a_body_releases_every_texture_once() {
        let mut store = TextureStore::new();
        let tex = |store: &mut TextureStore| Some(store.insert("t", TexturePixels::solid([9; 4])));

        let mut earth = Body::new(params(30.0, 30.0, 25.0, 2.0), tex(&mut store));
        earth.add_moon(Body::new(params(5.0, 80.0, 15.0, 0.5), tex(&mut store)));
        earth.add_moon(Body::new(params(8.0, 40.0, 15.0, 0.3), tex(&mut store)));
        assert_eq!(store.live_count(), 3);

        drop(earth);

        assert_eq!(store.collect_released(), 3);
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.collect_released(), 0);
    }

    #[test]
    fn render_records_body_then_moons() {
        let mut store = TextureStore::new();
        let mesh = MeshBuffer::new(&SphereGeometry::default());
        let mut program = ShaderProgram::from_sources("planet", shaders::PLANET_VERT, shaders::PLANET_FRAG);
        assert!(program.is_usable());

        let earth_tex = store.insert("earth", TexturePixels::solid([0, 0, 255, 255]));
        let earth_id = earth_tex.id();
        let mut earth = Body::new(params(30.0, 0.0, 0.0, 2.0), Some(earth_tex));
        earth.add_moon(Body::new(params(5.0, 0.0, 0.0, 0.5), None));
        earth.update(0.0);

        let mut list = DrawList::new();
        earth.render(&mut program, &mesh, Mat4::IDENTITY, Mat4::IDENTITY, &mut list);

        let cmds: Vec<_> = list.iter().collect();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].texture, Some(earth_id));
        assert_eq!(cmds[1].texture, None);

        let model_offset = program.uniforms().and_then(|u| u.layout().member("model")).map(|m| m.offset);
        let model_offset = model_offset.expect("planet program declares model") as usize;
        let model = orrery_engine::render::shader::read_mat4(&cmds[0].uniforms, model_offset);
        assert_eq!(model, Some(earth.model_matrix()));
        let moon_model = orrery_engine::render::shader::read_mat4(&cmds[1].uniforms, model_offset);
        assert_eq!(moon_model, Some(earth.moons()[0].model_matrix()));
    }
}
