//! Free-fly camera: yaw/pitch look, planar movement along the view axes,
//! field-of-view zoom.

use glam::{Mat4, Vec3};

/// Direction of a keyboard camera move.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Degrees; -90 looks down -Z.
    pub yaw: f32,
    /// Degrees, clamped to ±`PITCH_LIMIT`.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
    /// Units per second.
    pub speed: f32,
    /// Degrees per pointer pixel.
    pub sensitivity: f32,

    front: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 10.0, 30.0))
    }
}

impl FlyCamera {
    pub const WORLD_UP: Vec3 = Vec3::Y;
    pub const PITCH_LIMIT: f32 = 89.0;
    pub const ZOOM_MIN: f32 = 1.0;
    pub const ZOOM_MAX: f32 = 45.0;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 1000.0;

    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            yaw: -90.0,
            pitch: 0.0,
            zoom: Self::ZOOM_MAX,
            speed: 2.5,
            sensitivity: 0.1,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection with a 0..1 depth range.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect.max(1e-3), Self::NEAR, Self::FAR)
    }

    pub fn process_keyboard(&mut self, movement: CameraMovement, dt: f32) {
        let step = self.speed * dt;
        match movement {
            CameraMovement::Forward => self.position += self.front * step,
            CameraMovement::Backward => self.position -= self.front * step,
            CameraMovement::Left => self.position -= self.right * step,
            CameraMovement::Right => self.position += self.right * step,
        }
    }

    /// `dy` is positive when the pointer moves up.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.update_vectors();
    }

    /// Scrolling up narrows the field of view.
    pub fn process_mouse_scroll(&mut self, lines: f32) {
        self.zoom = (self.zoom - lines).clamp(Self::ZOOM_MIN, Self::ZOOM_MAX);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(Self::WORLD_UP).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
