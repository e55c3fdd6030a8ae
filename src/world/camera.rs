//! Free-fly camera
//!
//! `dir` is the camera's *backward* axis (the view looks down `-dir`), so
//! moving forward subtracts it from the eye.

use crate::rasterizer::{radians, Mat4, Vec3};

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub dir: Vec3,
    pub up: Vec3,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub yaw: f64,
    /// Units per millisecond
    pub speed: f64,
    /// Degrees per unit of mouse offset
    pub sensitivity: f64,
    pub view: Mat4,
}

impl Camera {
    pub fn new(eye: Vec3, dir: Vec3, up: Vec3) -> Self {
        let mut cam = Self {
            eye,
            dir: dir.normalize(),
            up: up.normalize(),
            pitch: 0.0,
            yaw: 90.0,
            speed: 0.01,
            sensitivity: 0.25,
            view: Mat4::IDENTITY,
        };
        cam.update_view();
        cam
    }

    pub fn update_view(&mut self) {
        self.view = Mat4::look(self.eye, self.dir, self.up);
    }

    fn right(&self) -> Vec3 {
        self.up.cross(self.dir).normalize()
    }

    pub fn move_forward(&mut self, dt: f64) {
        self.eye = self.eye - self.dir * (dt * self.speed);
    }

    pub fn move_back(&mut self, dt: f64) {
        self.eye += self.dir * (dt * self.speed);
    }

    pub fn move_left(&mut self, dt: f64) {
        self.eye = self.eye - self.right() * (dt * self.speed);
    }

    pub fn move_right(&mut self, dt: f64) {
        self.eye += self.right() * (dt * self.speed);
    }

    /// Apply a mouse offset. Pitch is clamped to +-89 degrees.
    pub fn rotate(&mut self, offset_x: f64, offset_y: f64) {
        if offset_x == 0.0 && offset_y == 0.0 {
            return;
        }
        self.yaw += offset_x * self.sensitivity;
        self.pitch = (self.pitch + offset_y * self.sensitivity).clamp(-89.0, 89.0);

        let (p, y) = (radians(self.pitch), radians(self.yaw));
        self.dir = Vec3::new(p.cos() * y.cos(), p.sin(), p.cos() * y.sin()).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), Vec3::UP)
    }
}
