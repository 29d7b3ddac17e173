//! First-person camera with terrain collision.
//!
//! The camera is either [`Motion::Grounded`] or [`Motion::Airborne`]. Gravity
//! pulls it down every tick and the terrain under it pushes it back up to
//! eye height, at which point it lands.

use glam::{Mat4, Vec3};

use crate::maths::view_matrix;
use crate::terrain::GroundHeight;

/// Tunables for movement and collision.
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    /// Horizontal speed (units per second)
    pub speed: f32,
    /// Vertical acceleration (units per second squared, negative is down)
    pub gravity: f32,
    /// Upward velocity applied by a jump
    pub jump_power: f32,
    /// Eye height above the ground
    pub player_height: f32,
    /// Largest pitch magnitude in degrees
    pub max_pitch: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 30.0,
            gravity: -50.0,
            jump_power: 25.0,
            player_height: 5.0,
            max_pitch: 89.0,
        }
    }
}

/// Logical inputs held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controls {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub ascend: bool,
    pub descend: bool,
    /// Mouse movement since the last tick, in pixels
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Airborne,
    Grounded,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Degrees; positive looks down
    pub pitch: f32,
    /// Degrees; 0 faces -Z
    pub yaw: f32,
    pub roll: f32,
    /// Pixels of mouse travel per degree of yaw
    pub horizontal_sensitivity: f32,
    /// Pixels of mouse travel per degree of pitch
    pub vertical_sensitivity: f32,
    pub config: CameraConfig,
    upward_speed: f32,
    motion: Motion,
}

impl Camera {
    pub fn new() -> Self {
        Self::at(Vec3::new(100.0, 5.0, 500.0))
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            pitch: 5.0,
            yaw: 0.0,
            roll: 0.0,
            horizontal_sensitivity: 10.0,
            vertical_sensitivity: 10.0,
            config: CameraConfig::default(),
            upward_speed: 0.0,
            motion: Motion::Airborne,
        }
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn is_grounded(&self) -> bool {
        self.motion == Motion::Grounded
    }

    pub fn upward_speed(&self) -> f32 {
        self.upward_speed
    }

    /// Advance one tick of `delta` seconds.
    pub fn update(&mut self, controls: &Controls, ground: &impl GroundHeight, delta: f32) {
        self.look(controls.mouse_dx, controls.mouse_dy);
        self.walk(controls, delta);

        if controls.jump && self.is_grounded() {
            self.upward_speed = self.config.jump_power;
            self.motion = Motion::Airborne;
        }

        if controls.ascend || controls.descend {
            let dir = if controls.ascend { 1.0 } else { -1.0 };
            self.position.y += dir * self.config.speed * delta;
            self.upward_speed = 0.0;
            self.motion = Motion::Airborne;
        } else {
            self.upward_speed += self.config.gravity * delta;
            self.position.y += self.upward_speed * delta;
        }

        let terrain_height = ground.height_at(self.position.x, self.position.z);
        let ground_level = terrain_height + self.config.player_height;
        if self.position.y < ground_level {
            self.position.y = ground_level;
            self.upward_speed = 0.0;
            self.motion = Motion::Grounded;
        }
    }

    /// Apply mouse movement to yaw and pitch.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx / self.horizontal_sensitivity;
        let max = self.config.max_pitch;
        self.pitch = (self.pitch - dy / self.vertical_sensitivity).clamp(-max, max);
    }

    fn walk(&mut self, controls: &Controls, delta: f32) {
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        let forward = Vec3::new(sin, 0.0, -cos);
        let right = Vec3::new(cos, 0.0, sin);

        let mut dir = Vec3::ZERO;
        if controls.forward {
            dir += forward;
        }
        if controls.back {
            dir -= forward;
        }
        if controls.right {
            dir += right;
        }
        if controls.left {
            dir -= right;
        }
        self.position += dir * self.config.speed * delta;
    }

    /// Set mouse sensitivity, never below 1.
    pub fn set_sensitivity(&mut self, horizontal: f32, vertical: f32) {
        self.horizontal_sensitivity = horizontal.max(1.0);
        self.vertical_sensitivity = vertical.max(1.0);
    }

    pub fn view_matrix(&self) -> Mat4 {
        view_matrix(self.position, self.pitch, self.yaw)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
