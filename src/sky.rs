//! Day/night cycle and skybox rotation.

use glam::{Mat4, Vec3};

/// Length of one in-game day in clock units.
pub const DAY_LENGTH: f32 = 24000.0;

/// Clock units that pass per real second.
const TIME_SCALE: f32 = 1000.0;

/// Skybox spin in degrees per second.
const ROTATE_SPEED: f32 = 1.0;

/// Colour the sky fades into at the horizon, also used for fog.
pub const SKY_COLOUR: Vec3 = Vec3::new(0.5, 0.6, 0.6);

/// Fixed times of day that bound the dawn and dusk fades.
const DAWN_START: f32 = 5000.0;
const DAWN_END: f32 = 8000.0;
const DUSK_START: f32 = 21000.0;

/// Clock state for the sky, advanced once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sky {
    time: f32,
    rotation: f32,
}

impl Sky {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at a given time of day.
    pub fn at_time(time: f32) -> Self {
        Self {
            time: time.rem_euclid(DAY_LENGTH),
            rotation: 0.0,
        }
    }

    pub fn advance(&mut self, delta: f32) {
        self.time = (self.time + delta * TIME_SCALE).rem_euclid(DAY_LENGTH);
        self.rotation = (self.rotation + ROTATE_SPEED * delta).rem_euclid(360.0);
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Skybox rotation about Y in degrees.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Weight of the night cubemap: 1 at night, 0 during the day, linear
    /// through dawn and dusk.
    pub fn night_factor(&self) -> f32 {
        let t = self.time;
        if t < DAWN_START {
            1.0
        } else if t < DAWN_END {
            1.0 - (t - DAWN_START) / (DAWN_END - DAWN_START)
        } else if t < DUSK_START {
            0.0
        } else {
            (t - DUSK_START) / (DAY_LENGTH - DUSK_START)
        }
    }

    /// Camera view with translation removed and the sky spin applied.
    pub fn view_matrix(&self, camera_view: Mat4) -> Mat4 {
        let mut view = camera_view;
        view.w_axis.x = 0.0;
        view.w_axis.y = 0.0;
        view.w_axis.z = 0.0;
        view * Mat4::from_rotation_y(self.rotation.to_radians())
    }
}
