//! Frame timing.
//!
//! The delta between frames is measured once per loop iteration and handed
//! to every system that scales with time, so tests can drive them with a
//! fixed step instead of a wall clock.

use std::time::{Duration, Instant};

/// Monotonic frame clock with a target frame rate.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    frame_budget: Duration,
    /// Frames counted since `fps_window_start`
    frame_count: u32,
    fps_window_start: Instant,
    fps: f32,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            frame_budget: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
            frame_count: 0,
            fps_window_start: now,
            fps: 0.0,
        }
    }

    /// Close the current frame and return its length in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_count += 1;
        let window = now.duration_since(self.fps_window_start).as_secs_f32();
        if window >= 1.0 {
            self.fps = self.frame_count as f32 / window;
            self.frame_count = 0;
            self.fps_window_start = now;
        }
        delta
    }

    /// When the next frame should start to hold the target rate.
    pub fn next_deadline(&self) -> Instant {
        self.last_frame + self.frame_budget
    }

    /// Frames per second averaged over the last full second.
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Per-frame values shared by update and render calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Seconds since the previous frame
    pub delta: f32,
}

impl FrameContext {
    pub fn new(delta: f32) -> Self {
        Self { delta }
    }
}
