//! A small first-person terrain walker.
//!
//! Height-mapped terrain tiles, scattered models drawn in per-model
//! batches, a camera that walks on the ground under gravity, and a skybox
//! that cycles between day and night.

pub mod batch;
pub mod camera;
pub mod entity;
pub mod frame;
pub mod input;
pub mod maths;
pub mod model;
pub mod renderer;
pub mod scene;
pub mod sky;
pub mod terrain;
pub mod ui;
