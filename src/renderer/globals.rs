//! Per-frame uniform shared by every pass.

use glam::{Mat4, Vec3};

use crate::scene::{Light, MAX_LIGHTS};
use crate::sky::SKY_COLOUR;

/// Fog and ambient settings.
#[derive(Debug, Clone, Copy)]
pub struct LightingConfig {
    pub fog_density: f32,
    pub fog_gradient: f32,
    /// Lowest diffuse brightness, so unlit faces are not black
    pub ambient: f32,
    pub sky_colour: Vec3,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            fog_density: 0.0035,
            fog_gradient: 5.0,
            ambient: 0.2,
            sky_colour: SKY_COLOUR,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct LightRaw {
    position: [f32; 4],
    colour: [f32; 4],
    attenuation: [f32; 4],
}

impl From<&Light> for LightRaw {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.extend(1.0).to_array(),
            colour: light.colour.extend(1.0).to_array(),
            attenuation: light.attenuation.extend(0.0).to_array(),
        }
    }
}

/// Mirrors `Globals` in `common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniforms {
    view_proj: [[f32; 4]; 4],
    sky_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    sky_colour: [f32; 4],
    fog: [f32; 4],
    lights: [LightRaw; MAX_LIGHTS],
}

/// Everything that feeds [`GlobalUniforms`] for one frame.
pub struct FrameGlobals<'a> {
    pub view_proj: Mat4,
    pub sky_view_proj: Mat4,
    pub camera_pos: Vec3,
    pub night_factor: f32,
    pub lights: &'a [Light],
    pub lighting: &'a LightingConfig,
}

impl GlobalUniforms {
    pub fn new(frame: &FrameGlobals<'_>) -> Self {
        let mut lights = [LightRaw::default(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(frame.lights) {
            *slot = light.into();
        }
        let count = frame.lights.len().min(MAX_LIGHTS);
        let l = frame.lighting;

        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            sky_view_proj: frame.sky_view_proj.to_cols_array_2d(),
            camera_pos: frame.camera_pos.extend(1.0).to_array(),
            sky_colour: l.sky_colour.extend(frame.night_factor).to_array(),
            fog: [l.fog_density, l.fog_gradient, l.ambient, count as f32],
            lights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame<'a>(lights: &'a [Light], lighting: &'a LightingConfig) -> FrameGlobals<'a> {
        FrameGlobals {
            view_proj: Mat4::IDENTITY,
            sky_view_proj: Mat4::IDENTITY,
            camera_pos: Vec3::new(1.0, 2.0, 3.0),
            night_factor: 0.25,
            lights,
            lighting,
        }
    }

    #[test]
    fn test_layout_matches_shader() {
        // 2 matrices, 3 vec4s, 4 lights of 3 vec4s
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 2 * 64 + 3 * 16 + 4 * 48);
        assert_eq!(std::mem::size_of::<GlobalUniforms>() % 16, 0);
    }

    #[test]
    fn test_packs_frame_values() {
        let lighting = LightingConfig::default();
        let lights = [Light::sun(Vec3::new(0.0, 100.0, 0.0), Vec3::ONE)];
        let u = GlobalUniforms::new(&frame(&lights, &lighting));

        assert_eq!(u.camera_pos, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.sky_colour, [0.5, 0.6, 0.6, 0.25]);
        assert_eq!(u.fog, [0.0035, 5.0, 0.2, 1.0]);
        assert_eq!(u.lights[0].position, [0.0, 100.0, 0.0, 1.0]);
        assert_eq!(u.lights[0].attenuation, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(u.lights[1].colour, [0.0; 4]);
    }

    #[test]
    fn test_extra_lights_ignored() {
        let lighting = LightingConfig::default();
        let lights = vec![Light::sun(Vec3::Y, Vec3::ONE); MAX_LIGHTS + 2];
        let u = GlobalUniforms::new(&frame(&lights, &lighting));
        assert_eq!(u.fog[3], MAX_LIGHTS as f32);
    }
}
