//! Matrix and interpolation helpers shared by the terrain and renderers.

use glam::{Mat4, Vec2, Vec3};

/// Height at `pos` inside the triangle `p1, p2, p3`.
///
/// The triangle's corners carry `(x, height, z)`; weights come from its
/// projection onto the XZ plane and are applied to the heights.
pub fn barycentric(p1: Vec3, p2: Vec3, p3: Vec3, pos: Vec2) -> f32 {
    let det = (p2.z - p3.z) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.z - p3.z);
    let l1 = ((p2.z - p3.z) * (pos.x - p3.x) + (p3.x - p2.x) * (pos.y - p3.z)) / det;
    let l2 = ((p3.z - p1.z) * (pos.x - p3.x) + (p1.x - p3.x) * (pos.y - p3.z)) / det;
    let l3 = 1.0 - l1 - l2;
    l1 * p1.y + l2 * p2.y + l3 * p3.y
}

/// Model matrix: translate, then rotate about X, Y, Z (degrees), then scale.
pub fn transformation_matrix(translation: Vec3, rx: f32, ry: f32, rz: f32, scale: f32) -> Mat4 {
    Mat4::from_translation(translation)
        * Mat4::from_rotation_x(rx.to_radians())
        * Mat4::from_rotation_y(ry.to_radians())
        * Mat4::from_rotation_z(rz.to_radians())
        * Mat4::from_scale(Vec3::splat(scale))
}

/// First-person view matrix from pitch and yaw in degrees.
pub fn view_matrix(position: Vec3, pitch: f32, yaw: f32) -> Mat4 {
    Mat4::from_rotation_x(pitch.to_radians())
        * Mat4::from_rotation_y(yaw.to_radians())
        * Mat4::from_translation(-position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barycentric_corners() {
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(1.0, 2.0, 0.0);
        let c = Vec3::new(0.0, 3.0, 1.0);
        assert!((barycentric(a, b, c, Vec2::new(0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert!((barycentric(a, b, c, Vec2::new(1.0, 0.0)) - 2.0).abs() < 1e-6);
        assert!((barycentric(a, b, c, Vec2::new(0.0, 1.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_barycentric_centroid() {
        let a = Vec3::new(0.0, 3.0, 0.0);
        let b = Vec3::new(1.0, 6.0, 0.0);
        let c = Vec3::new(0.0, 9.0, 1.0);
        let centroid = Vec2::new(1.0 / 3.0, 1.0 / 3.0);
        assert!((barycentric(a, b, c, centroid) - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_transformation_translates_origin() {
        let m = transformation_matrix(Vec3::new(1.0, 2.0, 3.0), 0.0, 90.0, 0.0, 2.0);
        let p = m.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);

        // Scale then a quarter turn about Y maps +X to -Z
        let q = m.transform_point3(Vec3::X);
        assert!((q - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_view_moves_camera_to_origin() {
        let eye = Vec3::new(10.0, 5.0, -3.0);
        let view = view_matrix(eye, 30.0, 45.0);
        assert!(view.transform_point3(eye).length() < 1e-4);
    }

    #[test]
    fn test_view_zero_angles_looks_down_negative_z() {
        let view = view_matrix(Vec3::ZERO, 0.0, 0.0);
        let ahead = view.transform_point3(Vec3::new(0.0, 0.0, -5.0));
        assert!((ahead - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-6);
    }
}
