use glam::Mat4;

/// Perspective projection for the walking camera.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Projection {
    pub fn new() -> Self {
        Self {
            fov: 70.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Build perspective projection matrix
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(f32::EPSILON), self.near, self.far)
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self, view: Mat4, aspect: f32) -> Mat4 {
        self.matrix(aspect) * view
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_projection_default() {
        let projection = Projection::new();
        assert_eq!(projection.fov, 70.0);
        assert_eq!(projection.far, 1000.0);
    }

    #[test]
    fn test_depth_maps_to_unit_range() {
        let projection = Projection::new();
        let m = projection.matrix(16.0 / 9.0);

        let near = m * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -1000.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_projection_matrix() {
        let projection = Projection::new();
        let vp = projection.view_projection(Mat4::IDENTITY, 1.0);
        assert!(vp.determinant().abs() > 0.0001);
    }
}
