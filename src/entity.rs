//! Placed instances of shared models.

use glam::{Mat4, Vec3};
use rand::Rng;

use crate::maths::transformation_matrix;
use crate::model::ModelId;
use crate::terrain::GroundHeight;

/// One instance of a model in the world.
///
/// Rotations are in degrees. The entity only refers to its model; the
/// model's mesh and texture are shared with every other instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub model: ModelId,
    pub position: Vec3,
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
    pub scale: f32,
    /// Cell of the model's texture atlas
    pub texture_index: u32,
}

impl Entity {
    pub fn new(model: ModelId, position: Vec3, scale: f32) -> Self {
        Self {
            model,
            position,
            rot_x: 0.0,
            rot_y: 0.0,
            rot_z: 0.0,
            scale,
            texture_index: 0,
        }
    }

    pub fn with_rotation(mut self, rot_x: f32, rot_y: f32, rot_z: f32) -> Self {
        self.rot_x = rot_x;
        self.rot_y = rot_y;
        self.rot_z = rot_z;
        self
    }

    pub fn with_texture_index(mut self, index: u32) -> Self {
        self.texture_index = index;
        self
    }

    pub fn increase_position(&mut self, dx: f32, dy: f32, dz: f32) {
        self.position += Vec3::new(dx, dy, dz);
    }

    pub fn increase_rotation(&mut self, rx: f32, ry: f32, rz: f32) {
        self.rot_x += rx;
        self.rot_y += ry;
        self.rot_z += rz;
    }

    pub fn transformation(&self) -> Mat4 {
        transformation_matrix(self.position, self.rot_x, self.rot_y, self.rot_z, self.scale)
    }
}

/// Rectangle on the XZ plane used as a scatter area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

/// Place `count` instances of `model` at random points of `area`, each
/// standing on the ground.
pub fn scatter<R: Rng>(
    model: ModelId,
    count: usize,
    area: Area,
    scale: f32,
    ground: &impl GroundHeight,
    rng: &mut R,
) -> Vec<Entity> {
    (0..count)
        .map(|_| {
            let x = rng.random_range(area.min_x..area.max_x);
            let z = rng.random_range(area.min_z..area.max_z);
            let y = ground.height_at(x, z);
            Entity::new(model, Vec3::new(x, y, z), scale)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::HeightField;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_increments() {
        let mut e = Entity::new(ModelId(0), Vec3::ZERO, 1.0);
        e.increase_position(1.0, 2.0, 3.0);
        e.increase_rotation(0.0, 90.0, 0.0);
        e.increase_rotation(0.0, 90.0, 10.0);

        assert_eq!(e.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!((e.rot_x, e.rot_y, e.rot_z), (0.0, 180.0, 10.0));
    }

    #[test]
    fn test_transformation_places_origin() {
        let e = Entity::new(ModelId(0), Vec3::new(4.0, 5.0, 6.0), 3.0)
            .with_rotation(10.0, 20.0, 30.0);
        let p = e.transformation().transform_point3(Vec3::ZERO);
        assert!((p - e.position).length() < 1e-5);
    }

    #[test]
    fn test_scatter_stands_on_ground() {
        let heights = (0..25).map(|i| (i % 7) as f32 * 3.0).collect();
        let field = HeightField::new(0.0, 0.0, 40.0, 5, heights).unwrap();
        let area = Area {
            min_x: 0.0,
            min_z: 0.0,
            max_x: 40.0,
            max_z: 40.0,
        };
        let mut rng = StdRng::seed_from_u64(7);

        let placed = scatter(ModelId(2), 50, area, 1.5, &field, &mut rng);

        assert_eq!(placed.len(), 50);
        for e in &placed {
            assert_eq!(e.model, ModelId(2));
            assert_eq!(e.scale, 1.5);
            assert_eq!(e.position.y, field.height_at(e.position.x, e.position.z));
        }
    }

    #[test]
    fn test_scatter_is_seeded() {
        let field = HeightField::new(0.0, 0.0, 10.0, 2, vec![1.0; 4]).unwrap();
        let area = Area {
            min_x: 0.0,
            min_z: 0.0,
            max_x: 10.0,
            max_z: 10.0,
        };
        let a = scatter(ModelId(0), 5, area, 1.0, &field, &mut StdRng::seed_from_u64(1));
        let b = scatter(ModelId(0), 5, area, 1.0, &field, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
