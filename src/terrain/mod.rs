//! Terrain height fields and mesh generation.
//!
//! This module provides:
//! - [`HeightField`] - Immutable height grid for one terrain tile
//! - [`load_height_map`] - Decoder for height-map images
//! - [`TerrainMesh`] - GPU-ready mesh generation
//! - [`TerrainWorld`] - Grid of tiles queried by world position

pub mod loader;
pub mod mesh;
pub mod world;

pub use loader::{load_height_map, LoadError};
pub use mesh::{TerrainMesh, Vertex};
pub use world::TerrainWorld;

use crate::maths::barycentric;
use glam::{Vec2, Vec3};

/// Side length of a terrain tile in world units.
pub const TILE_SIZE: f32 = 800.0;

/// Largest absolute height a height-map sample can produce.
pub const MAX_HEIGHT: f32 = 40.0;

/// Anything that can answer "how high is the ground here".
///
/// Implemented by single tiles and by the tile grid so the camera and
/// entity placement share one query.
pub trait GroundHeight {
    fn height_at(&self, world_x: f32, world_z: f32) -> f32;
}

/// Height grid for one terrain tile.
///
/// The coordinate system uses:
/// - X axis: grid columns
/// - Z axis: grid rows
/// - Y axis: height values
///
/// Heights are stored row-major, so `heights[z * n + x]` is the sample at
/// column `x`, row `z`. The grid never changes after construction.
#[derive(Debug, Clone)]
pub struct HeightField {
    /// World-space X of the tile's first column
    origin_x: f32,
    /// World-space Z of the tile's first row
    origin_z: f32,
    /// Side length of the tile in world units
    size: f32,
    /// Samples per side
    n: usize,
    heights: Vec<f32>,
}

impl HeightField {
    /// Create a tile from a row-major square grid.
    ///
    /// Returns `None` when the grid is not `n * n` or `n < 2`.
    ///
    /// # Example
    ///
    /// ```
    /// use wander::terrain::{GroundHeight, HeightField};
    ///
    /// let field = HeightField::new(0.0, 0.0, 2.0, 3, vec![
    ///     0.0, 0.0, 0.0,
    ///     0.0, 10.0, 0.0,
    ///     0.0, 0.0, 0.0,
    /// ]).unwrap();
    /// assert_eq!(field.height_at(1.0, 1.0), 10.0);
    /// assert_eq!(field.height_at(2.5, 2.5), 0.0);
    /// ```
    pub fn new(
        origin_x: f32,
        origin_z: f32,
        size: f32,
        n: usize,
        heights: Vec<f32>,
    ) -> Option<Self> {
        if n < 2 || heights.len() != n * n {
            return None;
        }
        Some(Self {
            origin_x,
            origin_z,
            size,
            n,
            heights,
        })
    }

    /// Create a tile from rows of heights, indexed as `rows[z][x]`.
    pub fn from_rows(origin_x: f32, origin_z: f32, size: f32, rows: &[Vec<f32>]) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Self::new(origin_x, origin_z, size, n, rows.concat())
    }

    /// Samples per side of the grid.
    pub fn resolution(&self) -> usize {
        self.n
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// World-space origin of the tile as `(x, z)`.
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    /// Stored height at grid column `x`, row `z`.
    ///
    /// Out-of-range indices read as 0, matching how neighbours beyond the
    /// edge are treated during normal generation.
    pub fn grid_height(&self, x: i64, z: i64) -> f32 {
        if x < 0 || z < 0 || x >= self.n as i64 || z >= self.n as i64 {
            return 0.0;
        }
        self.heights[z as usize * self.n + x as usize]
    }

    /// World units between adjacent grid samples.
    pub fn cell_size(&self) -> f32 {
        self.size / (self.n - 1) as f32
    }

    /// Returns the minimum and maximum stored heights.
    pub fn height_bounds(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    /// Whether a world position lies on this tile's `[0, size)` extent.
    pub fn contains(&self, world_x: f32, world_z: f32) -> bool {
        let x = world_x - self.origin_x;
        let z = world_z - self.origin_z;
        (0.0..self.size).contains(&x) && (0.0..self.size).contains(&z)
    }

    /// Interpolated height inside cell `(grid_x, grid_z)` at fractional
    /// position `(fx, fz)`, both in `[0, 1]`.
    fn cell_height(&self, grid_x: i64, grid_z: i64, fx: f32, fz: f32) -> f32 {
        let h = |dx: i64, dz: i64| self.grid_height(grid_x + dx, grid_z + dz);
        let at = Vec2::new(fx, fz);
        if fx <= 1.0 - fz {
            barycentric(
                Vec3::new(0.0, h(0, 0), 0.0),
                Vec3::new(1.0, h(1, 0), 0.0),
                Vec3::new(0.0, h(0, 1), 1.0),
                at,
            )
        } else {
            barycentric(
                Vec3::new(1.0, h(1, 0), 0.0),
                Vec3::new(1.0, h(1, 1), 1.0),
                Vec3::new(0.0, h(0, 1), 1.0),
                at,
            )
        }
    }
}

impl GroundHeight for HeightField {
    /// Continuous terrain height at a world position.
    ///
    /// Returns 0 anywhere off the tile.
    fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let terrain_x = world_x - self.origin_x;
        let terrain_z = world_z - self.origin_z;
        if !(0.0..self.size).contains(&terrain_x) || !(0.0..self.size).contains(&terrain_z) {
            return 0.0;
        }

        let cell = self.cell_size();
        let grid_x = (terrain_x / cell).floor() as i64;
        let grid_z = (terrain_z / cell).floor() as i64;
        let last = self.n as i64 - 2;
        if grid_x < 0 || grid_x > last || grid_z < 0 || grid_z > last {
            return 0.0;
        }

        let fx = (terrain_x - grid_x as f32 * cell) / cell;
        let fz = (terrain_z - grid_z as f32 * cell) / cell;
        self.cell_height(grid_x, grid_z, fx, fz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn bump() -> HeightField {
        HeightField::from_rows(
            0.0,
            0.0,
            2.0,
            &[
                vec![0.0, 0.0, 0.0],
                vec![0.0, 10.0, 0.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap()
    }

    fn ramp(n: usize, size: f32) -> HeightField {
        let heights = (0..n * n).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        HeightField::new(0.0, 0.0, size, n, heights).unwrap()
    }

    #[test]
    fn test_rejects_bad_grids() {
        assert!(HeightField::new(0.0, 0.0, 1.0, 1, vec![0.0]).is_none());
        assert!(HeightField::new(0.0, 0.0, 1.0, 3, vec![0.0; 8]).is_none());
        assert!(HeightField::from_rows(0.0, 0.0, 1.0, &[vec![0.0, 1.0], vec![2.0]]).is_none());
    }

    #[test]
    fn test_center_of_bump() {
        let field = bump();
        assert_eq!(field.height_at(1.0, 1.0), 10.0);
        assert_eq!(field.height_at(2.5, 2.5), 0.0);
    }

    #[test]
    fn test_grid_height_row_major() {
        let field =
            HeightField::from_rows(0.0, 0.0, 1.0, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(field.grid_height(1, 0), 2.0);
        assert_eq!(field.grid_height(0, 1), 3.0);
        assert_eq!(field.grid_height(-1, 0), 0.0);
        assert_eq!(field.grid_height(0, 2), 0.0);
    }

    #[test]
    fn test_corners_match_grid() {
        for n in 2..7 {
            let size = 10.0 * n as f32;
            let field = ramp(n, size);
            let cell = field.cell_size();
            for gz in 0..n - 1 {
                for gx in 0..n - 1 {
                    for (dx, dz) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        let (cx, cz) = (gx + dx, gz + dz);
                        // The far edge sits on the open side of the extent.
                        if cx == n - 1 || cz == n - 1 {
                            continue;
                        }
                        let h = field.height_at(cx as f32 * cell, cz as f32 * cell);
                        let expected = field.grid_height(cx as i64, cz as i64);
                        assert!(
                            (h - expected).abs() < EPS,
                            "n={n} corner ({cx},{cz}): {h} != {expected}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_cell_corners_interpolate_exactly() {
        // Corners reached through the cell's own triangles, including the far edge.
        for n in 2..6 {
            let field = ramp(n, 8.0);
            for gz in 0..n as i64 - 1 {
                for gx in 0..n as i64 - 1 {
                    for (dx, dz) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        let h = field.cell_height(gx, gz, dx as f32, dz as f32);
                        let expected = field.grid_height(gx + dx, gz + dz);
                        assert!((h - expected).abs() < EPS);
                    }
                }
            }
        }
    }

    #[test]
    fn test_outside_extent_is_zero() {
        let field = HeightField::new(0.0, 0.0, 4.0, 3, vec![5.0; 9]).unwrap();
        for (x, z) in [
            (-0.01, 1.0),
            (1.0, -0.01),
            (4.0, 1.0),
            (1.0, 4.0),
            (4.0, 4.0),
            (100.0, -100.0),
        ] {
            assert_eq!(field.height_at(x, z), 0.0, "({x},{z})");
        }
        assert!((field.height_at(3.99, 3.99) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_origin_offsets_query() {
        let field = HeightField::from_rows(
            800.0,
            1600.0,
            2.0,
            &[
                vec![0.0, 0.0, 0.0],
                vec![0.0, 10.0, 0.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        assert_eq!(field.height_at(801.0, 1601.0), 10.0);
        assert_eq!(field.height_at(1.0, 1.0), 0.0);
        assert!(field.contains(800.0, 1600.0));
        assert!(!field.contains(802.0, 1600.0));
    }

    #[test]
    fn test_diagonal_is_continuous() {
        let field = ramp(5, 8.0);
        for gz in 0..4 {
            for gx in 0..4 {
                for step in 0..=10 {
                    let fx = step as f32 / 10.0;
                    let fz = 1.0 - fx;
                    let h = |dx: i64, dz: i64| field.grid_height(gx + dx, gz + dz);
                    let at = Vec2::new(fx, fz);
                    let upper = barycentric(
                        Vec3::new(0.0, h(0, 0), 0.0),
                        Vec3::new(1.0, h(1, 0), 0.0),
                        Vec3::new(0.0, h(0, 1), 1.0),
                        at,
                    );
                    let lower = barycentric(
                        Vec3::new(1.0, h(1, 0), 0.0),
                        Vec3::new(1.0, h(1, 1), 1.0),
                        Vec3::new(0.0, h(0, 1), 1.0),
                        at,
                    );
                    assert!((upper - lower).abs() < EPS, "cell ({gx},{gz}) fx={fx}");
                }
            }
        }
    }

    #[test]
    fn test_height_at_continuous_across_diagonal() {
        let field = ramp(5, 8.0);
        let cell = field.cell_size();
        let offset = 1e-3;
        for gz in 0..4 {
            for gx in 0..4 {
                for step in 1..10 {
                    let fx = step as f32 / 10.0;
                    let fz = 1.0 - fx;
                    let x = (gx as f32 + fx) * cell;
                    let z = (gz as f32 + fz) * cell;
                    // One sample on each side of fx + fz == 1
                    let before = field.height_at(x - offset, z - offset);
                    let after = field.height_at(x + offset, z + offset);
                    assert!(
                        (before - after).abs() < 0.05,
                        "cell ({gx},{gz}) fx={fx}: {before} vs {after}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_triangle_choice_follows_diagonal() {
        // Only the far corner is raised, so the upper-left triangle stays flat
        let field =
            HeightField::from_rows(0.0, 0.0, 1.0, &[vec![0.0, 0.0], vec![0.0, 9.0]]).unwrap();
        assert!(field.height_at(0.45, 0.45).abs() < EPS);
        assert!((field.height_at(0.6, 0.6) - 1.8).abs() < EPS);
    }

    #[test]
    fn test_interpolates_inside_triangle() {
        let field =
            HeightField::from_rows(0.0, 0.0, 1.0, &[vec![0.0, 4.0], vec![8.0, 12.0]]).unwrap();
        // Upper-left triangle: h = 4 * fx + 8 * fz
        assert!((field.height_at(0.25, 0.25) - 3.0).abs() < EPS);
        // Lower-right triangle of a planar grid stays planar
        assert!((field.height_at(0.75, 0.5) - 7.0).abs() < EPS);
    }

    #[test]
    fn test_height_bounds() {
        let field = bump();
        assert_eq!(field.height_bounds(), (0.0, 10.0));
    }
}
