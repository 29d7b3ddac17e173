//! Terrain tiles laid out on an integer grid.

use super::{GroundHeight, HeightField};

/// A placed tile and its grid coordinates.
#[derive(Debug, Clone)]
pub struct Tile {
    pub grid_x: i32,
    pub grid_z: i32,
    pub field: HeightField,
}

/// All terrain tiles in the world, each `tile_size` units on a side.
#[derive(Debug, Clone)]
pub struct TerrainWorld {
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl TerrainWorld {
    pub fn new(tile_size: f32) -> Self {
        Self {
            tile_size,
            tiles: Vec::new(),
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Add a tile at grid cell `(grid_x, grid_z)`, replacing any tile
    /// already there.
    ///
    /// The field's origin should be `(grid_x, grid_z) * tile_size`; use
    /// [`TerrainWorld::tile_origin`] when building it.
    pub fn insert(&mut self, grid_x: i32, grid_z: i32, field: HeightField) {
        self.tiles.retain(|t| (t.grid_x, t.grid_z) != (grid_x, grid_z));
        self.tiles.push(Tile {
            grid_x,
            grid_z,
            field,
        });
    }

    /// World-space origin of grid cell `(grid_x, grid_z)`.
    pub fn tile_origin(&self, grid_x: i32, grid_z: i32) -> (f32, f32) {
        (grid_x as f32 * self.tile_size, grid_z as f32 * self.tile_size)
    }

    /// Grid cell containing a world position.
    pub fn grid_cell(&self, world_x: f32, world_z: f32) -> (i32, i32) {
        (
            (world_x / self.tile_size).floor() as i32,
            (world_z / self.tile_size).floor() as i32,
        )
    }

    /// Tile under a world position, if one exists.
    pub fn tile_at(&self, world_x: f32, world_z: f32) -> Option<&HeightField> {
        let cell = self.grid_cell(world_x, world_z);
        self.tiles
            .iter()
            .find(|t| (t.grid_x, t.grid_z) == cell)
            .map(|t| &t.field)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl GroundHeight for TerrainWorld {
    fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        self.tile_at(world_x, world_z)
            .map_or(0.0, |tile| tile.height_at(world_x, world_z))
    }
}
