//! Scene description and load-time assembly.
//!
//! A [`SceneConfig`] names every asset the demo needs. [`Scene::load`]
//! reads the height maps and OBJ meshes, registers the models and scatters
//! their instances over the terrain. Textures are left to the renderer.

use std::path::Path;

use glam::Vec3;
use log::info;
use rand::Rng;
use thiserror::Error;

use crate::entity::{scatter, Area, Entity};
use crate::model::{load_obj, ModelRegistry, ModelTexture, ObjError, TexturedModel};
use crate::sky::Sky;
use crate::terrain::{load_height_map, LoadError, TerrainWorld, TILE_SIZE};

/// Most lights the shaders accept.
pub const MAX_LIGHTS: usize = 4;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    HeightMap(#[from] LoadError),
    #[error("Model {name}: {source}")]
    Model {
        name: String,
        #[source]
        source: ObjError,
    },
    #[error("Scene has no terrain tiles")]
    NoTerrain,
}

/// Point light with distance attenuation `(constant, linear, quadratic)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub colour: Vec3,
    pub attenuation: Vec3,
}

impl Light {
    /// A light that does not fade with distance.
    pub fn sun(position: Vec3, colour: Vec3) -> Self {
        Self {
            position,
            colour,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

/// Flat water quad centred at `(x, z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterTile {
    pub x: f32,
    pub z: f32,
    pub height: f32,
}

impl WaterTile {
    /// Half the side length of every water quad.
    pub const TILE_SIZE: f32 = 360.0;

    pub fn new(x: f32, z: f32, height: f32) -> Self {
        Self { x, z, height }
    }
}

/// One terrain tile and the height map it is built from.
#[derive(Debug, Clone)]
pub struct TileSpec {
    pub grid_x: i32,
    pub grid_z: i32,
    pub height_map: String,
}

/// A model and how many of it to scatter.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub obj_file: String,
    pub texture_file: String,
    pub texture: ModelTexture,
    pub scale: f32,
    pub count: usize,
}

/// Texture files blended over the terrain.
#[derive(Debug, Clone)]
pub struct TerrainTextures {
    pub background: String,
    pub r: String,
    pub g: String,
    pub b: String,
    pub blend_map: String,
}

/// Six cubemap faces in +X, -X, +Y, -Y, +Z, -Z order.
pub type CubeFaces = [String; 6];

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub tiles: Vec<TileSpec>,
    pub models: Vec<ModelSpec>,
    pub terrain_textures: TerrainTextures,
    pub day_sky: CubeFaces,
    pub night_sky: CubeFaces,
    pub lights: Vec<Light>,
    pub water: Vec<WaterTile>,
}

fn png(name: &str) -> String {
    format!("{name}.png")
}

fn faces(prefix: &str, names: [&str; 6]) -> CubeFaces {
    names.map(|n| format!("skybox/{prefix}{n}.png"))
}

impl Default for SceneConfig {
    fn default() -> Self {
        let model = |name: &str, texture: ModelTexture, scale: f32, count: usize| ModelSpec {
            name: name.to_string(),
            obj_file: format!("{name}.obj"),
            texture_file: png(name),
            texture,
            scale,
            count,
        };
        let foliage = ModelTexture {
            has_transparency: true,
            use_fake_lighting: true,
            ..Default::default()
        };

        Self {
            tiles: vec![
                TileSpec {
                    grid_x: 0,
                    grid_z: 0,
                    height_map: png("heightmap"),
                },
                TileSpec {
                    grid_x: 0,
                    grid_z: 1,
                    height_map: png("heightmap"),
                },
            ],
            models: vec![
                model("lowPolyTree", ModelTexture::default(), 3.0, 200),
                model("tree", ModelTexture::default(), 3.0, 500),
                model("grassModel", foliage, 1.0, 500),
                model(
                    "fern",
                    ModelTexture {
                        number_of_rows: 2,
                        ..foliage
                    },
                    1.0,
                    500,
                ),
            ],
            terrain_textures: TerrainTextures {
                background: png("grassy"),
                r: png("mud"),
                g: png("grassFlowers"),
                b: png("path"),
                blend_map: png("blendMap"),
            },
            day_sky: faces("", ["right", "left", "top", "bottom", "back", "front"]),
            night_sky: faces(
                "night",
                ["Right", "Left", "Top", "Bottom", "Back", "Front"],
            ),
            lights: vec![Light::sun(
                Vec3::new(200.0, 500.0, 100.0),
                Vec3::new(1.0, 1.0, 1.0),
            )],
            water: vec![WaterTile::new(400.0, 400.0, -8.0)],
        }
    }
}

/// Everything the frame loop updates and draws.
#[derive(Debug)]
pub struct Scene {
    pub world: TerrainWorld,
    pub models: ModelRegistry,
    pub entities: Vec<Entity>,
    pub lights: Vec<Light>,
    pub water: Vec<WaterTile>,
    pub sky: Sky,
}

impl Scene {
    /// Load terrain and models from `assets` and scatter the entities.
    pub fn load<R: Rng>(
        config: &SceneConfig,
        assets: &Path,
        rng: &mut R,
    ) -> Result<Self, SceneError> {
        let mut world = TerrainWorld::new(TILE_SIZE);
        for tile in &config.tiles {
            let (x, z) = world.tile_origin(tile.grid_x, tile.grid_z);
            let field = load_height_map(assets.join(&tile.height_map), x, z, TILE_SIZE)?;
            world.insert(tile.grid_x, tile.grid_z, field);
        }
        let area = world_area(&world).ok_or(SceneError::NoTerrain)?;

        let mut models = ModelRegistry::new();
        let mut entities = Vec::new();
        for spec in &config.models {
            let mesh = load_obj(assets.join(&spec.obj_file)).map_err(|source| SceneError::Model {
                name: spec.name.clone(),
                source,
            })?;
            let id = models.register(TexturedModel {
                name: spec.name.clone(),
                mesh,
                texture_file: spec.texture_file.clone(),
                texture: spec.texture,
            });

            let cells = spec.texture.number_of_rows.max(1).pow(2);
            let placed = scatter(id, spec.count, area, spec.scale, &world, rng);
            entities.extend(placed.into_iter().map(|e| {
                let index = rng.random_range(0..cells);
                e.with_texture_index(index)
            }));
        }

        let lights: Vec<Light> = config.lights.iter().take(MAX_LIGHTS).copied().collect();
        if config.lights.len() > MAX_LIGHTS {
            log::warn!("Only the first {} of {} lights are used", MAX_LIGHTS, config.lights.len());
        }

        info!(
            "Scene loaded: {} terrain tiles, {} models, {} entities",
            world.len(),
            models.len(),
            entities.len()
        );

        Ok(Self {
            world,
            models,
            entities,
            lights,
            water: config.water.clone(),
            sky: Sky::new(),
        })
    }
}

/// Bounding rectangle of every tile in the world.
fn world_area(world: &TerrainWorld) -> Option<Area> {
    let size = world.tile_size();
    world.tiles().fold(None, |area: Option<Area>, tile| {
        let (x, z) = world.tile_origin(tile.grid_x, tile.grid_z);
        let next = Area {
            min_x: x,
            min_z: z,
            max_x: x + size,
            max_z: z + size,
        };
        Some(match area {
            None => next,
            Some(a) => Area {
                min_x: a.min_x.min(next.min_x),
                min_z: a.min_z.min(next.min_z),
                max_x: a.max_x.max(next.max_x),
                max_z: a.max_z.max(next.max_z),
            },
        })
    })
}
