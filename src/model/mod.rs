//! Static models shared by many entities.
//!
//! A model is a mesh plus a [`ModelTexture`] describing how it is shaded.
//! Models live in a [`ModelRegistry`] and are referenced by [`ModelId`],
//! so any number of entities can point at the same GPU resources.

pub mod obj;

pub use obj::{load_obj, parse_obj, ObjError};

use crate::terrain::Vertex;

/// CPU-side mesh before upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Per-model shading parameters, fixed for every instance of the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTexture {
    /// Specular exponent
    pub shine_damper: f32,
    /// Specular strength (0 disables highlights)
    pub reflectivity: f32,
    /// Texture has cut-out alpha; drawn without backface culling
    pub has_transparency: bool,
    /// Light as if every normal points straight up (grass, ferns)
    pub use_fake_lighting: bool,
    /// Atlas cells per side; 1 for a plain texture
    pub number_of_rows: u32,
}

impl Default for ModelTexture {
    fn default() -> Self {
        Self {
            shine_damper: 1.0,
            reflectivity: 0.0,
            has_transparency: false,
            use_fake_lighting: false,
            number_of_rows: 1,
        }
    }
}

impl ModelTexture {
    /// Texture-space offset of atlas cell `index`, as `(column, row)` fractions.
    pub fn atlas_offset(&self, index: u32) -> [f32; 2] {
        let rows = self.number_of_rows.max(1);
        let column = index % rows;
        let row = index / rows;
        [column as f32 / rows as f32, row as f32 / rows as f32]
    }
}

/// Identity of a registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// A mesh paired with its texture file and shading parameters.
#[derive(Debug, Clone)]
pub struct TexturedModel {
    pub name: String,
    pub mesh: MeshData,
    /// Texture file name, relative to the asset directory
    pub texture_file: String,
    pub texture: ModelTexture,
}

/// All models known to the scene, indexed by [`ModelId`].
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<TexturedModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: TexturedModel) -> ModelId {
        self.models.push(model);
        ModelId(self.models.len() - 1)
    }

    pub fn get(&self, id: ModelId) -> Option<&TexturedModel> {
        self.models.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &TexturedModel)> {
        self.models.iter().enumerate().map(|(i, m)| (ModelId(i), m))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> TexturedModel {
        TexturedModel {
            name: name.to_string(),
            mesh: MeshData::default(),
            texture_file: format!("{name}.png"),
            texture: ModelTexture::default(),
        }
    }

    #[test]
    fn test_atlas_offsets() {
        let texture = ModelTexture {
            number_of_rows: 2,
            ..Default::default()
        };
        assert_eq!(texture.atlas_offset(0), [0.0, 0.0]);
        assert_eq!(texture.atlas_offset(1), [0.5, 0.0]);
        assert_eq!(texture.atlas_offset(2), [0.0, 0.5]);
        assert_eq!(texture.atlas_offset(3), [0.5, 0.5]);
    }

    #[test]
    fn test_degenerate_atlases() {
        let texture = ModelTexture::default();
        assert_eq!(texture.atlas_offset(5), [0.0, 5.0]);
        let zero_rows = ModelTexture {
            number_of_rows: 0,
            ..Default::default()
        };
        assert_eq!(zero_rows.atlas_offset(0), [0.0, 0.0]);
    }

    #[test]
    fn test_registry_ids() {
        let mut registry = ModelRegistry::new();
        let tree = registry.register(model("tree"));
        let fern = registry.register(model("fern"));

        assert_ne!(tree, fern);
        assert_eq!(registry.get(fern).unwrap().name, "fern");
        assert!(registry.get(ModelId(9)).is_none());
        assert_eq!(registry.iter().count(), 2);
    }
}
