//! Per-frame grouping of entities by shared model.
//!
//! Binding a mesh, its texture and its shading parameters is the expensive
//! part of drawing a model. [`BatchRenderer`] collects a frame's entities
//! into one list per model so that work happens once per model, and only
//! the transform and atlas offset change between draws.

use std::collections::HashMap;

use glam::Mat4;

use crate::entity::Entity;
use crate::model::{ModelId, ModelRegistry, ModelTexture, TexturedModel};

/// Data that varies per drawn instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    pub transform: Mat4,
    pub atlas_offset: [f32; 2],
}

/// Drawing surface the batch renderer talks to.
pub trait EntityBackend {
    /// Make the model's mesh and texture current.
    fn bind_model(&mut self, id: ModelId, model: &TexturedModel);
    fn set_culling(&mut self, enabled: bool);
    /// Load shine damper, reflectivity and fake-lighting flag.
    fn load_material(&mut self, texture: &ModelTexture);
    fn draw_instance(&mut self, instance: &InstanceData);
    fn unbind_model(&mut self);
}

/// What one `render_all` call drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub groups: usize,
    pub instances: usize,
}

/// Entities grouped by model, in first-submission order.
#[derive(Debug, Default)]
pub struct BatchRenderer {
    slots: HashMap<ModelId, usize>,
    batches: Vec<(ModelId, Vec<Entity>)>,
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entity for this frame.
    pub fn submit(&mut self, entity: &Entity) {
        match self.slots.get(&entity.model) {
            Some(&slot) => self.batches[slot].1.push(entity.clone()),
            None => {
                self.slots.insert(entity.model, self.batches.len());
                self.batches.push((entity.model, vec![entity.clone()]));
            }
        }
    }

    pub fn group_count(&self) -> usize {
        self.batches.len()
    }

    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Queued entities for one model, in submission order.
    pub fn batch(&self, model: ModelId) -> Option<&[Entity]> {
        self.slots.get(&model).map(|&slot| self.batches[slot].1.as_slice())
    }

    /// Draw every queued entity, one bind per model, then clear.
    ///
    /// Entities whose model is missing from `models` are dropped with a
    /// warning.
    pub fn render_all<B: EntityBackend>(
        &mut self,
        models: &ModelRegistry,
        backend: &mut B,
    ) -> BatchStats {
        let mut stats = BatchStats::default();

        for (id, entities) in &self.batches {
            let Some(model) = models.get(*id) else {
                log::warn!("Skipping {} entities of unknown model {:?}", entities.len(), id);
                continue;
            };

            backend.bind_model(*id, model);
            if model.texture.has_transparency {
                backend.set_culling(false);
            }
            backend.load_material(&model.texture);

            for entity in entities {
                backend.draw_instance(&InstanceData {
                    transform: entity.transformation(),
                    atlas_offset: model.texture.atlas_offset(entity.texture_index),
                });
            }

            if model.texture.has_transparency {
                backend.set_culling(true);
            }
            backend.unbind_model();

            stats.groups += 1;
            stats.instances += entities.len();
        }

        self.clear();
        stats
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.batches.clear();
    }
}
