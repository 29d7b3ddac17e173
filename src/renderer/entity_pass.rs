//! Instanced drawing of textured models.
//!
//! [`EntityPass`] is the GPU side of the batch renderer. While
//! [`BatchRenderer::render_all`](crate::batch::BatchRenderer::render_all)
//! walks its groups, the pass records one draw group per model together
//! with its instances and material. `prepare` uploads what was recorded and
//! `draw` replays it as one instanced draw per model.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use log::debug;

use super::loader::{GpuLoader, GpuMesh};
use super::program::{
    create_sampler, sampler_entry, texture_entry, uniform_entry, PipelineOptions, RenderError,
    ShaderProgram,
};
use crate::batch::{EntityBackend, InstanceData};
use crate::model::{ModelId, ModelRegistry, ModelTexture, TexturedModel};
use crate::terrain::Vertex;

/// Mirrors `InstanceInput` in `entity.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    atlas_offset: [f32; 2],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x2,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&InstanceData> for InstanceRaw {
    fn from(instance: &InstanceData) -> Self {
        Self {
            model: instance.transform.to_cols_array_2d(),
            atlas_offset: instance.atlas_offset,
        }
    }
}

/// Mirrors `Material` in `entity.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    shine_damper: f32,
    reflectivity: f32,
    fake_lighting: f32,
    number_of_rows: f32,
}

impl From<&ModelTexture> for MaterialUniform {
    fn from(texture: &ModelTexture) -> Self {
        Self {
            shine_damper: texture.shine_damper,
            reflectivity: texture.reflectivity,
            fake_lighting: if texture.use_fake_lighting { 1.0 } else { 0.0 },
            number_of_rows: texture.number_of_rows.max(1) as f32,
        }
    }
}

/// One model's worth of instances, recorded between bind and unbind.
#[derive(Debug, Clone, PartialEq)]
struct DrawGroup {
    model: ModelId,
    culled: bool,
    material: u32,
    instances: Range<u32>,
}

/// CPU-side record of a frame's entity draws.
#[derive(Debug, Default)]
struct DrawList {
    instances: Vec<InstanceRaw>,
    materials: Vec<MaterialUniform>,
    groups: Vec<DrawGroup>,
    current: Option<DrawGroup>,
    culling: bool,
}

impl DrawList {
    fn new() -> Self {
        Self {
            culling: true,
            ..Default::default()
        }
    }

    fn clear(&mut self) {
        self.instances.clear();
        self.materials.clear();
        self.groups.clear();
        self.current = None;
        self.culling = true;
    }
}

impl EntityBackend for DrawList {
    fn bind_model(&mut self, id: ModelId, _model: &TexturedModel) {
        let start = self.instances.len() as u32;
        self.current = Some(DrawGroup {
            model: id,
            culled: self.culling,
            material: 0,
            instances: start..start,
        });
    }

    fn set_culling(&mut self, enabled: bool) {
        self.culling = enabled;
    }

    fn load_material(&mut self, texture: &ModelTexture) {
        let slot = self.materials.len() as u32;
        self.materials.push(texture.into());
        if let Some(group) = self.current.as_mut() {
            group.material = slot;
        }
    }

    fn draw_instance(&mut self, instance: &InstanceData) {
        self.instances.push(instance.into());
        if let Some(group) = self.current.as_mut() {
            group.instances.end += 1;
            group.culled = self.culling;
        }
    }

    fn unbind_model(&mut self) {
        if let Some(group) = self.current.take() {
            if !group.instances.is_empty() {
                self.groups.push(group);
            }
        }
    }
}

struct GpuModel {
    mesh: GpuMesh,
    texture: wgpu::BindGroup,
}

pub struct EntityPass {
    culled_pipeline: wgpu::RenderPipeline,
    double_sided_pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    models: HashMap<ModelId, GpuModel>,

    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    material_capacity: usize,
    /// Distance between material slots, a multiple of the uniform offset alignment
    material_stride: u64,

    list: DrawList,
}

impl EntityPass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        loader: &mut GpuLoader,
        globals_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        models: &ModelRegistry,
        assets: &Path,
        max_instances: usize,
    ) -> Result<Self, RenderError> {
        let source = format!("{}\n{}", super::COMMON_WGSL, include_str!("../shaders/entity.wgsl"));
        let program = ShaderProgram::compile(device, "Entity Shader", &source)?;

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Entity Texture Layout"),
            entries: &[texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Entity Material Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                true,
            )],
        });

        let layouts = [globals_layout, &texture_layout, &material_layout];
        let buffers = [Vertex::desc(), InstanceRaw::desc()];
        let culled = PipelineOptions::opaque("Entity", &layouts, &buffers, color_format);
        let culled_pipeline = program.pipeline(device, &culled);
        let double_sided_pipeline = program.pipeline(
            device,
            &PipelineOptions {
                label: "Entity Double Sided",
                cull_mode: None,
                ..culled
            },
        );

        let sampler = create_sampler(device, "Entity Sampler", wgpu::AddressMode::Repeat);
        let mut gpu_models = HashMap::new();
        for (id, model) in models.iter() {
            let mesh = &model.mesh;
            let mesh = loader.load_mesh(device, &model.name, &mesh.vertices, &mesh.indices);
            let texture = loader.load_texture(device, queue, &assets.join(&model.texture_file))?;
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&model.name),
                layout: &texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });
            gpu_models.insert(
                id,
                GpuModel {
                    mesh,
                    texture: bind_group,
                },
            );
        }

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let material_size = std::mem::size_of::<MaterialUniform>() as u64;
        let material_stride = material_size.div_ceil(alignment) * alignment;
        let material_capacity = models.len().max(1);
        let (material_buffer, material_bind_group) = create_material_slots(
            device,
            loader,
            &material_layout,
            material_stride,
            material_capacity,
        );

        let instance_capacity = max_instances.max(1);
        let instance_buffer = create_instance_buffer(device, loader, instance_capacity);

        Ok(Self {
            culled_pipeline,
            double_sided_pipeline,
            material_layout,
            models: gpu_models,
            instance_buffer,
            instance_capacity,
            material_buffer,
            material_bind_group,
            material_capacity,
            material_stride,
            list: DrawList::new(),
        })
    }

    /// Start recording a new frame.
    pub fn begin_frame(&mut self) -> &mut impl EntityBackend {
        self.list.clear();
        &mut self.list
    }

    /// Upload this frame's instances and materials.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, loader: &mut GpuLoader) {
        let list = &self.list;

        if list.instances.len() > self.instance_capacity {
            self.instance_capacity = list.instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, loader, self.instance_capacity);
            debug!("Grew entity instance buffer to {}", self.instance_capacity);
        }
        if list.materials.len() > self.material_capacity {
            self.material_capacity = list.materials.len().next_power_of_two();
            let (buffer, bind_group) = create_material_slots(
                device,
                loader,
                &self.material_layout,
                self.material_stride,
                self.material_capacity,
            );
            self.material_buffer = buffer;
            self.material_bind_group = bind_group;
        }

        if !list.instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&list.instances));
        }
        for (slot, material) in list.materials.iter().enumerate() {
            queue.write_buffer(
                &self.material_buffer,
                slot as u64 * self.material_stride,
                bytemuck::bytes_of(material),
            );
        }
    }

    /// Replay the recorded groups. Group 0 must already hold the globals.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.list.groups.is_empty() {
            return;
        }
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

        for group in &self.list.groups {
            let Some(model) = self.models.get(&group.model) else {
                continue;
            };
            pass.set_pipeline(if group.culled {
                &self.culled_pipeline
            } else {
                &self.double_sided_pipeline
            });
            pass.set_bind_group(1, &model.texture, &[]);
            let offset = (group.material as u64 * self.material_stride) as u32;
            pass.set_bind_group(2, &self.material_bind_group, &[offset]);
            pass.set_vertex_buffer(0, model.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(model.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..model.mesh.index_count, 0, group.instances.clone());
        }
    }
}

fn create_instance_buffer(
    device: &wgpu::Device,
    loader: &mut GpuLoader,
    capacity: usize,
) -> wgpu::Buffer {
    loader.create_empty_buffer(
        device,
        "Entity Instance Buffer",
        (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
        wgpu::BufferUsages::VERTEX,
    )
}

fn create_material_slots(
    device: &wgpu::Device,
    loader: &mut GpuLoader,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = loader.create_empty_buffer(
        device,
        "Entity Material Buffer",
        stride * capacity as u64,
        wgpu::BufferUsages::UNIFORM,
    );
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Entity Material Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<MaterialUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchRenderer;
    use crate::entity::Entity;
    use crate::model::MeshData;
    use glam::Vec3;

    fn registry() -> (ModelRegistry, ModelId, ModelId) {
        let mut models = ModelRegistry::new();
        let tree = models.register(TexturedModel {
            name: "tree".to_string(),
            mesh: MeshData::default(),
            texture_file: "tree.png".to_string(),
            texture: ModelTexture::default(),
        });
        let fern = models.register(TexturedModel {
            name: "fern".to_string(),
            mesh: MeshData::default(),
            texture_file: "fern.png".to_string(),
            texture: ModelTexture {
                has_transparency: true,
                use_fake_lighting: true,
                number_of_rows: 2,
                ..Default::default()
            },
        });
        (models, tree, fern)
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 72);
        let desc = InstanceRaw::desc();
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(desc.attributes.last().unwrap().offset, 64);
    }

    #[test]
    fn test_material_from_texture() {
        let m = MaterialUniform::from(&ModelTexture {
            shine_damper: 10.0,
            reflectivity: 0.5,
            use_fake_lighting: true,
            number_of_rows: 0,
            ..Default::default()
        });
        assert_eq!(
            m,
            MaterialUniform {
                shine_damper: 10.0,
                reflectivity: 0.5,
                fake_lighting: 1.0,
                number_of_rows: 1.0,
            }
        );
    }

    #[test]
    fn test_records_one_group_per_model() {
        let (models, tree, fern) = registry();
        let mut batches = BatchRenderer::new();
        batches.submit(&Entity::new(tree, Vec3::ZERO, 1.0));
        batches.submit(&Entity::new(fern, Vec3::X, 1.0).with_texture_index(1));
        batches.submit(&Entity::new(tree, Vec3::Z, 1.0));

        let mut list = DrawList::new();
        batches.render_all(&models, &mut list);

        assert_eq!(list.instances.len(), 3);
        assert_eq!(list.materials.len(), 2);
        assert_eq!(
            list.groups,
            vec![
                DrawGroup {
                    model: tree,
                    culled: true,
                    material: 0,
                    instances: 0..2,
                },
                DrawGroup {
                    model: fern,
                    culled: false,
                    material: 1,
                    instances: 2..3,
                },
            ]
        );
        assert_eq!(list.instances[2].atlas_offset, [0.5, 0.0]);
        assert!(list.culling);
        assert!(list.current.is_none());
    }

    #[test]
    fn test_clear_resets_recording() {
        let (models, tree, _) = registry();
        let mut batches = BatchRenderer::new();
        batches.submit(&Entity::new(tree, Vec3::ZERO, 1.0));

        let mut list = DrawList::new();
        batches.render_all(&models, &mut list);
        list.clear();
        assert!(list.groups.is_empty() && list.instances.is_empty() && list.materials.is_empty());
    }

    #[test]
    fn test_empty_group_dropped() {
        let (models, tree, _) = registry();
        let mut list = DrawList::new();
        list.bind_model(tree, models.get(tree).unwrap());
        list.unbind_model();
        assert!(list.groups.is_empty());
    }
}
