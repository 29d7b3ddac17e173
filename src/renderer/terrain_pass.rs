//! Terrain tiles shaded with a blend-mapped texture pack.

use std::path::Path;

use log::info;

use super::loader::{GpuLoader, GpuMesh};
use super::program::{
    create_sampler, sampler_entry, texture_entry, uniform_entry, PipelineOptions, RenderError,
    ShaderProgram,
};
use crate::scene::TerrainTextures;
use crate::terrain::{TerrainMesh, TerrainWorld, Vertex};

/// Mirrors `Tile` in `terrain.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct TileUniform {
    offset: [f32; 4],
}

struct GpuTile {
    mesh: GpuMesh,
    uniform: wgpu::BindGroup,
}

pub struct TerrainPass {
    pipeline: wgpu::RenderPipeline,
    textures: wgpu::BindGroup,
    tiles: Vec<GpuTile>,
}

impl TerrainPass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        loader: &mut GpuLoader,
        globals_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        world: &TerrainWorld,
        pack: &TerrainTextures,
        assets: &Path,
    ) -> Result<Self, RenderError> {
        let source = format!("{}\n{}", super::COMMON_WGSL, include_str!("../shaders/terrain.wgsl"));
        let program = ShaderProgram::compile(device, "Terrain Shader", &source)?;

        let d2 = wgpu::TextureViewDimension::D2;
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Texture Layout"),
            entries: &[
                texture_entry(0, d2),
                texture_entry(1, d2),
                texture_entry(2, d2),
                texture_entry(3, d2),
                texture_entry(4, d2),
                sampler_entry(5),
            ],
        });
        let tile_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Tile Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, false)],
        });

        let layouts = [globals_layout, &texture_layout, &tile_layout];
        let buffers = [Vertex::desc()];
        let pipeline = program.pipeline(
            device,
            &PipelineOptions::opaque("Terrain", &layouts, &buffers, color_format),
        );

        let files = [&pack.background, &pack.r, &pack.g, &pack.b, &pack.blend_map];
        let mut views = Vec::with_capacity(files.len());
        for file in files {
            views.push(loader.load_texture(device, queue, &assets.join(file))?.view);
        }
        let sampler = create_sampler(device, "Terrain Sampler", wgpu::AddressMode::Repeat);

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 5,
            resource: wgpu::BindingResource::Sampler(&sampler),
        });
        let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Textures"),
            layout: &texture_layout,
            entries: &entries,
        });

        let mut tiles = Vec::with_capacity(world.len());
        for tile in world.tiles() {
            let label = format!("Terrain {},{}", tile.grid_x, tile.grid_z);
            let mesh = TerrainMesh::from_height_field(&tile.field);
            info!(
                "{label}: {} vertices, {} indices",
                mesh.vertices.len(),
                mesh.indices.len()
            );
            let mesh = loader.load_mesh(device, &label, &mesh.vertices, &mesh.indices);

            let (x, z) = tile.field.origin();
            let uniform = TileUniform {
                offset: [x, 0.0, z, 0.0],
            };
            let buffer = loader.create_buffer(
                device,
                &format!("{label} Uniform"),
                bytemuck::bytes_of(&uniform),
                wgpu::BufferUsages::UNIFORM,
            );
            let uniform = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: &tile_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            tiles.push(GpuTile { mesh, uniform });
        }

        Ok(Self {
            pipeline,
            textures,
            tiles,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.textures, &[]);
        for tile in &self.tiles {
            pass.set_bind_group(2, &tile.uniform, &[]);
            pass.set_vertex_buffer(0, tile.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(tile.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..tile.mesh.index_count, 0, 0..1);
        }
    }
}
