//! Translucent water quads, drawn after the opaque passes.

use super::loader::GpuLoader;
use super::program::{PipelineOptions, RenderError, ShaderProgram};
use crate::scene::WaterTile;

/// Two triangles spanning [-1, 1] on x and z.
const QUAD: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [1.0, 1.0],
];

/// Centre x, height, centre z and half size of one tile.
fn tile_instance(tile: &WaterTile) -> [f32; 4] {
    [tile.x, tile.height, tile.z, WaterTile::TILE_SIZE]
}

pub struct WaterPass {
    pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    tile_buffer: Option<wgpu::Buffer>,
    tile_count: u32,
}

impl WaterPass {
    pub fn new(
        device: &wgpu::Device,
        loader: &mut GpuLoader,
        globals_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        tiles: &[WaterTile],
    ) -> Result<Self, RenderError> {
        let source = format!("{}\n{}", super::COMMON_WGSL, include_str!("../shaders/water.wgsl"));
        let program = ShaderProgram::compile(device, "Water Shader", &source)?;

        const CORNER: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
        const TILE: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];
        let layouts = [globals_layout];
        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &CORNER,
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &TILE,
            },
        ];
        let pipeline = program.pipeline(
            device,
            &PipelineOptions {
                blend: wgpu::BlendState::ALPHA_BLENDING,
                cull_mode: None,
                depth_write: false,
                ..PipelineOptions::opaque("Water", &layouts, &buffers, color_format)
            },
        );

        let quad_buffer = loader.create_buffer(
            device,
            "Water Quad Buffer",
            bytemuck::cast_slice(&QUAD),
            wgpu::BufferUsages::VERTEX,
        );
        let instances: Vec<[f32; 4]> = tiles.iter().map(tile_instance).collect();
        let tile_buffer = (!instances.is_empty()).then(|| {
            loader.create_buffer(
                device,
                "Water Tile Buffer",
                bytemuck::cast_slice(&instances),
                wgpu::BufferUsages::VERTEX,
            )
        });

        Ok(Self {
            pipeline,
            quad_buffer,
            tile_buffer,
            tile_count: instances.len() as u32,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(tiles) = &self.tile_buffer else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        pass.set_vertex_buffer(1, tiles.slice(..));
        pass.draw(0..QUAD.len() as u32, 0..self.tile_count);
    }
}
