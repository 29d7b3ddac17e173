//! Skybox cube blending a day and a night cube map.

use std::path::Path;

use super::loader::GpuLoader;
use super::program::{
    create_sampler, sampler_entry, texture_entry, PipelineOptions, RenderError, ShaderProgram,
};
use crate::scene::CubeFaces;

/// Half the side length of the sky cube.
pub const SKY_SIZE: f32 = 500.0;

/// Corner positions for the 36 vertices of an inward-facing cube.
pub fn cube_vertices(half: f32) -> Vec<[f32; 3]> {
    const FACES: [[[f32; 3]; 4]; 6] = [
        // -Z
        [[-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0]],
        // -X
        [[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0]],
        // +X
        [[1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
        // +Z
        [[-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
        // +Y
        [[-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
        // -Y
        [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0]],
    ];

    let mut vertices = Vec::with_capacity(36);
    for [a, b, c, d] in FACES {
        for corner in [a, b, c, c, d, a] {
            vertices.push(corner.map(|v| v * half));
        }
    }
    vertices
}

pub struct SkyPass {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    cube_maps: wgpu::BindGroup,
}

impl SkyPass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        loader: &mut GpuLoader,
        globals_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        day: &CubeFaces,
        night: &CubeFaces,
        assets: &Path,
    ) -> Result<Self, RenderError> {
        let source = format!("{}\n{}", super::COMMON_WGSL, include_str!("../shaders/skybox.wgsl"));
        let program = ShaderProgram::compile(device, "Skybox Shader", &source)?;

        let cube = wgpu::TextureViewDimension::Cube;
        let cube_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Layout"),
            entries: &[texture_entry(0, cube), texture_entry(1, cube), sampler_entry(2)],
        });

        const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        let layouts = [globals_layout, &cube_layout];
        let buffers = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION,
        }];
        // Drawn first behind everything, so it never writes depth
        let pipeline = program.pipeline(
            device,
            &PipelineOptions {
                cull_mode: None,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                ..PipelineOptions::opaque("Skybox", &layouts, &buffers, color_format)
            },
        );

        let vertices = cube_vertices(SKY_SIZE);
        let vertex_buffer = loader.create_buffer(
            device,
            "Skybox Vertex Buffer",
            bytemuck::cast_slice(&vertices),
            wgpu::BufferUsages::VERTEX,
        );

        let day_faces = day.each_ref().map(|f| assets.join(f));
        let night_faces = night.each_ref().map(|f| assets.join(f));
        let day = loader.load_cube_map(device, queue, "Day Sky", &day_faces)?;
        let night = loader.load_cube_map(device, queue, "Night Sky", &night_faces)?;
        let sampler = create_sampler(device, "Skybox Sampler", wgpu::AddressMode::ClampToEdge);

        let cube_maps = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Cube Maps"),
            layout: &cube_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&day.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&night.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Ok(Self {
            pipeline,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            cube_maps,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(1, &self.cube_maps, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_vertices() {
        let vertices = cube_vertices(SKY_SIZE);
        assert_eq!(vertices.len(), 36);
        for v in &vertices {
            assert!(v.iter().all(|c| c.abs() == SKY_SIZE));
        }
    }

    #[test]
    fn test_every_face_covered() {
        let vertices = cube_vertices(1.0);
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                // Each face contributes two triangles whose vertices all sit on it
                let on_face = vertices
                    .chunks(6)
                    .filter(|face| face.iter().all(|v| v[axis] == sign))
                    .count();
                assert_eq!(on_face, 1, "axis {axis} sign {sign}");
            }
        }
    }
}
