use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::HeightField;

/// Vertex data for GPU, shared by terrain tiles and OBJ models.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Generated mesh ready for GPU upload
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// Triangulate a height field in tile-local space.
    ///
    /// Vertex `(j, i)` sits at `(j / (n-1) * size, height, i / (n-1) * size)`
    /// and each grid cell contributes two triangles.
    pub fn from_height_field(field: &HeightField) -> Self {
        let n = field.resolution();
        let size = field.size();
        let last = (n - 1) as f32;

        let mut vertices = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let u = j as f32 / last;
                let v = i as f32 / last;
                vertices.push(Vertex {
                    position: [u * size, field.grid_height(j as i64, i as i64), v * size],
                    tex_coords: [u, v],
                    normal: vertex_normal(field, j as i64, i as i64).to_array(),
                });
            }
        }

        let mut indices = Vec::with_capacity(6 * (n - 1) * (n - 1));
        for gz in 0..n - 1 {
            for gx in 0..n - 1 {
                let top_left = (gz * n + gx) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((gz + 1) * n + gx) as u32;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        Self { vertices, indices }
    }
}

/// Finite-difference normal from the four neighbouring heights.
fn vertex_normal(field: &HeightField, x: i64, z: i64) -> Vec3 {
    let height_l = field.grid_height(x - 1, z);
    let height_r = field.grid_height(x + 1, z);
    let height_d = field.grid_height(x, z - 1);
    let height_u = field.grid_height(x, z + 1);
    Vec3::new(height_l - height_r, 2.0, height_d - height_u).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(n: usize, size: f32) -> HeightField {
        let heights = (0..n * n).map(|i| (i % 5) as f32).collect();
        HeightField::new(0.0, 0.0, size, n, heights).unwrap()
    }

    #[test]
    fn test_counts() {
        for n in 2..9 {
            let mesh = TerrainMesh::from_height_field(&field(n, 100.0));
            assert_eq!(mesh.vertices.len(), n * n);
            assert_eq!(mesh.indices.len(), 6 * (n - 1) * (n - 1));
            assert!(mesh.indices.iter().all(|&i| (i as usize) < n * n));
        }
    }

    #[test]
    fn test_first_cell_winding() {
        let mesh = TerrainMesh::from_height_field(&field(3, 2.0));
        assert_eq!(&mesh.indices[..6], &[0, 3, 1, 1, 3, 4]);
    }

    #[test]
    fn test_positions_and_uvs() {
        let f = field(3, 800.0);
        let mesh = TerrainMesh::from_height_field(&f);

        // Vertex (j=2, i=1) is index 1 * 3 + 2
        let v = mesh.vertices[5];
        assert_eq!(v.position, [800.0, f.grid_height(2, 1), 400.0]);
        assert_eq!(v.tex_coords, [1.0, 0.5]);
    }

    #[test]
    fn test_flat_normals_point_up() {
        let flat = HeightField::new(0.0, 0.0, 10.0, 3, vec![0.0; 9]).unwrap();
        let mesh = TerrainMesh::from_height_field(&flat);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn test_edge_normals_treat_outside_as_zero() {
        let raised = HeightField::new(0.0, 0.0, 10.0, 2, vec![4.0; 4]).unwrap();
        let mesh = TerrainMesh::from_height_field(&raised);

        // Vertex (0,0): left and down neighbours are outside and read as 0.
        let expected = Vec3::new(0.0 - 4.0, 2.0, 0.0 - 4.0).normalize();
        let n = Vec3::from_array(mesh.vertices[0].normal);
        assert!((n - expected).length() < 1e-6);
        assert!((n.length() - 1.0).abs() < 1e-6);
    }
}
