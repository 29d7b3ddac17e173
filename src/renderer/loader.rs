//! GPU resource creation and teardown.
//!
//! Every buffer and texture goes through a [`GpuLoader`], which keeps a
//! handle to it. [`GpuLoader::clean_up`] destroys them newest first, once.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{debug, info};
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to read texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Cube map face {path} is {width}x{height}, expected {expected}x{expected}")]
    CubeFaceSize {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },
}

/// Something that can be released exactly once.
pub trait Release {
    fn release(&self);
}

impl Release for wgpu::Buffer {
    fn release(&self) {
        self.destroy();
    }
}

impl Release for wgpu::Texture {
    fn release(&self) {
        self.destroy();
    }
}

/// A GPU resource owned by the loader.
#[derive(Debug)]
pub enum Tracked {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
}

impl Release for Tracked {
    fn release(&self) {
        match self {
            Tracked::Buffer(b) => b.release(),
            Tracked::Texture(t) => t.release(),
        }
    }
}

/// Resources in acquisition order.
#[derive(Debug)]
pub struct ReleaseStack<R: Release> {
    items: Vec<R>,
}

impl<R: Release> ReleaseStack<R> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: R) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release everything, most recent first. Returns how many were
    /// released; a second call releases nothing.
    pub fn release_all(&mut self) -> usize {
        let count = self.items.len();
        while let Some(item) = self.items.pop() {
            item.release();
        }
        count
    }
}

impl<R: Release> Default for ReleaseStack<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertex and index buffers for one indexed mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// A sampled texture and its default view.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

#[derive(Debug, Default)]
pub struct GpuLoader {
    resources: ReleaseStack<Tracked>,
}

impl GpuLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn create_buffer(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        self.resources.push(Tracked::Buffer(buffer.clone()));
        buffer
    }

    /// An uninitialised buffer writable from the queue.
    pub fn create_empty_buffer(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        size: wgpu::BufferAddress,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.resources.push(Tracked::Buffer(buffer.clone()));
        buffer
    }

    /// Upload an indexed mesh.
    pub fn load_mesh<V: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> GpuMesh {
        let vertex_buffer = self.create_buffer(
            device,
            &format!("{label} Vertex Buffer"),
            bytemuck::cast_slice(vertices),
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer = self.create_buffer(
            device,
            &format!("{label} Index Buffer"),
            bytemuck::cast_slice(indices),
            wgpu::BufferUsages::INDEX,
        );
        debug!("Uploaded mesh {label}: {} vertices, {} indices", vertices.len(), indices.len());
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Decode a PNG and upload it as an sRGB 2D texture.
    pub fn load_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Result<GpuTexture, TextureError> {
        let image = decode_rgba(path)?;
        let (width, height) = image.dimensions();
        let texture = self.create_texture(device, &path.display().to_string(), width, height, 1);
        write_layer(queue, &texture, &image, 0);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuTexture { texture, view })
    }

    /// Decode six square faces (+X, -X, +Y, -Y, +Z, -Z) into one cube map.
    pub fn load_cube_map<P: AsRef<Path>>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        faces: &[P; 6],
    ) -> Result<GpuTexture, TextureError> {
        let images = faces
            .iter()
            .map(|p| decode_rgba(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let size = check_cube_faces(faces, &images)?;

        let texture = self.create_texture(device, label, size, size, 6);
        for (layer, image) in images.iter().enumerate() {
            write_layer(queue, &texture, image, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Ok(GpuTexture { texture, view })
    }

    fn create_texture(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        layers: u32,
    ) -> wgpu::Texture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.resources.push(Tracked::Texture(texture.clone()));
        texture
    }

    /// Destroy every tracked resource, newest first.
    pub fn clean_up(&mut self) {
        let released = self.resources.release_all();
        if released > 0 {
            info!("Released {released} GPU resources");
        }
    }
}

pub fn decode_rgba(path: &Path) -> Result<RgbaImage, TextureError> {
    let image = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

/// Side length shared by all faces, which must be square and equal.
pub fn check_cube_faces<P: AsRef<Path>>(
    faces: &[P],
    images: &[RgbaImage],
) -> Result<u32, TextureError> {
    let expected = images.first().map(|i| i.width()).unwrap_or(0);
    for (path, image) in faces.iter().zip(images) {
        let (width, height) = image.dimensions();
        if width != expected || height != expected {
            return Err(TextureError::CubeFaceSize {
                path: path.as_ref().to_path_buf(),
                width,
                height,
                expected,
            });
        }
    }
    Ok(expected)
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &RgbaImage, layer: u32) {
    let (width, height) = image.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        id: u32,
        log: Rc<RefCell<Vec<u32>>>,
    }

    impl Release for Probe {
        fn release(&self) {
            self.log.borrow_mut().push(self.id);
        }
    }

    #[test]
    fn test_release_newest_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        for id in 0..4 {
            stack.push(Probe {
                id,
                log: log.clone(),
            });
        }

        assert_eq!(stack.release_all(), 4);
        assert_eq!(*log.borrow(), vec![3, 2, 1, 0]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_release_only_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        stack.push(Probe {
            id: 7,
            log: log.clone(),
        });
        stack.release_all();
        assert_eq!(stack.release_all(), 0);
        assert_eq!(*log.borrow(), vec![7]);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_rgba(Path::new("/nonexistent/grass.png")).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
        assert!(err.to_string().contains("grass.png"));
    }

    #[test]
    fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 128]))
            .save(&path)
            .unwrap();

        let image = decode_rgba(&path).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [255, 0, 0, 128]);
    }

    #[test]
    fn test_cube_faces_must_match() {
        let names = ["a", "b", "c", "d", "e", "f"];
        let mut images = vec![RgbaImage::new(4, 4); 6];
        assert_eq!(check_cube_faces(&names, &images).unwrap(), 4);

        images[4] = RgbaImage::new(4, 2);
        let err = check_cube_faces(&names, &images).unwrap_err();
        match err {
            TextureError::CubeFaceSize {
                path,
                width,
                height,
                expected,
            } => {
                assert_eq!(path, Path::new("e"));
                assert_eq!((width, height, expected), (4, 2, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
