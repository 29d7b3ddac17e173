//! Shader compilation and render pipeline construction.
//!
//! A [`ShaderProgram`] is a compiled WGSL module. Each pass pairs one with
//! its own uniform struct and builds pipelines through [`PipelineOptions`].

use thiserror::Error;

use super::loader::TextureError;
use super::DEPTH_FORMAT;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("No suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("Failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("Surface reports no texture formats")]
    NoSurfaceFormat,
    #[error("Shader {label} failed to compile:\n{message}")]
    Shader { label: String, message: String },
    #[error(transparent)]
    Texture(#[from] TextureError),
}

#[derive(Debug)]
pub struct ShaderProgram {
    module: wgpu::ShaderModule,
}

impl ShaderProgram {
    /// Compile WGSL, turning validation errors into [`RenderError::Shader`].
    pub fn compile(device: &wgpu::Device, label: &str, source: &str) -> Result<Self, RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Shader {
                label: label.to_string(),
                message: err.to_string(),
            });
        }
        log::debug!("Compiled shader {label}");

        Ok(Self { module })
    }

    /// Build a triangle-list pipeline with `vs_main` / `fs_main` entry points.
    pub fn pipeline(
        &self,
        device: &wgpu::Device,
        options: &PipelineOptions<'_>,
    ) -> wgpu::RenderPipeline {
        let label = format!("{} Pipeline", options.label);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: options.bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                buffers: options.buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: options.color_format,
                    blend: Some(options.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: options.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: options.depth_write,
                depth_compare: options.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

/// The parts of a pipeline that differ between passes.
pub struct PipelineOptions<'a> {
    pub label: &'a str,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub color_format: wgpu::TextureFormat,
    pub blend: wgpu::BlendState,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl<'a> PipelineOptions<'a> {
    /// Opaque, back-face culled, depth tested and written.
    pub fn opaque(
        label: &'a str,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
        buffers: &'a [wgpu::VertexBufferLayout<'a>],
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label,
            bind_group_layouts,
            buffers,
            color_format,
            blend: wgpu::BlendState::REPLACE,
            cull_mode: Some(wgpu::Face::Back),
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        }
    }
}

/// Layout entry for a uniform buffer.
pub fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    dynamic: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Layout entry for a filterable float texture.
pub fn texture_entry(
    binding: u32,
    dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

pub fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Linear sampler with the given wrap mode on every axis.
pub fn create_sampler(
    device: &wgpu::Device,
    label: &str,
    wrap: wgpu::AddressMode,
) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wrap,
        address_mode_v: wrap,
        address_mode_w: wrap,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
