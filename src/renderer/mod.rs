//! GPU rendering pipeline using wgpu.
//!
//! This module provides the [`Renderer`] struct which handles:
//! - wgpu device and surface initialization
//! - Per-frame globals (camera, lights, fog, sky blend)
//! - Skybox, terrain, entity and water passes
//! - The egui debug panel
//! - Releasing every GPU resource on [`Renderer::clean_up`]

pub mod entity_pass;
pub mod globals;
pub mod loader;
pub mod program;
pub mod projection;
pub mod sky_pass;
pub mod terrain_pass;
pub mod water_pass;

use std::path::Path;
use std::sync::Arc;

use log::info;
use winit::window::Window;

use crate::batch::{BatchRenderer, BatchStats};
use crate::camera::Camera;
use crate::scene::{Scene, SceneConfig};
use crate::ui::{DebugInfo, Ui};
use entity_pass::EntityPass;
use globals::{FrameGlobals, GlobalUniforms};
use loader::GpuLoader;
use program::uniform_entry;
use sky_pass::SkyPass;
use terrain_pass::TerrainPass;
use water_pass::WaterPass;

pub use globals::LightingConfig;
pub use loader::TextureError;
pub use program::RenderError;
pub use projection::Projection;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Globals, lighting and fog helpers prepended to every shader.
pub(crate) const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");

/// What one frame draws.
pub struct FrameInput<'a> {
    pub scene: &'a Scene,
    pub camera: &'a mut Camera,
    pub batches: &'a mut BatchRenderer,
    pub fps: f32,
}

/// GPU renderer managing wgpu state and rendering.
pub struct Renderer {
    // Core wgpu objects
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    /// Current window size (for aspect ratio and resize handling)
    pub size: winit::dpi::PhysicalSize<u32>,

    // Depth buffer, recreated on resize
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    sky_pass: SkyPass,
    terrain_pass: TerrainPass,
    entity_pass: EntityPass,
    water_pass: WaterPass,

    /// Owns every buffer and texture the passes created
    loader: GpuLoader,
    cleaned_up: bool,

    pub projection: Projection,
    pub lighting: LightingConfig,

    // egui
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    /// UI state
    pub ui: Ui,

    last_stats: BatchStats,
}

fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

impl Renderer {
    /// Create a renderer for the window and upload the scene.
    ///
    /// # Errors
    ///
    /// Fails if no GPU is available, a texture cannot be read or a shader
    /// does not validate.
    pub async fn new(
        window: Arc<Window>,
        scene: &Scene,
        scene_config: &SceneConfig,
        assets: &Path,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Init egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx,
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: Some(DEPTH_FORMAT),
                ..Default::default()
            },
        );

        let (depth_texture, depth_view) =
            create_depth_texture(&device, config.width, config.height);

        let mut loader = GpuLoader::new();
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                false,
            )],
        });
        let globals_buffer = loader.create_empty_buffer(
            &device,
            "Globals Buffer",
            std::mem::size_of::<GlobalUniforms>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let format = config.format;
        let sky_pass = SkyPass::new(
            &device,
            &queue,
            &mut loader,
            &globals_layout,
            format,
            &scene_config.day_sky,
            &scene_config.night_sky,
            assets,
        )?;
        let terrain_pass = TerrainPass::new(
            &device,
            &queue,
            &mut loader,
            &globals_layout,
            format,
            &scene.world,
            &scene_config.terrain_textures,
            assets,
        )?;
        let entity_pass = EntityPass::new(
            &device,
            &queue,
            &mut loader,
            &globals_layout,
            format,
            &scene.models,
            assets,
            scene.entities.len(),
        )?;
        let water_pass =
            WaterPass::new(&device, &mut loader, &globals_layout, format, &scene.water)?;
        info!("Renderer ready, {} GPU resources loaded", loader.len());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_texture,
            depth_view,
            globals_buffer,
            globals_bind_group,
            sky_pass,
            terrain_pass,
            entity_pass,
            water_pass,
            loader,
            cleaned_up: false,
            projection: Projection::new(),
            lighting: LightingConfig::default(),
            egui_state,
            egui_renderer,
            ui: Ui::new(),
            last_stats: BatchStats::default(),
        })
    }

    /// Handle window event
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }

    /// Handle window resize.
    ///
    /// Reconfigures the surface and depth buffer for the new size.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);

            let (depth_texture, depth_view) =
                create_depth_texture(&self.device, new_size.width, new_size.height);
            let old = std::mem::replace(&mut self.depth_texture, depth_texture);
            old.destroy();
            self.depth_view = depth_view;
        }
    }

    /// What the last frame's entity pass drew.
    pub fn last_stats(&self) -> BatchStats {
        self.last_stats
    }

    /// Render a frame.
    ///
    /// Drains `frame.batches` into the entity pass, then draws sky, terrain,
    /// entities, water and the debug panel in that order.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] if surface acquisition fails.
    pub fn render(
        &mut self,
        window: &Window,
        frame: FrameInput<'_>,
    ) -> Result<(), wgpu::SurfaceError> {
        let FrameInput {
            scene,
            camera,
            batches,
            fps,
        } = frame;

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let camera_view = camera.view_matrix();
        let sky_view = scene.sky.view_matrix(camera_view);
        let uniforms = GlobalUniforms::new(&FrameGlobals {
            view_proj: self.projection.view_projection(camera_view, aspect),
            sky_view_proj: self.projection.view_projection(sky_view, aspect),
            camera_pos: camera.position,
            night_factor: scene.sky.night_factor(),
            lights: &scene.lights,
            lighting: &self.lighting,
        });
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&uniforms));

        self.last_stats = batches.render_all(&scene.models, self.entity_pass.begin_frame());
        self.entity_pass
            .prepare(&self.device, &self.queue, &mut self.loader);

        // Begin egui frame
        let info = DebugInfo {
            fps,
            stats: self.last_stats,
            entities: scene.entities.len(),
            day_time: scene.sky.time(),
            night_factor: scene.sky.night_factor(),
        };
        let raw_input = self.egui_state.take_egui_input(window);
        let egui_ctx = self.egui_state.egui_ctx().clone();
        let full_output = egui_ctx.run(raw_input, |ctx| {
            let response = self.ui.render(ctx, camera, &info);
            if response.reset_camera {
                *camera = Camera::new();
            }
        });

        // Handle egui platform output (cursor changes, etc.)
        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.size.width, self.size.height],
            pixels_per_point: full_output.pixels_per_point,
        };
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let sky = self.lighting.sky_colour;
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: sky.x as f64,
                            g: sky.y as f64,
                            b: sky.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Convert to 'static lifetime for egui compatibility
            let mut render_pass = render_pass.forget_lifetime();

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            self.sky_pass.draw(&mut render_pass);
            self.terrain_pass.draw(&mut render_pass);
            self.entity_pass.draw(&mut render_pass);
            self.water_pass.draw(&mut render_pass);

            self.egui_renderer
                .render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Release every GPU resource. Safe to call more than once.
    pub fn clean_up(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.loader.clean_up();
        self.depth_texture.destroy();
        self.cleaned_up = true;
        info!("Renderer cleaned up");
    }
}
