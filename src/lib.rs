extern crate image;

pub mod app;
pub mod camera;
pub mod config;
pub mod depth;
pub mod error;
pub mod mode;
pub mod rng;
pub mod stereogram;
pub mod tiles;
pub mod utils;

pub use camera::Camera;
pub use config::StereogramConfig;
pub use depth::{ColorMap, DepthCapture, DepthMap, Scene};
pub use error::{EngineError, EngineResult};
pub use mode::{DisplayMode, ModeController, ReconstructionParameters};
pub use tiles::{Palette, TileImage, TilePool};

use image::RgbImage;
use pollster::block_on;
use rng::{RngService, RngStream};
use stereogram::{reconstruct_frame, StereogramPass, StereogramUniform};
use tiles::TileTextures;
use utils::Viewport;
use winit::dpi::PhysicalSize;

/// Builds the tile pool a config describes: caller tiles as given, otherwise
/// `tile_count` tiles synthesized from the configured or a default palette.
pub fn build_tile_pool(config: &StereogramConfig, rng: &RngService) -> EngineResult<TilePool> {
    if let Some(tiles) = &config.tiles {
        if tiles.is_empty() {
            return Err(EngineError::EmptyTilePool);
        }
        return Ok(tiles.clone());
    }

    let palette = match &config.palette {
        Some(palette) if palette.is_empty() => return Err(EngineError::EmptyPalette),
        Some(palette) => palette.clone(),
        None => Palette::default_with(&mut rng.derive_stream_by_name("palette")),
    };
    log::debug!(
        "synthesizing {} tiles of {}px from {} colors",
        config.tile_count,
        config.tile_size_px,
        palette.len()
    );
    Ok(tiles::synthesize_pool(
        config.tile_count,
        config.tile_size_px,
        &palette,
        &mut rng.derive_stream_by_name("tiles"),
    ))
}

/// Owns the GPU context and both render stages. The frame driver holds one of
/// these and calls [`StereogramEngine::render`] once per frame.
pub struct StereogramEngine<'a> {
    pub size: PhysicalSize<u32>,
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_capture: DepthCapture,
    stereogram: StereogramPass,
    tile_pool: TilePool,
    tile_textures: TileTextures,
    controller: ModeController,
    frame_rng: RngStream,
}

impl<'a> StereogramEngine<'a> {
    pub fn new(
        surface: wgpu::Surface<'a>,
        instance: &wgpu::Instance,
        size: PhysicalSize<u32>,
        engine_config: StereogramConfig,
    ) -> EngineResult<Self> {
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            // Request an adapter which can render to our surface
            compatible_surface: Some(&surface),
        }))
        .ok_or(EngineError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        // no depth texture, no stereogram
        DepthCapture::ensure_supported(&adapter)?;

        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Stereogram Device"),
                required_features: wgpu::Features::empty(),
                // Make sure we use the texture resolution limits from the adapter, so we can support images the size of the swapchain.
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        // the tiles and the depth gray are written as-is, so avoid an sRGB encode on output
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(EngineError::IncompatibleSurface)?;

        let viewport = Viewport::from(size);
        let config = wgpu::SurfaceConfiguration {
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![format],
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width,
            height: viewport.height,
            present_mode: wgpu::PresentMode::Fifo, // This enables V-Sync
        };
        surface.configure(&device, &config);

        let rng = match engine_config.seed {
            Some(seed) => RngService::with_seed(seed),
            None => RngService::from_entropy(),
        };
        let tile_pool = build_tile_pool(&engine_config, &rng)?;

        let depth_capture = DepthCapture::new(&device, viewport);
        let stereogram = StereogramPass::new(&device, format);
        let tile_textures =
            TileTextures::upload(&device, &queue, &tile_pool, stereogram.tile_bind_group_layout());

        log::info!(
            "stereogram engine ready: {}x{}, {:?}, {} tiles",
            viewport.width,
            viewport.height,
            format,
            tile_pool.len()
        );

        Ok(Self {
            size,
            surface,
            device,
            queue,
            config,
            depth_capture,
            stereogram,
            tile_pool,
            tile_textures,
            controller: ModeController::new(engine_config.parameters),
            frame_rng: rng.derive_stream_by_name("frame"),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn viewport(&self) -> Viewport {
        self.depth_capture.viewport()
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ModeController {
        &mut self.controller
    }

    pub fn tile_pool(&self) -> &TilePool {
        &self.tile_pool
    }

    pub fn live_render_targets(&self) -> usize {
        self.depth_capture.live_targets()
    }

    /// The only path that changes viewport-sized resources: reconfigures the
    /// surface and rebuilds the capture target (old one released first).
    pub fn resize(&mut self, new_size: &PhysicalSize<u32>) {
        let viewport = Viewport::from(*new_size);
        self.size = *new_size;
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_capture.reconfigure(&self.device, viewport);
    }

    /// Swaps in a new tile pool and uploads it.
    pub fn set_tiles(&mut self, pool: TilePool) {
        self.tile_textures = TileTextures::upload(
            &self.device,
            &self.queue,
            &pool,
            self.stereogram.tile_bind_group_layout(),
        );
        self.tile_pool = pool;
    }

    /// Captures `scene` from `camera` and presents the stereogram.
    pub fn render(&mut self, scene: &mut dyn Scene, camera: &Camera) -> EngineResult<()> {
        let params = self.controller.snapshot();

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.depth_capture
            .capture(&self.queue, &mut encoder, scene, camera);

        let (tile_index, _) = self.tile_pool.choose(&mut self.frame_rng);
        log::trace!("frame uses tile {tile_index}");

        let uniform =
            StereogramUniform::new(self.depth_capture.viewport(), &params, camera.near, camera.far);
        self.stereogram.prepare(&self.queue, &uniform);
        self.stereogram.draw(
            &self.device,
            &mut encoder,
            &view,
            self.depth_capture.target(),
            &self.tile_textures,
            tile_index,
        );

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Same frame as [`render`](Self::render), but reconstructed on the host
    /// from a readback of the capture. Used for screenshots.
    pub fn capture_frame(&mut self, scene: &mut dyn Scene, camera: &Camera) -> EngineResult<RgbImage> {
        let params = self.controller.snapshot();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        self.depth_capture
            .capture(&self.queue, &mut encoder, scene, camera);
        self.queue.submit(Some(encoder.finish()));

        let (color, depth) = self
            .depth_capture
            .read_back(&self.device, &self.queue, camera)?;
        let (_, tile) = self.tile_pool.choose(&mut self.frame_rng);
        Ok(reconstruct_frame(&depth, &color, tile, &params))
    }
}
