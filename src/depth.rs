//! Off-screen capture of the scene into a paired color + depth target, and the
//! conversion of hardware depth into the linear, inverted depth the
//! reconstruction pass walks over.

use crate::camera::Camera;
use crate::error::{EngineError, EngineResult};
use crate::utils::{padded_bytes_per_row, strip_row_padding, Viewport};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};

/// Scene colors, same resolution and frame as the matching [`DepthMap`].
pub type ColorMap = RgbImage;

/// Hardware depth in [0,1] to linear depth where 1.0 is the nearest surface
/// and 0.0 the far plane.
///
/// The hardware value is first turned back into view-space z, then into an
/// orthographic depth between the planes, then inverted. Stereo strength is
/// proportional to this value, so the chain has to stay exactly like this.
#[inline]
pub fn linearize_depth(raw: f32, near: f32, far: f32) -> f32 {
    let view_z = (near * far) / ((far - near) * raw - far);
    let orthographic = (view_z + near) / (near - far);
    (1.0 - orthographic).clamp(0.0, 1.0)
}

/// Per-pixel linear depth in [0,1], 1.0 nearest.
#[derive(Debug, Clone)]
pub struct DepthMap {
    image: ImageBuffer<Luma<f32>, Vec<f32>>,
}

impl DepthMap {
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        Self {
            image: ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])),
        }
    }

    /// Every pixel at the same depth.
    pub fn constant(width: u32, height: u32, depth: f32) -> Self {
        Self::from_fn(width, height, |_, _| depth)
    }

    /// Linearizes a row-major buffer of hardware depth values.
    pub fn from_hardware(width: u32, height: u32, raw: &[f32], near: f32, far: f32) -> Option<Self> {
        let linear = raw.iter().map(|&d| linearize_depth(d, near, far)).collect();
        ImageBuffer::from_raw(width, height, linear).map(|image| Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.image.get_pixel(x, y).0[0]
    }

    /// Depth under a screen position, nearest texel, clamped to the edges.
    pub fn depth_at(&self, x: f32, y: f32) -> f32 {
        let tx = (x.floor().max(0.0) as u32).min(self.width().saturating_sub(1));
        let ty = (y.floor().max(0.0) as u32).min(self.height().saturating_sub(1));
        self.get(tx, ty)
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([(self.get(x, y) * 255.0).round() as u8])
        })
    }
}

/// What the capture stage renders. Implementors record their own pipelines and
/// draw calls; the pass they receive targets [`DepthCapture::COLOR_FORMAT`] and
/// [`DepthCapture::DEPTH_FORMAT`].
pub trait Scene {
    /// Upload per-frame data (camera uniforms, animation) before the pass starts.
    fn prepare(&mut self, _queue: &wgpu::Queue, _camera: &Camera) {}

    fn draw(&self, rpass: &mut wgpu::RenderPass<'_>);
}

/// A GPU allocation that has to be released explicitly.
pub trait Disposable {
    fn dispose(&mut self);
}

/// Holds exactly one live allocation. Rebuilding always disposes the current
/// value before the replacement is allocated.
#[derive(Debug)]
pub struct TargetSlot<T: Disposable> {
    current: T,
    allocations: usize,
    disposals: usize,
}

impl<T: Disposable> TargetSlot<T> {
    pub fn new(allocate: impl FnOnce() -> T) -> Self {
        Self {
            current: allocate(),
            allocations: 1,
            disposals: 0,
        }
    }

    pub fn rebuild(&mut self, allocate: impl FnOnce() -> T) -> &T {
        self.current.dispose();
        self.disposals += 1;
        self.current = allocate();
        self.allocations += 1;
        &self.current
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Allocations not yet disposed.
    pub fn live(&self) -> usize {
        self.allocations - self.disposals
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }
}

/// Color and depth attachments of one viewport size.
#[derive(Debug)]
pub struct RenderTarget {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub viewport: Viewport,
}

impl Disposable for RenderTarget {
    fn dispose(&mut self) {
        self.color.destroy();
        self.depth.destroy();
    }
}

impl RenderTarget {
    fn new(device: &wgpu::Device, viewport: Viewport) -> Self {
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Color Texture"),
            size: viewport.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DepthCapture::COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Depth Texture"),
            size: viewport.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DepthCapture::DEPTH_FORMAT,
            usage: DepthCapture::DEPTH_USAGES,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            color,
            color_view,
            depth,
            depth_view,
            viewport,
        }
    }
}

/// Whether a depth format can be rendered into, sampled and copied out.
pub fn depth_capture_supported(features: &wgpu::TextureFormatFeatures) -> bool {
    features.allowed_usages.contains(DepthCapture::DEPTH_USAGES)
}

/// Renders the scene off-screen and exposes its color and depth attachments.
pub struct DepthCapture {
    slot: TargetSlot<RenderTarget>,
}

impl DepthCapture {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    const DEPTH_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
        .union(wgpu::TextureUsages::TEXTURE_BINDING)
        .union(wgpu::TextureUsages::COPY_SRC);

    /// Fails fast when the adapter cannot provide a sampleable depth target.
    pub fn ensure_supported(adapter: &wgpu::Adapter) -> EngineResult<()> {
        let features = adapter.get_texture_format_features(Self::DEPTH_FORMAT);
        if depth_capture_supported(&features) {
            return Ok(());
        }
        let adapter_name = adapter.get_info().name;
        log::error!(
            "FATAL: {:?} cannot be used as a sampled depth target on '{}'",
            Self::DEPTH_FORMAT,
            adapter_name
        );
        Err(EngineError::DepthCaptureUnsupported {
            adapter: adapter_name,
        })
    }

    pub fn new(device: &wgpu::Device, viewport: Viewport) -> Self {
        log::debug!("allocating capture target {}x{}", viewport.width, viewport.height);
        Self {
            slot: TargetSlot::new(|| RenderTarget::new(device, viewport)),
        }
    }

    /// Releases the current target, then allocates one at `viewport`.
    pub fn reconfigure(&mut self, device: &wgpu::Device, viewport: Viewport) {
        log::debug!(
            "rebuilding capture target {}x{} -> {}x{}",
            self.viewport().width,
            self.viewport().height,
            viewport.width,
            viewport.height
        );
        self.slot.rebuild(|| RenderTarget::new(device, viewport));
    }

    pub fn target(&self) -> &RenderTarget {
        self.slot.current()
    }

    pub fn viewport(&self) -> Viewport {
        self.slot.current().viewport
    }

    pub fn live_targets(&self) -> usize {
        self.slot.live()
    }

    /// Clears the target and records the scene into it. Never touches the scene
    /// beyond the `prepare`/`draw` calls.
    pub fn capture(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &mut dyn Scene,
        camera: &Camera,
    ) {
        scene.prepare(queue, camera);
        let target = self.target();
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Capture Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        scene.draw(&mut rpass);
    }

    /// Copies the last capture back to host memory as (ColorMap, DepthMap).
    ///
    /// Blocks until the GPU has finished the copy.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera,
    ) -> EngineResult<(ColorMap, DepthMap)> {
        let target = self.target();
        let Viewport { width, height } = target.viewport;
        // both formats are 4 bytes per texel
        let bytes_per_row = padded_bytes_per_row(width, 4);
        let buffer_size = bytes_per_row as u64 * height as u64;

        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Color Readback Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let depth_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Depth Readback Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        for (texture, buffer, aspect) in [
            (&target.color, &color_buffer, wgpu::TextureAspect::All),
            (&target.depth, &depth_buffer, wgpu::TextureAspect::DepthOnly),
        ] {
            encoder.copy_texture_to_buffer(
                wgpu::ImageCopyTexture {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect,
                },
                wgpu::ImageCopyBuffer {
                    buffer,
                    layout: wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(bytes_per_row),
                        rows_per_image: Some(height),
                    },
                },
                target.viewport.extent(),
            );
        }
        queue.submit(Some(encoder.finish()));

        let color_bytes = map_and_strip(device, &color_buffer, width as usize * 4, bytes_per_row as usize)?;
        let depth_bytes = map_and_strip(device, &depth_buffer, width as usize * 4, bytes_per_row as usize)?;

        let rgb: Vec<u8> = color_bytes
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let color = RgbImage::from_raw(width, height, rgb)
            .ok_or_else(|| EngineError::Readback("color buffer size mismatch".to_string()))?;

        let raw: Vec<f32> = depth_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let depth = DepthMap::from_hardware(width, height, &raw, camera.near, camera.far)
            .ok_or_else(|| EngineError::Readback("depth buffer size mismatch".to_string()))?;

        Ok((color, depth))
    }
}

fn map_and_strip(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
    unpadded: usize,
    padded: usize,
) -> EngineResult<Vec<u8>> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        tx.send(r).ok();
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| EngineError::Readback(e.to_string()))?
        .map_err(|e| EngineError::Readback(e.to_string()))?;
    let view = slice.get_mapped_range();
    let bytes = strip_row_padding(&view, unpadded, padded);
    drop(view);
    buffer.unmap();
    Ok(bytes)
}
