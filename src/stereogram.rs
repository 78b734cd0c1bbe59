//! The reconstruction pass: turns a captured depth map and one random tile into
//! the autostereogram.
//!
//! Each output pixel is resolved independently by walking left one repeat
//! period at a time, shortening every step by the depth found at the current
//! position. The tile texel reached at the end of the walk is the pixel's color.
//! [`reconstruct_pixel`] is the host version; `shaders/stereogram.wgsl` is the
//! same walk as a fragment shader.

use crate::depth::{ColorMap, DepthMap, RenderTarget};
use crate::mode::{BlendFactors, ReconstructionParameters};
use crate::tiles::{TileImage, TileTextures};
use crate::utils::Viewport;
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use std::borrow::Cow;

/// Upper bound on the backward walk. Must exceed `viewport_width / repeat_size`
/// for an exact result; past that the walk stops early and the pixel keeps
/// whatever tile phase it reached.
pub const STEP_LIMIT: usize = 100;

/// Tile-space coordinates in [0,1) for the pixel at `origin` (a pixel centre).
pub fn resolve_tile_coords(
    origin: [f32; 2],
    depth: &DepthMap,
    params: &ReconstructionParameters,
) -> [f32; 2] {
    let repeat = params.repeat_size;
    let max_step = params.max_step();
    let mut uv = origin;
    for _ in 0..STEP_LIMIT {
        if uv[0] < repeat {
            break;
        }
        // depth is re-read where the walk is now, not at the origin
        let d = depth.depth_at(uv[0], uv[1]);
        uv[0] -= repeat - d * max_step;
    }
    [fract(uv[0] / repeat), fract(uv[1] / repeat)]
}

/// The full per-pixel function: walk, tile lookup, then the mode blend.
pub fn reconstruct_pixel(
    origin: [f32; 2],
    depth: &DepthMap,
    color: &ColorMap,
    tile: &TileImage,
    params: &ReconstructionParameters,
) -> Rgb<u8> {
    let [tx, ty] = resolve_tile_coords(origin, depth, params);
    let stereo = tile.sample(tx, ty);

    let px = origin[0].floor().max(0.0) as u32;
    let py = origin[1].floor().max(0.0) as u32;
    let gray = (depth.depth_at(origin[0], origin[1]) * 255.0).round() as u8;
    let depth_gray = Rgb([gray, gray, gray]);
    let original = *color.get_pixel(
        px.min(color.width().saturating_sub(1)),
        py.min(color.height().saturating_sub(1)),
    );

    blend(stereo, depth_gray, original, params.display_mode.blend_factors())
}

/// `lerp(stereo, lerp(depth_gray, original, show_original), show_depth)`
pub fn blend(stereo: Rgb<u8>, depth_gray: Rgb<u8>, original: Rgb<u8>, factors: BlendFactors) -> Rgb<u8> {
    let mut out = [0u8; 3];
    for c in 0..3 {
        let inner = mix(depth_gray.0[c], original.0[c], factors.show_original);
        let outer = mix_f(stereo.0[c] as f32, inner, factors.show_depth);
        out[c] = outer.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Reconstructs a whole frame on the host, rows in parallel.
///
/// Resolution follows the depth map; the color map must match it.
pub fn reconstruct_frame(
    depth: &DepthMap,
    color: &ColorMap,
    tile: &TileImage,
    params: &ReconstructionParameters,
) -> RgbImage {
    let (width, height) = (depth.width(), depth.height());
    let mut out = RgbImage::new(width, height);
    let row_len = width as usize * 3;
    if row_len == 0 {
        return out;
    }
    out.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(3).enumerate() {
            let origin = [x as f32 + 0.5, y as f32 + 0.5];
            let rgb = reconstruct_pixel(origin, depth, color, tile, params);
            px.copy_from_slice(&rgb.0);
        }
    });
    out
}

#[inline]
fn fract(v: f32) -> f32 {
    v - v.floor()
}

#[inline]
fn mix(a: u8, b: u8, t: f32) -> f32 {
    mix_f(a as f32, b as f32, t)
}

#[inline]
fn mix_f(a: f32, b: f32, t: f32) -> f32 {
    // weighted form so t = 0 and t = 1 reproduce the endpoints exactly
    a * (1.0 - t) + b * t
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereogramUniform {
    pub resolution: [f32; 2],
    pub repeat_size: f32,
    pub max_step_fraction: f32,
    pub cam_near: f32,
    pub cam_far: f32,
    pub show_original: f32,
    pub show_depth: f32,
}

impl StereogramUniform {
    pub fn new(viewport: Viewport, params: &ReconstructionParameters, near: f32, far: f32) -> Self {
        let factors = params.display_mode.blend_factors();
        Self {
            resolution: [viewport.width as f32, viewport.height as f32],
            repeat_size: params.repeat_size,
            max_step_fraction: params.max_step_fraction,
            cam_near: near,
            cam_far: far,
            show_original: factors.show_original,
            show_depth: factors.show_depth,
        }
    }
}

/// Full-screen pass running the walk on the GPU.
pub struct StereogramPass {
    pipeline: wgpu::RenderPipeline,
    frame_bind_group_layout: wgpu::BindGroupLayout,
    tile_bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl StereogramPass {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("stereogram_frame_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Depth,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<StereogramUniform>() as _,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let tile_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tile_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Stereogram Uniform Buffer"),
            size: std::mem::size_of::<StereogramUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stereogram_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!(
                "../shaders/stereogram.wgsl"
            ))),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stereogram Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &tile_bind_group_layout],
            push_constant_ranges: &[],
        });

        // no vertex buffer: the vertex shader emits one full-screen triangle
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Stereogram Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            frame_bind_group_layout,
            tile_bind_group_layout,
            uniform_buffer,
        }
    }

    pub fn tile_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.tile_bind_group_layout
    }

    /// Writes this frame's parameter snapshot.
    pub fn prepare(&self, queue: &wgpu::Queue, uniform: &StereogramUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Records the pass into `output`.
    ///
    /// The frame bind group is created here from the target handed in, so a
    /// rebuilt capture target can never be read through a stale binding.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        capture: &RenderTarget,
        tiles: &TileTextures,
        tile_index: usize,
    ) {
        let Some(tile_bind_group) = tiles.bind_group(tile_index) else {
            log::warn!("tile {tile_index} is not uploaded, skipping frame");
            return;
        };

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&capture.depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&capture.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some("stereogram_frame_bind_group"),
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Stereogram Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &frame_bind_group, &[]);
        rpass.set_bind_group(1, tile_bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
