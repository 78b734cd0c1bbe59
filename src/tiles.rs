//! Random-dot tiles: the repeating base texture of the stereogram.

use crate::error::{EngineError, EngineResult};
use crate::rng::RandomSource;
use crate::utils::{padded_bytes_per_row, pad_rows};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;

/// Colors a tile may be drawn from. Duplicates are allowed and weight the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(Vec<[u8; 3]>);

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self(colors)
    }

    /// Three random colors plus pure black and pure white.
    pub fn default_with(rng: &mut impl RandomSource) -> Self {
        let mut palette = synthesize_palette(3, rng);
        palette.0.push([0, 0, 0]);
        palette.0.push([255, 255, 255]);
        palette
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, color: Rgb<u8>) -> bool {
        self.0.contains(&color.0)
    }

    fn pick(&self, rng: &mut impl RandomSource) -> Rgb<u8> {
        Rgb(self.0[rng.below(self.0.len())])
    }
}

/// `n` colors with every channel drawn uniformly over 0..=255.
pub fn synthesize_palette(n: usize, rng: &mut impl RandomSource) -> Palette {
    let colors = (0..n)
        .map(|_| [rng.next_u8(), rng.next_u8(), rng.next_u8()])
        .collect();
    Palette(colors)
}

/// An image sampled with wrap-around on both axes.
#[derive(Debug, Clone)]
pub struct TileImage {
    image: RgbImage,
}

impl TileImage {
    /// Wraps an existing image. Returns `None` for a zero-sized image.
    pub fn new(image: RgbImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Texel lookup with toroidal wrap; any integer coordinate is valid.
    pub fn texel_wrapped(&self, x: i64, y: i64) -> Rgb<u8> {
        let tx = x.rem_euclid(self.width() as i64) as u32;
        let ty = y.rem_euclid(self.height() as i64) as u32;
        *self.image.get_pixel(tx, ty)
    }

    /// Nearest-neighbour sample at normalized coordinates, repeating outside [0,1).
    pub fn sample(&self, u: f32, v: f32) -> Rgb<u8> {
        let x = (u * self.width() as f32).floor() as i64;
        let y = (v * self.height() as f32).floor() as i64;
        self.texel_wrapped(x, y)
    }
}

/// Every texel is an independent uniform draw from `palette`.
///
/// Panics if the palette is empty.
pub fn synthesize_tile(size_px: u32, palette: &Palette, rng: &mut impl RandomSource) -> TileImage {
    assert!(!palette.is_empty(), "cannot synthesize a tile from an empty palette");
    let size_px = size_px.max(1);
    let image = RgbImage::from_fn(size_px, size_px, |_, _| palette.pick(rng));
    TileImage { image }
}

/// Fixed set of tiles, built once and only read afterwards.
#[derive(Debug, Clone)]
pub struct TilePool {
    tiles: Vec<TileImage>,
}

impl TilePool {
    pub fn new(tiles: Vec<TileImage>) -> EngineResult<Self> {
        if tiles.is_empty() {
            return Err(EngineError::EmptyTilePool);
        }
        Ok(Self { tiles })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TileImage> {
        self.tiles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileImage> {
        self.tiles.iter()
    }

    /// Uniformly picks one tile for the coming frame.
    pub fn choose(&self, rng: &mut impl RandomSource) -> (usize, &TileImage) {
        let index = rng.below(self.tiles.len());
        (index, &self.tiles[index])
    }
}

/// `count` independent tiles of `size_px` texels. A zero count still yields one tile.
pub fn synthesize_pool(
    count: usize,
    size_px: u32,
    palette: &Palette,
    rng: &mut impl RandomSource,
) -> TilePool {
    let tiles = (0..count.max(1))
        .map(|_| synthesize_tile(size_px, palette, rng))
        .collect();
    TilePool { tiles }
}

/// The tile pool uploaded to the GPU, one bind group per tile.
///
/// Sampling is nearest-neighbour with repeat addressing so the reconstruction
/// shader can index with unbounded coordinates.
pub struct TileTextures {
    bind_groups: Vec<wgpu::BindGroup>,
    _textures: Vec<wgpu::Texture>,
}

impl TileTextures {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pool: &TilePool,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Tile Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut textures = Vec::with_capacity(pool.len());
        let mut bind_groups = Vec::with_capacity(pool.len());
        for tile in pool.iter() {
            let texture = Self::tile_to_texture(device, queue, tile);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
                label: Some("tile_bind_group"),
            }));
            textures.push(texture);
        }
        log::debug!("uploaded {} tiles to the GPU", textures.len());

        Self {
            bind_groups,
            _textures: textures,
        }
    }

    pub fn bind_group(&self, index: usize) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(index)
    }

    pub fn len(&self) -> usize {
        self.bind_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bind_groups.is_empty()
    }

    fn tile_to_texture(device: &wgpu::Device, queue: &wgpu::Queue, tile: &TileImage) -> wgpu::Texture {
        let (width, height) = (tile.width(), tile.height());
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Tile Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // wgpu has no 3-byte format, expand to RGBA before the copy
        let rgba: Vec<u8> = tile
            .image()
            .pixels()
            .flat_map(|p| [p.0[0], p.0[1], p.0[2], 255])
            .collect();
        let bytes_per_row = padded_bytes_per_row(width, 4);
        let padded = pad_rows(&rgba, width as usize * 4, bytes_per_row as usize);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Tile Pixel Buffer"),
            contents: &padded,
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tile Copy Encoder"),
        });
        encoder.copy_buffer_to_texture(
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));
        texture
    }
}
