/// Row pitch wgpu requires for buffer <-> texture copies.
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Smallest row pitch that holds `width` pixels and satisfies the copy alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    (unpadded + COPY_BYTES_PER_ROW_ALIGNMENT - 1) / COPY_BYTES_PER_ROW_ALIGNMENT
        * COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copies tightly packed rows into a buffer with `padded` bytes per row.
pub fn pad_rows(data: &[u8], unpadded: usize, padded: usize) -> Vec<u8> {
    if unpadded == 0 {
        return Vec::new();
    }
    let rows = data.len() / unpadded;
    let mut out = vec![0u8; padded * rows];
    for (y, row) in data.chunks_exact(unpadded).enumerate() {
        let dst_start = y * padded;
        out[dst_start..dst_start + unpadded].copy_from_slice(row);
    }
    out
}

/// Inverse of [`pad_rows`]: drops the alignment bytes at the end of every row.
pub fn strip_row_padding(data: &[u8], unpadded: usize, padded: usize) -> Vec<u8> {
    if padded == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(data.len() / padded * unpadded);
    for row in data.chunks(padded) {
        out.extend_from_slice(&row[..unpadded.min(row.len())]);
    }
    out
}

/// Viewport dimensions in physical pixels, never zero on either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Minimised windows report 0x0; textures cannot be that small.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Viewport {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Viewport::new(size.width, size.height)
    }
}
