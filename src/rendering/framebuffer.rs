/// Framebuffer for software rendering
/// Stores color and depth information
///
/// Memory layout:
/// - Hot metadata (width, height) stored first for bounds checking
/// - Buffers are stored as separate Vecs to allow independent access patterns
use crate::count_call;
use crate::error::RenderError;
use crate::perf::RENDER_COUNTERS;
use std::path::Path;

/// View into a contiguous set of rows in the framebuffer.
/// Used for multi-core rasterization where each worker owns a disjoint slice.
pub struct FrameSlice<'a> {
    pub width: usize,
    pub full_height: usize,
    pub y0: usize,
    pub height: usize,
    pub color: &'a mut [u32],
    pub depth: &'a mut [f32],
}

impl<'a> FrameSlice<'a> {
    /// Depth test at (x, y_global); nearest wins and ties pass.
    /// On success optionally stores the new depth and returns the index into
    /// this slice's buffers. Returns None outside the slice or on failure.
    #[inline]
    pub fn test_depth(
        &mut self,
        x: usize,
        y_global: usize,
        depth: f32,
        write_depth: bool,
    ) -> Option<usize> {
        if x >= self.width || y_global < self.y0 {
            return None;
        }
        let y_local = y_global - self.y0;
        if y_local >= self.height {
            return None;
        }

        let index = y_local * self.width + x;
        if depth <= self.depth[index] {
            if write_depth {
                self.depth[index] = depth;
            }
            Some(index)
        } else {
            None
        }
    }

    #[inline]
    pub fn depth_at(&self, idx: usize) -> f32 {
        self.depth[idx]
    }
}

pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub color_buffer: Vec<u32>, // ARGB format
    pub depth_buffer: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let pixel_count = width * height;
        Self {
            width,
            height,
            color_buffer: vec![0; pixel_count],
            depth_buffer: vec![f32::INFINITY; pixel_count],
        }
    }

    /// Fill color with `clear_color` and reset depth to +infinity
    pub fn clear(&mut self, clear_color: u32) {
        count_call!(RENDER_COUNTERS.framebuffer_clears);
        self.color_buffer.fill(clear_color);
        self.depth_buffer.fill(f32::INFINITY);
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.color_buffer[y * self.width + x])
    }

    #[inline]
    pub fn depth(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.depth_buffer[y * self.width + x])
    }

    /// Get color buffer as slice
    pub fn color_buffer_slice(&self) -> &[u32] {
        &self.color_buffer
    }

    /// Create a FrameSlice covering the entire framebuffer
    pub fn as_full_slice_mut(&mut self) -> FrameSlice<'_> {
        FrameSlice {
            width: self.width,
            full_height: self.height,
            y0: 0,
            height: self.height,
            color: &mut self.color_buffer,
            depth: &mut self.depth_buffer,
        }
    }

    /// Resize framebuffer; contents are undefined until the next clear
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let pixel_count = width * height;
        self.color_buffer.resize(pixel_count, 0);
        self.depth_buffer.resize(pixel_count, f32::INFINITY);
    }

    /// Rows per stripe when splitting into `stripes` pieces.
    #[inline]
    pub fn stripe_height(&self, stripes: usize) -> usize {
        self.height.div_ceil(stripes.max(1)).max(1)
    }

    /// Split the framebuffer into horizontal stripes for multi-core rendering.
    /// Each stripe owns a disjoint subset of rows, so they can be rendered in parallel.
    pub fn split_into_stripes(&mut self, stripes: usize) -> Vec<FrameSlice<'_>> {
        let stripes = stripes.max(1);
        let width = self.width;
        let height = self.height;
        let rows_per_stripe = self.stripe_height(stripes);

        let mut slices = Vec::with_capacity(stripes);

        let mut remaining_color: &mut [u32] = self.color_buffer.as_mut_slice();
        let mut remaining_depth: &mut [f32] = self.depth_buffer.as_mut_slice();

        let mut y0 = 0usize;
        for _ in 0..stripes {
            if y0 >= height {
                break;
            }
            let rows = (height - y0).min(rows_per_stripe);
            let pixels = rows * width;

            let (color_head, color_tail) = remaining_color.split_at_mut(pixels);
            let (depth_head, depth_tail) = remaining_depth.split_at_mut(pixels);

            slices.push(FrameSlice {
                width,
                full_height: height,
                y0,
                height: rows,
                color: color_head,
                depth: depth_head,
            });

            remaining_color = color_tail;
            remaining_depth = depth_tail;
            y0 += rows;
        }

        slices
    }

    /// Copy the color buffer into an RGBA image.
    pub fn to_rgba_image(&self) -> Result<image::RgbaImage, RenderError> {
        let invalid = || RenderError::InvalidDimensions {
            width: self.width,
            height: self.height,
        };
        let width = u32::try_from(self.width).map_err(|_| invalid())?;
        let height = u32::try_from(self.height).map_err(|_| invalid())?;

        let bytes = self
            .color_buffer
            .iter()
            .flat_map(|&argb| {
                let (r, g, b) = u32_to_rgb(argb);
                [r, g, b, 0xFF]
            })
            .collect();

        image::RgbaImage::from_raw(width, height, bytes).ok_or_else(invalid)
    }

    /// Encode the color buffer as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)?;
        log::info!("saved {}x{} framebuffer to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Convert RGB to ARGB u32
#[inline]
pub const fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Split ARGB u32 into RGB
#[inline]
pub const fn u32_to_rgb(argb: u32) -> (u8, u8, u8) {
    ((argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripes_cover_every_row_exactly_once() {
        let mut fb = Framebuffer::new(7, 10);
        let stripes = fb.split_into_stripes(4);

        let rows: Vec<(usize, usize)> = stripes.iter().map(|s| (s.y0, s.height)).collect();
        assert_eq!(rows, vec![(0, 3), (3, 3), (6, 3), (9, 1)]);
        assert!(stripes.iter().all(|s| s.color.len() == s.height * 7));
    }

    #[test]
    fn depth_test_passes_ties_and_respects_write_flag() {
        let mut fb = Framebuffer::new(4, 4);
        fb.clear(0);
        let mut slice = fb.as_full_slice_mut();

        assert_eq!(slice.test_depth(1, 2, 0.5, true), Some(9));
        assert_eq!(slice.test_depth(1, 2, 0.5, true), Some(9), "equal depth should pass");
        assert_eq!(slice.test_depth(1, 2, 0.6, true), None);

        assert!(slice.test_depth(1, 2, 0.2, false).is_some());
        assert_eq!(slice.depth_at(9), 0.5, "transparent test must not write depth");
    }

    #[test]
    fn slice_rejects_rows_it_does_not_own() {
        let mut fb = Framebuffer::new(4, 4);
        let mut stripes = fb.split_into_stripes(2);
        assert_eq!(stripes[1].test_depth(0, 1, 0.1, true), None);
        assert_eq!(stripes[1].test_depth(0, 3, 0.1, true), Some(4));
    }

    #[test]
    fn rgba_image_unpacks_argb() {
        let mut fb = Framebuffer::new(2, 1);
        fb.clear(rgb_to_u32(10, 20, 30));
        fb.color_buffer[1] = rgb_to_u32(200, 100, 50);

        let img = fb.to_rgba_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [200, 100, 50, 255]);
    }
}
