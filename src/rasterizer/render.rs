//! Pixel buffers and scan conversion
//!
//! Depth conventions:
//! - `FrameBuffer`: cleared to 1.0 (far), smaller is nearer, a fragment wins
//!   iff `depth < stored`.
//! - `ShadowBuffer`: cleared to 0.0, larger is nearer to the light, a fragment
//!   wins iff `depth > stored`.

use std::path::Path;

use super::math::{in_triangle, Vec2, Vec3, Vec4};
use super::types::VertexOut;
use crate::error::Result;

/// Color + depth target
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub depth: Vec<f64>,
    pub width: usize,
    pub height: usize,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            depth: vec![1.0; width * height],
            width,
            height,
        }
    }

    /// Fill with `color` (components in 0..1) and reset depth to far
    pub fn clear(&mut self, color: Vec4) {
        let c = color.clamp(0.0, 1.0) * 255.0;
        let bytes = [c.x as u8, c.y as u8, c.z as u8, c.w as u8];
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.depth.fill(1.0);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Write a color (components in 0..255, clamped). Out-of-bounds is a no-op.
    pub fn draw_pixel(&mut self, x: i64, y: i64, color: Vec4) {
        if let Some(i) = self.index(x, y) {
            let c = color.clamp(0.0, 255.0);
            let p = i * 4;
            self.pixels[p] = c.x as u8;
            self.pixels[p + 1] = c.y as u8;
            self.pixels[p + 2] = c.z as u8;
            self.pixels[p + 3] = c.w as u8;
        }
    }

    /// Stored depth, or 1.0 (far) outside the buffer
    pub fn get_depth(&self, x: i64, y: i64) -> f64 {
        self.index(x, y).map_or(1.0, |i| self.depth[i])
    }

    pub fn set_depth(&mut self, x: i64, y: i64, depth: f64) {
        if let Some(i) = self.index(x, y) {
            self.depth[i] = depth;
        }
    }

    pub fn get_pixel(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        self.index(x, y).map(|i| {
            let p = i * 4;
            [self.pixels[p], self.pixels[p + 1], self.pixels[p + 2], self.pixels[p + 3]]
        })
    }

    /// Tightly packed RGBA8, row 0 at the top
    pub fn color_buffer(&self) -> &[u8] {
        &self.pixels
    }
}

/// Depth-only buffer rendered from a light
#[derive(Debug, Clone, Default)]
pub struct ShadowBuffer {
    pub depth: Vec<f64>,
    pub width: usize,
    pub height: usize,
}

impl ShadowBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { depth: vec![0.0; width * height], width, height }
    }

    pub fn clear(&mut self) {
        self.depth.fill(0.0);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Stored depth, or 0.0 outside the buffer
    pub fn get_depth(&self, x: i64, y: i64) -> f64 {
        self.index(x, y).map_or(0.0, |i| self.depth[i])
    }

    pub fn set_depth(&mut self, x: i64, y: i64, depth: f64) {
        if let Some(i) = self.index(x, y) {
            self.depth[i] = depth;
        }
    }

    /// Grayscale RGB8 image of the depth values
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.depth
            .iter()
            .flat_map(|d| {
                let v = (d.clamp(0.0, 1.0) * 255.0) as u8;
                [v, v, v]
            })
            .collect()
    }

    pub fn export_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            &self.to_rgb_bytes(),
            self.width as u32,
            self.height as u32,
            image::ExtendedColorType::Rgb8,
        )?;
        log::info!("wrote shadow map {}", path.display());
        Ok(())
    }
}

/// Visit every pixel inside the screen-space triangle `a, b, c`, passing its
/// barycentric weights. The bounding box is clamped to `width x height`.
pub fn for_each_covered<F>(a: Vec3, b: Vec3, c: Vec3, width: usize, height: usize, mut f: F)
where
    F: FnMut(i64, i64, Vec3),
{
    let coords = [a.x, a.y, b.x, b.y, c.x, c.y];
    if coords.iter().any(|v| !v.is_finite()) {
        return;
    }
    let x_min = (a.x.min(b.x).min(c.x).floor() as i64).max(0);
    let y_min = (a.y.min(b.y).min(c.y).floor() as i64).max(0);
    let x_max = (a.x.max(b.x).max(c.x).ceil() as i64).min(width as i64 - 1);
    let y_max = (a.y.max(b.y).max(c.y).ceil() as i64).min(height as i64 - 1);

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            if let Some(bary) = in_triangle(Vec2::new(x as f64, y as f64), a, b, c) {
                f(x, y, bary);
            }
        }
    }
}

/// Fill a post-viewport triangle with depth testing.
///
/// Depth is interpolated linearly in screen space. The other attributes were
/// pre-multiplied by `one_div_z` and are restored here before `shade` runs.
/// Returns the number of fragments written.
pub fn rasterize_triangle<F>(
    fb: &mut FrameBuffer,
    v0: &VertexOut,
    v1: &VertexOut,
    v2: &VertexOut,
    mut shade: F,
) -> usize
where
    F: FnMut(&VertexOut) -> Vec4,
{
    let a = v0.pixel_position.xyz();
    let b = v1.pixel_position.xyz();
    let c = v2.pixel_position.xyz();
    let (width, height) = (fb.width, fb.height);
    let mut written = 0;

    for_each_covered(a, b, c, width, height, |x, y, w| {
        let depth = w.x * a.z + w.y * b.z + w.z * c.z;
        if depth >= fb.get_depth(x, y) {
            return;
        }
        fb.set_depth(x, y, depth);

        let mut frag = VertexOut::blend3(v0, v1, v2, w);
        if frag.one_div_z != 0.0 {
            let z = 1.0 / frag.one_div_z;
            frag.world_position *= z;
            frag.view_position *= z;
            frag.normal *= z;
            frag.texcoord *= z;
            frag.color *= z;
        }
        frag.pixel_position = Vec4::new(x as f64, y as f64, depth, 1.0);

        let color = shade(&frag);
        fb.draw_pixel(x, y, color);
        written += 1;
    });
    written
}

/// Fill a triangle only where nothing has been drawn yet (stored depth still
/// at the far sentinel). Depth is left untouched. Texcoords are restored the
/// same way as in `rasterize_triangle`.
pub fn rasterize_background<F>(
    fb: &mut FrameBuffer,
    v0: &VertexOut,
    v1: &VertexOut,
    v2: &VertexOut,
    mut shade: F,
) -> usize
where
    F: FnMut(&VertexOut) -> Vec4,
{
    let a = v0.pixel_position.xyz();
    let b = v1.pixel_position.xyz();
    let c = v2.pixel_position.xyz();
    let (width, height) = (fb.width, fb.height);
    let mut written = 0;

    for_each_covered(a, b, c, width, height, |x, y, w| {
        if fb.get_depth(x, y) < 1.0 {
            return;
        }
        let mut frag = VertexOut::blend3(v0, v1, v2, w);
        if frag.one_div_z != 0.0 {
            frag.texcoord *= 1.0 / frag.one_div_z;
        }
        frag.pixel_position = Vec4::new(x as f64, y as f64, 1.0, 1.0);
        let color = shade(&frag);
        fb.draw_pixel(x, y, color);
        written += 1;
    });
    written
}

/// Bresenham line between two post-viewport vertices with depth testing.
/// Only `pixel_position` of the fragment handed to `shade` is filled in.
pub fn draw_line<F>(fb: &mut FrameBuffer, p0: &VertexOut, p1: &VertexOut, mut shade: F) -> usize
where
    F: FnMut(&VertexOut) -> Vec4,
{
    let (a, b) = (p0.pixel_position, p1.pixel_position);
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return 0;
    }
    let mut ix0 = a.x.floor() as i64;
    let mut iy0 = a.y.floor() as i64;
    let mut ix1 = b.x.floor() as i64;
    let mut iy1 = b.y.floor() as i64;
    let (mut z0, mut z1) = (a.z, b.z);

    let steep = (iy1 - iy0).abs() > (ix1 - ix0).abs();
    if steep {
        std::mem::swap(&mut ix0, &mut iy0);
        std::mem::swap(&mut ix1, &mut iy1);
    }
    if ix0 > ix1 {
        std::mem::swap(&mut ix0, &mut ix1);
        std::mem::swap(&mut iy0, &mut iy1);
        std::mem::swap(&mut z0, &mut z1);
    }
    let step: i64 = if iy1 < iy0 { -1 } else { 1 };

    let dx = ix1 - ix0;
    let dy = iy1 - iy0;
    let mut written = 0;
    let mut y = iy0;
    let mut eps = 0;
    for x in ix0..=ix1 {
        let t = if dx == 0 { 0.0 } else { (x - ix0) as f64 / dx as f64 };
        let depth = z0 * (1.0 - t) + z1 * t;
        let (px, py) = if steep { (y, x) } else { (x, y) };

        if depth < fb.get_depth(px, py) {
            fb.set_depth(px, py, depth);
            let frag = VertexOut {
                pixel_position: Vec4::new(px as f64, py as f64, depth, 1.0),
                ..Default::default()
            };
            let color = shade(&frag);
            fb.draw_pixel(px, py, color);
            written += 1;
        }

        if 2 * step * (eps + dy) < dx {
            eps += dy;
        } else {
            eps += dy - step * dx;
            y += step;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x: f64, y: f64, z: f64) -> VertexOut {
        VertexOut {
            pixel_position: Vec4::new(x, y, z, 1.0),
            one_div_z: 1.0,
            ..Default::default()
        }
    }

    const WHITE: Vec4 = Vec4 { x: 255.0, y: 255.0, z: 255.0, w: 255.0 };

    #[test]
    fn test_clear_scales_color_and_resets_depth() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.set_depth(1, 1, 0.3);
        fb.clear(Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(fb.get_pixel(2, 2), Some([255, 127, 0, 255]));
        assert_eq!(fb.get_depth(1, 1), 1.0);
        assert_eq!(fb.color_buffer().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.draw_pixel(-1, 0, WHITE);
        fb.draw_pixel(2, 0, WHITE);
        fb.set_depth(0, 5, 0.0);
        assert!(fb.pixels.iter().all(|&b| b == 0));
        assert_eq!(fb.get_depth(-3, -3), 1.0);

        let sb = ShadowBuffer::new(2, 2);
        assert_eq!(sb.get_depth(9, 9), 0.0);
    }

    #[test]
    fn test_draw_pixel_clamps() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.draw_pixel(0, 0, Vec4::new(300.0, -5.0, 128.4, 255.0));
        assert_eq!(fb.get_pixel(0, 0), Some([255, 0, 128, 255]));
    }

    #[test]
    fn test_triangle_depth_nearer_wins() {
        let mut fb = FrameBuffer::new(16, 16);
        let far = [px(0.0, 0.0, 0.8), px(15.0, 0.0, 0.8), px(0.0, 15.0, 0.8)];
        let near = [px(0.0, 0.0, 0.2), px(15.0, 0.0, 0.2), px(0.0, 15.0, 0.2)];

        let n = rasterize_triangle(&mut fb, &far[0], &far[1], &far[2], |_| Vec4::new(255.0, 0.0, 0.0, 255.0));
        assert!(n > 0);
        rasterize_triangle(&mut fb, &near[0], &near[1], &near[2], |_| Vec4::new(0.0, 255.0, 0.0, 255.0));
        assert_eq!(fb.get_pixel(2, 2), Some([0, 255, 0, 255]));
        assert!((fb.get_depth(2, 2) - 0.2).abs() < 1e-12);

        // Drawing the far one again changes nothing
        let n = rasterize_triangle(&mut fb, &far[0], &far[1], &far[2], |_| WHITE);
        assert_eq!(n, 0);
        assert_eq!(fb.get_pixel(2, 2), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_triangle_outside_pixels_untouched() {
        let mut fb = FrameBuffer::new(16, 16);
        let t = [px(0.0, 0.0, 0.5), px(8.0, 0.0, 0.5), px(0.0, 8.0, 0.5)];
        rasterize_triangle(&mut fb, &t[0], &t[1], &t[2], |_| WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(12, 12), Some([0, 0, 0, 0]));
        assert_eq!(fb.get_depth(12, 12), 1.0);
    }

    #[test]
    fn test_triangle_restores_perspective_attributes() {
        let mut fb = FrameBuffer::new(8, 8);
        // Every vertex stores texcoord * one_div_z with one_div_z = 0.5
        let mut tri = [px(0.0, 0.0, 0.5), px(7.0, 0.0, 0.5), px(0.0, 7.0, 0.5)];
        for v in tri.iter_mut() {
            v.one_div_z = 0.5;
            v.texcoord = Vec2::new(0.25, 0.125);
        }
        let mut seen = Vec2::default();
        rasterize_triangle(&mut fb, &tri[0], &tri[1], &tri[2], |f| {
            seen = f.texcoord;
            WHITE
        });
        assert!((seen.x - 0.5).abs() < 1e-12);
        assert!((seen.y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_background_only_fills_far_pixels() {
        let mut fb = FrameBuffer::new(8, 8);
        fb.set_depth(1, 1, 0.5);
        let t = [px(0.0, 0.0, 1.0), px(7.0, 0.0, 1.0), px(0.0, 7.0, 1.0)];
        let n = rasterize_background(&mut fb, &t[0], &t[1], &t[2], |_| WHITE);
        assert!(n > 0);
        assert_eq!(fb.get_pixel(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(fb.get_pixel(2, 1), Some([255; 4]));
        assert_eq!(fb.get_depth(2, 1), 1.0);
    }

    #[test]
    fn test_line_covers_endpoints_all_octants() {
        let ends = [(0.0, 0.0, 9.0, 3.0), (9.0, 3.0, 0.0, 0.0), (2.0, 0.0, 4.0, 9.0), (4.0, 9.0, 2.0, 0.0), (0.0, 9.0, 9.0, 0.0)];
        for (x0, y0, x1, y1) in ends {
            let mut fb = FrameBuffer::new(10, 10);
            let n = draw_line(&mut fb, &px(x0, y0, 0.5), &px(x1, y1, 0.5), |_| WHITE);
            assert!(n > 0);
            assert_eq!(fb.get_pixel(x0 as i64, y0 as i64), Some([255; 4]));
            assert_eq!(fb.get_pixel(x1 as i64, y1 as i64), Some([255; 4]));
        }
    }

    #[test]
    fn test_line_single_point() {
        let mut fb = FrameBuffer::new(4, 4);
        let n = draw_line(&mut fb, &px(1.2, 2.7, 0.3), &px(1.9, 2.1, 0.3), |_| WHITE);
        assert_eq!(n, 1);
        assert!((fb.get_depth(1, 2) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_line_depth_test_strict() {
        let mut fb = FrameBuffer::new(8, 1);
        draw_line(&mut fb, &px(0.0, 0.0, 0.5), &px(7.0, 0.0, 0.5), |_| WHITE);
        let n = draw_line(&mut fb, &px(0.0, 0.0, 0.5), &px(7.0, 0.0, 0.5), |_| WHITE);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_shadow_bytes() {
        let mut sb = ShadowBuffer::new(2, 1);
        sb.set_depth(1, 0, 1.0);
        assert_eq!(sb.to_rgb_bytes(), vec![0, 0, 0, 255, 255, 255]);
        sb.clear();
        assert_eq!(sb.get_depth(1, 0), 0.0);
    }
}
