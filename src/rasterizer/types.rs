//! Core types for the rasterizer

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::math::{Vec2, Vec3, Vec4};
use crate::error::{RenderError, Result};

/// Active shading model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Wireframe, constant white
    Line,
    /// Textured Phong with normal mapping and shadows
    #[default]
    Full,
    /// Cook-Torrance
    Pbr,
}

impl RenderMode {
    pub fn label(self) -> &'static str {
        match self {
            RenderMode::Line => "line",
            RenderMode::Full => "phong",
            RenderMode::Pbr => "pbr",
        }
    }

    /// Filled triangles (as opposed to wireframe edges)
    pub fn is_filled(self) -> bool {
        !matches!(self, RenderMode::Line)
    }
}

/// Object-space vertex as stored in a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexIn {
    pub position: Vec3,
    /// RGBA in 0..1
    pub color: Vec4,
    pub normal: Vec3,
    pub texcoord: Vec2,
}

impl Default for VertexIn {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            normal: Vec3::ZERO,
            texcoord: Vec2::default(),
        }
    }
}

impl VertexIn {
    pub fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self { position, normal, texcoord, ..Default::default() }
    }
}

/// Vertex after the vertex stage, carried through clipping and rasterization
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexOut {
    pub world_position: Vec4,
    pub view_position: Vec4,
    pub clip_position: Vec4,
    /// Only meaningful after perspective divide + viewport
    pub pixel_position: Vec4,
    pub color: Vec4,
    pub normal: Vec4,
    pub texcoord: Vec2,
    /// 1 / clip w
    pub one_div_z: f64,
}

impl VertexOut {
    /// Linear blend of every attribute except `pixel_position`, which is
    /// taken from `self`.
    pub fn lerp(&self, other: &VertexOut, t: f64) -> VertexOut {
        VertexOut {
            world_position: self.world_position.lerp(other.world_position, t),
            view_position: self.view_position.lerp(other.view_position, t),
            clip_position: self.clip_position.lerp(other.clip_position, t),
            pixel_position: self.pixel_position,
            color: self.color.lerp(other.color, t),
            normal: self.normal.lerp(other.normal, t),
            texcoord: self.texcoord.lerp(other.texcoord, t),
            one_div_z: self.one_div_z + (other.one_div_z - self.one_div_z) * t,
        }
    }

    /// Weighted sum of three vertices with barycentric weights `(a, b, c)`.
    /// Pixel position is left at zero.
    pub fn blend3(v0: &VertexOut, v1: &VertexOut, v2: &VertexOut, w: Vec3) -> VertexOut {
        VertexOut {
            world_position: v0.world_position * w.x + v1.world_position * w.y + v2.world_position * w.z,
            view_position: v0.view_position * w.x + v1.view_position * w.y + v2.view_position * w.z,
            clip_position: v0.clip_position * w.x + v1.clip_position * w.y + v2.clip_position * w.z,
            pixel_position: Vec4::ZERO,
            color: v0.color * w.x + v1.color * w.y + v2.color * w.z,
            normal: v0.normal * w.x + v1.normal * w.y + v2.normal * w.z,
            texcoord: v0.texcoord * w.x + v1.texcoord * w.y + v2.texcoord * w.z,
            one_div_z: v0.one_div_z * w.x + v1.one_div_z * w.y + v2.one_div_z * w.z,
        }
    }
}

/// Decoded image with wrap-around sampling.
///
/// Texel values stay in 0..255. A texture without data samples as zero.
#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    /// 3 (RGB) or 4 (RGBA)
    pub channels: usize,
    pub data: Vec<u8>,
    pub name: String,
}

impl Texture {
    /// Texture with no pixels
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap raw interleaved RGB or RGBA bytes. Returns an empty texture for any
    /// other channel count or if the byte count doesn't match the dimensions.
    pub fn from_raw(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Self {
        if !matches!(channels, 3 | 4) {
            log::warn!("unsupported texture channel count {}, expected 3 or 4", channels);
            return Self::empty();
        }
        if data.len() != width * height * channels {
            log::warn!(
                "texture data size {} does not match {}x{}x{}",
                data.len(),
                width,
                height,
                channels
            );
            return Self::empty();
        }
        Self { width, height, channels, data, name: String::new() }
    }

    /// 1x1 RGB texture
    pub fn solid(r: u8, g: u8, b: u8) -> Self {
        Self::from_raw(1, 1, 3, vec![r, g, b])
    }

    /// Decode an image file. Sources with an alpha channel keep it, everything
    /// else is converted to RGB8.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| RenderError::io(path, e))?;
        let mut tex = Self::from_bytes(&bytes)?;
        tex.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("loaded texture {} ({}x{}, {} ch)", path.display(), tex.width, tex.height, tex.channels);
        Ok(tex)
    }

    /// Decode an in-memory encoded image (png, jpeg, bmp)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = (img.width() as usize, img.height() as usize);
        let tex = if img.color().has_alpha() {
            Self::from_raw(width, height, 4, img.into_rgba8().into_raw())
        } else {
            Self::from_raw(width, height, 3, img.into_rgb8().into_raw())
        };
        Ok(tex)
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Sample at `uv`, wrapping both coordinates into [0, 1).
    /// Alpha of the result is always 0.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        if !self.has_data() {
            return Vec4::ZERO;
        }
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        if !u.is_finite() || !v.is_finite() {
            return Vec4::ZERO;
        }
        let x = (u * (self.width - 1) as f64) as usize;
        let y = (v * (self.height - 1) as f64) as usize;
        let idx = (y * self.width + x) * self.channels;
        match self.data.get(idx..idx + 3) {
            Some(px) => Vec4::new(px[0] as f64, px[1] as f64, px[2] as f64, 0.0),
            None => Vec4::ZERO,
        }
    }
}
