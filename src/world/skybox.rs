//! Cube-map skybox
//!
//! A unit cube centred on the eye. Every face is two triangles and has its own
//! texture.

use std::path::Path;

use crate::error::Result;
use crate::rasterizer::{Texture, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::Front, Face::Back, Face::Left, Face::Right, Face::Up, Face::Down];

    /// File suffix of the face image
    pub fn suffix(self) -> &'static str {
        match self {
            Face::Front => "ft",
            Face::Back => "bk",
            Face::Left => "lf",
            Face::Right => "rt",
            Face::Up => "up",
            Face::Down => "dn",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyboxVertex {
    pub position: Vec3,
    pub texcoord: Vec2,
}

#[derive(Debug, Clone)]
pub struct Skybox {
    pub vertices: Vec<SkyboxVertex>,
    pub indices: Vec<u32>,
    textures: [Texture; 6],
}

impl Default for Skybox {
    fn default() -> Self {
        Self::new()
    }
}

impl Skybox {
    /// Cube geometry with empty face textures
    pub fn new() -> Self {
        // Per face: top-left, bottom-left, bottom-right, top-right as seen
        // from inside the cube
        let quads: [[(f64, f64, f64); 4]; 6] = [
            [(-0.5, 0.5, -0.5), (-0.5, -0.5, -0.5), (0.5, -0.5, -0.5), (0.5, 0.5, -0.5)],
            [(0.5, 0.5, 0.5), (0.5, -0.5, 0.5), (-0.5, -0.5, 0.5), (-0.5, 0.5, 0.5)],
            [(-0.5, 0.5, 0.5), (-0.5, -0.5, 0.5), (-0.5, -0.5, -0.5), (-0.5, 0.5, -0.5)],
            [(0.5, 0.5, -0.5), (0.5, -0.5, -0.5), (0.5, -0.5, 0.5), (0.5, 0.5, 0.5)],
            [(-0.5, 0.5, 0.5), (-0.5, 0.5, -0.5), (0.5, 0.5, -0.5), (0.5, 0.5, 0.5)],
            [(-0.5, -0.5, -0.5), (-0.5, -0.5, 0.5), (0.5, -0.5, 0.5), (0.5, -0.5, -0.5)],
        ];
        let uvs = [(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face, quad) in quads.iter().enumerate() {
            let base = (face * 4) as u32;
            for (&(x, y, z), &(u, v)) in quad.iter().zip(uvs.iter()) {
                vertices.push(SkyboxVertex { position: Vec3::new(x, y, z), texcoord: Vec2::new(u, v) });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self { vertices, indices, textures: Default::default() }
    }

    /// Load `<dir>/<name>_{ft,bk,lf,rt,up,dn}.png`
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let mut sky = Self::new();
        for face in Face::ALL {
            let path = dir.join(format!("{}_{}.png", name, face.suffix()));
            sky.textures[face.index()] = Texture::from_file(&path)?;
        }
        Ok(sky)
    }

    pub fn set_face(&mut self, face: Face, texture: Texture) {
        self.textures[face.index()] = texture;
    }

    /// Face a triangle (by its position in the index list) belongs to
    pub fn face_of_triangle(triangle: usize) -> Face {
        Face::ALL[(triangle / 2).min(5)]
    }

    pub fn sample(&self, uv: Vec2, face: Face) -> Vec4 {
        self.textures[face.index()].sample(uv)
    }

    pub fn triangles(&self) -> impl Iterator<Item = (Face, [&SkyboxVertex; 3])> + '_ {
        self.indices.chunks_exact(3).enumerate().map(move |(i, t)| {
            (
                Self::face_of_triangle(i),
                [
                    &self.vertices[t[0] as usize],
                    &self.vertices[t[1] as usize],
                    &self.vertices[t[2] as usize],
                ],
            )
        })
    }
}
