//! Triangle meshes
//!
//! Vertex + index arrays in object space, a model matrix and the two textures
//! the shaders sample. Normal matrix and world bounds are derived from the
//! model matrix and kept in sync by `set_model_matrix`.

use std::path::Path;

use crate::error::{RenderError, Result};
use crate::rasterizer::{Aabb, Mat4, Texture, Vec2, Vec3, VertexIn};

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<VertexIn>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub model: Mat4,
    pub normal_matrix: Mat4,
    /// World-space bounds
    pub bounds: Aabb,
    pub albedo: Texture,
    pub normal_map: Texture,
}

impl Mesh {
    /// Build a mesh with an identity model matrix. Fails if any index is out
    /// of range; a trailing partial triangle is dropped.
    pub fn new(name: impl Into<String>, vertices: Vec<VertexIn>, mut indices: Vec<u32>) -> Result<Self> {
        let vertex_count = vertices.len();
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RenderError::MeshIndex { index: bad as usize, vertex_count });
        }
        let name = name.into();
        if indices.len() % 3 != 0 {
            log::warn!("mesh {}: index count {} is not a multiple of 3", name, indices.len());
            indices.truncate(indices.len() - indices.len() % 3);
        }

        let mut mesh = Self {
            name,
            vertices,
            indices,
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            bounds: Aabb::empty(),
            albedo: Texture::solid(255, 255, 255),
            normal_map: Texture::empty(),
        };
        mesh.recalculate_bounds();
        Ok(mesh)
    }

    /// Load an OBJ file (triangulated), merging all of its models into one
    /// mesh. Missing normals are replaced by face normals.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj(path, &options)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for model in &models {
            let m = &model.mesh;
            let base = vertices.len() as u32;
            let count = m.positions.len() / 3;
            for i in 0..count {
                let position = Vec3::new(
                    m.positions[3 * i] as f64,
                    m.positions[3 * i + 1] as f64,
                    m.positions[3 * i + 2] as f64,
                );
                let normal = if m.normals.len() >= 3 * (i + 1) {
                    Vec3::new(m.normals[3 * i] as f64, m.normals[3 * i + 1] as f64, m.normals[3 * i + 2] as f64)
                } else {
                    Vec3::ZERO
                };
                let texcoord = if m.texcoords.len() >= 2 * (i + 1) {
                    Vec2::new(m.texcoords[2 * i] as f64, m.texcoords[2 * i + 1] as f64)
                } else {
                    Vec2::default()
                };
                vertices.push(VertexIn::new(position, normal, texcoord));
            }
            indices.extend(m.indices.iter().map(|i| i + base));
        }

        if vertices.iter().all(|v| v.normal == Vec3::ZERO) {
            fill_face_normals(&mut vertices, &indices);
        }

        log::info!(
            "loaded mesh {} ({} vertices, {} triangles)",
            path.display(),
            vertices.len(),
            indices.len() / 3
        );
        Self::new(name, vertices, indices)
    }

    /// Load `<dir>/<name>_albedo.png` and `<dir>/<name>_normal.png`
    pub fn load_textures(&mut self, dir: impl AsRef<Path>, name: &str) -> Result<()> {
        let dir = dir.as_ref();
        self.albedo = Texture::from_file(dir.join(format!("{}_albedo.png", name)))?;
        self.normal_map = Texture::from_file(dir.join(format!("{}_normal.png", name)))?;
        Ok(())
    }

    /// Set the model matrix and refresh the normal matrix and world bounds
    pub fn set_model_matrix(&mut self, model: Mat4) -> Result<()> {
        self.normal_matrix = model.normal_matrix()?;
        self.model = model;
        self.recalculate_bounds();
        Ok(())
    }

    pub fn recalculate_bounds(&mut self) {
        self.bounds = self
            .world_vertices()
            .fold(Aabb::empty(), |acc, p| Aabb::union_point(&acc, p));
    }

    /// World-space vertex positions
    pub fn world_vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .iter()
            .map(move |v| (self.model * v.position.to_point()).xyz())
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [&VertexIn; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |t| {
            [
                &self.vertices[t[0] as usize],
                &self.vertices[t[1] as usize],
                &self.vertices[t[2] as usize],
            ]
        })
    }
}

/// Model matrix as translation * rotation * scale; rotation is `degrees`
/// about `axis`
pub fn model_matrix(translation: Vec3, axis: Vec3, degrees: f64, scale: Vec3) -> Mat4 {
    let rotation = if axis.len() == 0.0 { Mat4::IDENTITY } else { Mat4::rotation_axis(degrees, axis) };
    Mat4::translation(translation) * rotation * Mat4::scale(scale)
}

/// Accumulate area-weighted face normals into each vertex
fn fill_face_normals(vertices: &mut [VertexIn], indices: &[u32]) {
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a.max(b).max(c) >= vertices.len() {
            continue;
        }
        let n = (vertices[b].position - vertices[a].position).cross(vertices[c].position - vertices[a].position);
        for i in [a, b, c] {
            vertices[i].normal += n;
        }
    }
    for v in vertices.iter_mut() {
        v.normal = v.normal.normalize();
    }
}
