//! Shadow maps
//!
//! Depth-only pass from each directional light. Geometry is projected with the
//! light's fitted orthographic frustum and the nearest surface (largest
//! depth) is kept per texel.

use std::path::{Path, PathBuf};

use super::light::Light;
use super::math::{Mat4, Vec3};
use super::render::{for_each_covered, ShadowBuffer};
use crate::error::{RenderError, Result};
use crate::world::Mesh;

/// Refit every directional light around the mesh bounds and redraw its shadow
/// buffer.
/// Buffers are `width x height` and use the same viewport as the main pass.
/// Returns the number of lights rendered.
pub fn render_shadow_maps(
    lights: &mut [Light],
    meshes: &[Mesh],
    width: usize,
    height: usize,
    viewport: &Mat4,
) -> Result<usize> {
    let mut rendered = 0;
    for light in lights.iter_mut().filter(|l| l.is_directional()) {
        let corners = meshes
            .iter()
            .filter(|m| !m.bounds.is_empty())
            .flat_map(|m| m.bounds.corners());
        light.fit_to_points(corners)?;

        if light.shadow.width != width || light.shadow.height != height {
            light.allocate_shadow(width, height);
        } else {
            light.shadow.clear();
        }

        let transform = *viewport * light.light_space();
        for mesh in meshes {
            let to_pixels = transform * mesh.model;
            for tri in mesh.triangles() {
                let [a, b, c] = tri.map(|v| {
                    let mut p = to_pixels * v.position.to_point();
                    p.z = (p.z + 1.0) * 0.5;
                    p.xyz()
                });
                draw_depth(&mut light.shadow, a, b, c);
            }
        }
        rendered += 1;
    }
    log::debug!("rendered {} shadow map(s)", rendered);
    Ok(rendered)
}

fn draw_depth(buffer: &mut ShadowBuffer, a: Vec3, b: Vec3, c: Vec3) {
    let (width, height) = (buffer.width, buffer.height);
    for_each_covered(a, b, c, width, height, |x, y, w| {
        let depth = w.x * a.z + w.y * b.z + w.z * c.z;
        if depth > buffer.get_depth(x, y) {
            buffer.set_depth(x, y, depth);
        }
    });
}

/// Write `shadow_map<k>.png` for every directional light `k` into `dir`
pub fn export_shadow_maps(lights: &[Light], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;

    let mut written = Vec::new();
    for (k, light) in lights.iter().enumerate() {
        if !light.is_directional() || light.shadow.depth.is_empty() {
            continue;
        }
        let path = dir.join(format!("shadow_map{}.png", k));
        light.shadow.export_png(&path)?;
        written.push(path);
    }
    Ok(written)
}
