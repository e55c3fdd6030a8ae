//! Homogeneous clipping
//!
//! Sutherland-Hodgman against the seven clip-space half-spaces, run before the
//! perspective divide so that geometry behind the eye never reaches the
//! `x/y/z` vs `w` tests.

use super::types::VertexOut;

/// Clip-space half-spaces, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    /// w > 0
    WZero,
    /// z > -w
    Near,
    /// z < w
    Far,
    /// x > -w
    Left,
    /// x < w
    Right,
    /// y < w
    Top,
    /// y > -w
    Bottom,
}

impl ClipPlane {
    pub const ALL: [ClipPlane; 7] = [
        ClipPlane::WZero,
        ClipPlane::Near,
        ClipPlane::Far,
        ClipPlane::Left,
        ClipPlane::Right,
        ClipPlane::Top,
        ClipPlane::Bottom,
    ];

    /// Signed distance to the plane; positive means inside
    pub fn distance(self, v: &VertexOut) -> f64 {
        let p = v.clip_position;
        match self {
            ClipPlane::WZero => p.w,
            ClipPlane::Near => p.z + p.w,
            ClipPlane::Far => p.w - p.z,
            ClipPlane::Left => p.x + p.w,
            ClipPlane::Right => p.w - p.x,
            ClipPlane::Top => p.w - p.y,
            ClipPlane::Bottom => p.y + p.w,
        }
    }
}

/// Clip a convex polygon against a single plane
pub fn clip_against(plane: ClipPlane, polygon: &[VertexOut]) -> Vec<VertexOut> {
    let mut out = Vec::with_capacity(polygon.len() + 1);
    let Some(last) = polygon.last() else {
        return out;
    };

    let mut prev = last;
    let mut d_prev = plane.distance(prev);
    for cur in polygon {
        let d_cur = plane.distance(cur);
        let prev_in = d_prev > 0.0;
        let cur_in = d_cur > 0.0;
        if prev_in != cur_in {
            let t = d_prev / (d_prev - d_cur);
            out.push(prev.lerp(cur, t));
        }
        if cur_in {
            out.push(*cur);
        }
        prev = cur;
        d_prev = d_cur;
    }
    out
}

/// Clip a convex polygon against `planes` in order, stopping early once
/// nothing is left
pub fn clip_polygon(polygon: Vec<VertexOut>, planes: &[ClipPlane]) -> Vec<VertexOut> {
    let mut poly = polygon;
    for &plane in planes {
        if poly.is_empty() {
            break;
        }
        poly = clip_against(plane, &poly);
    }
    poly
}

/// Clip a triangle against the full view volume. The result is a convex fan
/// of 0 to 9 vertices.
pub fn clip_triangle(a: &VertexOut, b: &VertexOut, c: &VertexOut) -> Vec<VertexOut> {
    clip_polygon(vec![*a, *b, *c], &ClipPlane::ALL)
}
