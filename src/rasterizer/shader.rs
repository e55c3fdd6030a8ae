//! Vertex and fragment stages
//!
//! The vertex stage is fixed. The fragment stage is one of a small closed set
//! of shading models picked by `RenderMode`.

use super::light::Light;
use super::math::{Mat4, Vec3, Vec4};
use super::types::{RenderMode, Texture, VertexIn, VertexOut};

/// Per-draw state the shading stages read from
#[derive(Debug, Clone, Copy)]
pub struct ShaderContext<'a> {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
    pub eye: Vec3,
    pub lights: &'a [Light],
    pub albedo: &'a Texture,
    pub normal_map: &'a Texture,
    /// Tangent space of the triangle currently being drawn
    pub tbn: Mat4,
}

/// Shading model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Unlit white wireframe
    Line,
    /// Normal-mapped Phong with shadow lookups
    Phong,
    /// Cook-Torrance
    Pbr,
}

impl Shader {
    pub fn for_mode(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Line => Shader::Line,
            RenderMode::Full => Shader::Phong,
            RenderMode::Pbr => Shader::Pbr,
        }
    }

    /// Object space to world, view and clip space
    pub fn vertex(&self, ctx: &ShaderContext, v: &VertexIn) -> VertexOut {
        let world_position = ctx.model * v.position.to_point();
        let view_position = ctx.view * world_position;
        let clip_position = ctx.projection * view_position;
        VertexOut {
            world_position,
            view_position,
            clip_position,
            pixel_position: Vec4::ZERO,
            color: v.color,
            normal: v.normal.to_direction(),
            texcoord: v.texcoord,
            one_div_z: 1.0,
        }
    }

    /// Color in 0..255 with opaque alpha
    pub fn fragment(&self, ctx: &ShaderContext, frag: &VertexOut) -> Vec4 {
        match self {
            Shader::Line => Vec4::new(255.0, 255.0, 255.0, 255.0),
            Shader::Phong => shade_phong(ctx, frag),
            Shader::Pbr => shade_pbr(ctx, frag),
        }
    }
}

fn shade_phong(ctx: &ShaderContext, frag: &VertexOut) -> Vec4 {
    let normal = if ctx.normal_map.has_data() {
        let sample = ctx.normal_map.sample(frag.texcoord).xyz() / 255.0;
        let tangent_space = sample * 2.0 - Vec3::ONE;
        (ctx.normal_matrix * ctx.tbn * tangent_space.to_direction()).xyz().normalize()
    } else {
        (ctx.normal_matrix * frag.normal).xyz().normalize()
    };

    let world = frag.world_position.xyz();
    let albedo = ctx.albedo.sample(frag.texcoord).xyz();
    let color = ctx.lights.iter().fold(Vec3::ZERO, |acc, light| {
        let occluded = light.in_shadow(&ctx.viewport, world);
        acc + light.lighting(normal, world, ctx.eye, albedo, occluded)
    });
    finish(color)
}

fn shade_pbr(ctx: &ShaderContext, frag: &VertexOut) -> Vec4 {
    let normal = (ctx.normal_matrix * frag.normal).xyz().normalize();
    let world = frag.world_position.xyz();
    let albedo = ctx.albedo.sample(frag.texcoord).xyz();
    let color = ctx
        .lights
        .iter()
        .fold(Vec3::ZERO, |acc, light| acc + light.pbr_lighting(normal, world, ctx.eye, albedo));
    finish(color)
}

fn finish(color: Vec3) -> Vec4 {
    Vec4::new(color.x, color.y, color.z, 255.0).clamp(0.0, 255.0)
}

/// Pre-divide interpolated attributes by clip w so that screen-space
/// interpolation followed by a multiply by `1 / one_div_z` is
/// perspective-correct.
pub fn perspective_correct(v: &mut VertexOut) {
    let w = v.clip_position.w;
    v.one_div_z = if w != 0.0 { 1.0 / w } else { 0.0 };
    v.world_position *= v.one_div_z;
    v.view_position *= v.one_div_z;
    v.color *= v.one_div_z;
    v.normal *= v.one_div_z;
    v.texcoord *= v.one_div_z;
}

/// Tangent/bitangent/normal basis (as matrix columns) of an object-space
/// triangle, re-orthogonalized against the face normal
pub fn tbn_matrix(a: &VertexIn, b: &VertexIn, c: &VertexIn) -> Mat4 {
    let ab = b.position - a.position;
    let ac = c.position - a.position;
    let n = ab.cross(ac).normalize();

    let du1 = b.texcoord.x - a.texcoord.x;
    let du2 = c.texcoord.x - a.texcoord.x;
    let dv1 = b.texcoord.y - a.texcoord.y;
    let dv2 = c.texcoord.y - a.texcoord.y;
    let det = du1 * dv2 - du2 * dv1;

    if det.abs() < 1e-12 {
        // No usable UV gradient: any frame around n will do
        let helper = if n.x.abs() < 0.9 { Vec3::new(1.0, 0.0, 0.0) } else { Vec3::UP };
        let t = (helper - n * helper.dot(n)).normalize();
        return Mat4::from_columns(t, n.cross(t), n);
    }

    let inv = 1.0 / det;
    let t = (ab * dv2 - ac * dv1) * inv;
    let bt = (ac * du1 - ab * du2) * inv;

    let t = (t - n * t.dot(n)).normalize();
    let bt = (bt - n * bt.dot(n) - t * bt.dot(t)).normalize();
    Mat4::from_columns(t, bt, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::Vec2;

    fn quad_corner(x: f64, y: f64) -> VertexIn {
        VertexIn::new(Vec3::new(x, y, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec2::new(x, y))
    }

    #[test]
    fn test_tbn_axis_aligned() {
        let m = tbn_matrix(&quad_corner(0.0, 0.0), &quad_corner(1.0, 0.0), &quad_corner(0.0, 1.0));
        let expected = Mat4::IDENTITY;
        assert!(m.approx_eq(&expected, 1e-12));
    }

    #[test]
    fn test_tbn_degenerate_uv_is_orthonormal() {
        let mut a = quad_corner(0.0, 0.0);
        let mut b = quad_corner(1.0, 0.0);
        let mut c = quad_corner(0.0, 1.0);
        for v in [&mut a, &mut b, &mut c] {
            v.texcoord = Vec2::new(0.5, 0.5);
        }
        let m = tbn_matrix(&a, &b, &c);
        let col = |j: usize| Vec3::new(m.m[0][j], m.m[1][j], m.m[2][j]);
        assert!(col(0).dot(col(1)).abs() < 1e-12);
        assert!(col(0).dot(col(2)).abs() < 1e-12);
        assert!((col(2).z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perspective_correct_premultiplies() {
        let mut v = VertexOut {
            clip_position: Vec4::new(0.0, 0.0, 0.0, 4.0),
            texcoord: Vec2::new(1.0, 2.0),
            world_position: Vec4::new(4.0, 8.0, 12.0, 1.0),
            ..Default::default()
        };
        perspective_correct(&mut v);
        assert_eq!(v.one_div_z, 0.25);
        assert_eq!(v.texcoord, Vec2::new(0.25, 0.5));
        assert_eq!(v.world_position.x, 1.0);

        let mut z = VertexOut::default();
        perspective_correct(&mut z);
        assert_eq!(z.one_div_z, 0.0);
    }

    #[test]
    fn test_line_fragment_is_white() {
        let albedo = Texture::empty();
        let ctx = ShaderContext {
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            lights: &[],
            albedo: &albedo,
            normal_map: &albedo,
            tbn: Mat4::IDENTITY,
        };
        let c = Shader::Line.fragment(&ctx, &VertexOut::default());
        assert_eq!(c, Vec4::new(255.0, 255.0, 255.0, 255.0));
    }

    #[test]
    fn test_phong_flat_normal_map_matches_geometric_normal() {
        let albedo = Texture::solid(255, 255, 255);
        let flat = Texture::solid(128, 128, 255);
        let lights = [Light::directional(Vec3::new(0.0, 0.0, 1.0))];
        let ctx = ShaderContext {
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Mat4::IDENTITY,
            eye: Vec3::new(0.0, 0.0, 10.0),
            lights: &lights,
            albedo: &albedo,
            normal_map: &flat,
            tbn: Mat4::IDENTITY,
        };
        let frag = VertexOut { world_position: Vec4::new(0.0, 0.0, 0.0, 1.0), ..Default::default() };
        let c = Shader::Phong.fragment(&ctx, &frag);
        // ambient + diffuse + specular saturates a white surface
        assert_eq!(c, Vec4::new(255.0, 255.0, 255.0, 255.0));

        let unlit = [Light::directional(Vec3::new(0.0, 0.0, -1.0))];
        let ctx = ShaderContext { lights: &unlit, ..ctx };
        let c = Shader::Phong.fragment(&ctx, &frag);
        assert!((c.x - 0.2 * 255.0).abs() < 1.0);
    }

    #[test]
    fn test_phong_shadowed_point_gets_ambient_only() {
        use crate::rasterizer::render_shadow_maps;
        use crate::world::Mesh;

        let quad = |y: f64, half: f64| {
            let corner = |x: f64, z: f64| VertexIn::new(Vec3::new(x, y, z), Vec3::UP, Vec2::new(0.0, 0.0));
            let vertices = vec![corner(-half, -half), corner(half, -half), corner(half, half), corner(-half, half)];
            Mesh::new("quad", vertices, vec![0, 1, 2, 2, 3, 0]).unwrap()
        };
        let meshes = vec![quad(0.0, 4.0), quad(2.0, 1.0)];
        let mut lights = vec![Light::directional(Vec3::new(0.0, 1.0, 0.1))];
        let viewport = Mat4::viewport(0.0, 0.0, 64.0, 64.0);
        render_shadow_maps(&mut lights, &meshes, 64, 64, &viewport).unwrap();

        let albedo = Texture::solid(100, 100, 100);
        let no_normals = Texture::empty();
        let ctx = ShaderContext {
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport,
            eye: Vec3::new(0.0, 10.0, 0.0),
            lights: &lights,
            albedo: &albedo,
            normal_map: &no_normals,
            tbn: Mat4::IDENTITY,
        };
        let floor_at = |x: f64, z: f64| VertexOut {
            world_position: Vec4::new(x, 0.0, z, 1.0),
            normal: Vec3::UP.to_direction(),
            ..Default::default()
        };

        // Under the occluder only the ambient term survives
        let shadowed = Shader::Phong.fragment(&ctx, &floor_at(0.0, 0.0));
        assert!((shadowed.x - 0.2 * 100.0).abs() < 1e-9);
        assert_eq!(shadowed.w, 255.0);

        let lit = Shader::Phong.fragment(&ctx, &floor_at(3.5, 3.5));
        assert!(lit.x > shadowed.x + 10.0);
    }

    #[test]
    fn test_vertex_stage_applies_matrices_in_order() {
        let albedo = Texture::empty();
        let ctx = ShaderContext {
            model: Mat4::translation(Vec3::new(1.0, 0.0, 0.0)),
            normal_matrix: Mat4::IDENTITY,
            view: Mat4::scale(Vec3::splat(2.0)),
            projection: Mat4::perspective(90.0, 1.0, 1.0, 10.0),
            viewport: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            lights: &[],
            albedo: &albedo,
            normal_map: &albedo,
            tbn: Mat4::IDENTITY,
        };
        let v = VertexIn::new(Vec3::new(0.0, 0.0, -2.0), Vec3::UP, Vec2::new(0.3, 0.7));
        let out = Shader::Phong.vertex(&ctx, &v);
        assert_eq!(out.world_position, Vec4::new(1.0, 0.0, -2.0, 1.0));
        assert_eq!(out.view_position, Vec4::new(2.0, 0.0, -4.0, 1.0));
        assert!((out.clip_position.w - 4.0).abs() < 1e-12);
        assert_eq!(out.texcoord, v.texcoord);
        assert_eq!(out.normal, Vec4::new(0.0, 1.0, 0.0, 0.0));
    }
}
