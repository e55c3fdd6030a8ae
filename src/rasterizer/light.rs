//! Light sources
//!
//! All inputs are world space. Colors handed in and returned are in 0..255;
//! the ambient/diffuse/specular/color terms are unitless multipliers.

use super::math::{radians, reflect, Aabb, Mat4, Vec3, Vec4, PI};
use super::render::ShadowBuffer;
use crate::error::Result;

/// Depth offset applied before comparing against a shadow buffer
pub const SHADOW_BIAS: f64 = 0.1;

const SHININESS: i32 = 32;
const PBR_F0: f64 = 0.04;
const PBR_ROUGHNESS: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional {
        /// Unit vector pointing from the scene toward the light
        direction: Vec3,
    },
    Point {
        position: Vec3,
        constant: f64,
        linear: f64,
        quadratic: f64,
    },
    Spot {
        position: Vec3,
        /// Unit vector pointing from the lit area back toward the light
        direction: Vec3,
        inner_cos: f64,
        outer_cos: f64,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    /// PBR radiance
    pub color: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub shadow: ShadowBuffer,
}

impl Light {
    fn with_kind(kind: LightKind) -> Self {
        Self {
            kind,
            color: Vec3::splat(2.0),
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::splat(1.0),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            shadow: ShadowBuffer::default(),
        }
    }

    /// `direction` points toward the light and is normalized here
    pub fn directional(direction: Vec3) -> Self {
        Self::with_kind(LightKind::Directional { direction: direction.normalize() })
    }

    pub fn point(position: Vec3) -> Self {
        Self::with_kind(LightKind::Point { position, constant: 1.0, linear: 0.09, quadratic: 0.032 })
    }

    /// Spot light with the default 12.5 / 17.5 degree cone
    pub fn spot(position: Vec3, direction: Vec3) -> Self {
        Self::spot_with_cutoff(position, direction, 12.5, 17.5)
    }

    /// Cutoff angles in degrees
    pub fn spot_with_cutoff(position: Vec3, direction: Vec3, inner: f64, outer: f64) -> Self {
        Self::with_kind(LightKind::Spot {
            position,
            direction: direction.normalize(),
            inner_cos: radians(inner).cos(),
            outer_cos: radians(outer).cos(),
        })
    }

    pub fn is_directional(&self) -> bool {
        matches!(self.kind, LightKind::Directional { .. })
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            LightKind::Directional { .. } => "directional",
            LightKind::Point { .. } => "point",
            LightKind::Spot { .. } => "spot",
        }
    }

    /// Unit vector from `pos` toward the light
    pub fn light_direction(&self, pos: Vec3) -> Vec3 {
        match self.kind {
            LightKind::Directional { direction } => direction,
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => {
                (position - pos).normalize()
            }
        }
    }

    /// Distance falloff at `pos`; 1 for everything but point lights
    pub fn attenuation(&self, pos: Vec3) -> f64 {
        match self.kind {
            LightKind::Point { position, constant, linear, quadratic } => {
                let d = (position - pos).len();
                1.0 / (constant + linear * d + quadratic * d * d)
            }
            _ => 1.0,
        }
    }

    /// Cone falloff at `pos`; 1 for everything but spot lights
    pub fn spot_intensity(&self, pos: Vec3) -> f64 {
        match self.kind {
            LightKind::Spot { position, direction, inner_cos, outer_cos } => {
                let cos_theta = (position - pos).normalize().dot(direction);
                ((cos_theta - outer_cos) / (inner_cos - outer_cos)).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }

    /// Phong shading. An occluded point only gets the ambient term (none at
    /// all for spot lights).
    pub fn lighting(&self, normal: Vec3, pos: Vec3, eye: Vec3, albedo: Vec3, occluded: bool) -> Vec3 {
        let attenuation = self.attenuation(pos);
        if occluded {
            return match self.kind {
                LightKind::Spot { .. } => Vec3::ZERO,
                _ => self.ambient.mul_elem(albedo) * attenuation,
            };
        }

        let l = self.light_direction(pos);
        let diffuse = self.diffuse * l.dot(normal).max(0.0);
        let view_dir = (eye - pos).normalize();
        let reflect_dir = reflect(l, normal).normalize();
        let specular = self.specular * view_dir.dot(reflect_dir).max(0.0).powi(SHININESS);

        match self.kind {
            LightKind::Spot { .. } => {
                (diffuse + specular).mul_elem(albedo) * self.spot_intensity(pos)
            }
            _ => (self.ambient + diffuse + specular).mul_elem(albedo) * attenuation,
        }
    }

    /// Cook-Torrance shading (GGX, Schlick, Smith) with fixed F0 and
    /// roughness. Shadowing is not applied.
    pub fn pbr_lighting(&self, normal: Vec3, pos: Vec3, eye: Vec3, albedo: Vec3) -> Vec3 {
        let l = self.light_direction(pos);
        let v = (eye - pos).normalize();
        let h = (v + l).normalize();
        let cos_i = l.dot(normal).max(0.0);
        let cos_o = v.dot(normal).max(0.0);

        let f = fresnel_schlick(Vec3::splat(PBR_F0), h, v);
        let d = distribution_ggx(normal, h, PBR_ROUGHNESS);
        let g = geometry_smith(normal, v, l, PBR_ROUGHNESS);

        let diffuse = (Vec3::ONE - f).mul_elem(albedo) / PI;
        let specular = f * (d * g) / (4.0 * cos_i * cos_o + 0.001);
        let radiance = (diffuse + specular).mul_elem(self.color) * cos_i;

        radiance * self.spot_intensity(pos)
    }

    /// Combined light-space transform
    pub fn light_space(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Fit view and orthographic projection of a directional light around
    /// `points` (world space). Other light kinds are left untouched.
    pub fn fit_to_points<I>(&mut self, points: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let LightKind::Directional { direction } = self.kind else {
            return Ok(());
        };
        let up = light_up(direction);

        let origin_view = Mat4::look(Vec3::ZERO, direction, up);
        let bounds = points.into_iter().fold(Aabb::empty(), |acc, p| {
            Aabb::union_point(&acc, (origin_view * p.to_point()).xyz())
        });
        if bounds.is_empty() {
            log::debug!("no geometry to fit directional light against");
            self.view = origin_view;
            self.projection = Mat4::ortho(1.0, 1.0, 0.0, -1.0);
            return Ok(());
        }

        let center = bounds.center();
        let eye_light = Vec4::new(center.x, center.y, bounds.max.z, 1.0);
        let eye = (origin_view.inverse_homogeneous()? * eye_light).xyz();
        self.view = Mat4::look(eye, direction, up);

        let size = bounds.size();
        let half_x = (size.x / 2.0).max(1e-3);
        let half_y = (size.y / 2.0).max(1e-3);
        let depth = size.z.max(1e-3);
        self.projection = Mat4::ortho(half_x, half_y, 0.0, -depth);
        Ok(())
    }

    /// Resize (and clear) the shadow buffer
    pub fn allocate_shadow(&mut self, width: usize, height: usize) {
        self.shadow = ShadowBuffer::new(width, height);
    }

    /// True when `world` is hidden from this light according to its shadow
    /// buffer. Only directional lights cast shadows.
    pub fn in_shadow(&self, viewport: &Mat4, world: Vec3) -> bool {
        if !self.is_directional() {
            return false;
        }
        let p = *viewport * self.light_space() * world.to_point();
        let depth = (p.z + 1.0) * 0.5;
        depth + SHADOW_BIAS < self.shadow.get_depth(p.x.floor() as i64, p.y.floor() as i64)
    }
}

/// Up hint for a light view; falls back to +z when `direction` is parallel to +y
fn light_up(direction: Vec3) -> Vec3 {
    if Vec3::UP.cross(direction).len() < 1e-9 {
        log::warn!("light direction is parallel to the up axis, using +z as up");
        Vec3::new(0.0, 0.0, 1.0)
    } else {
        Vec3::UP
    }
}

fn distribution_ggx(n: Vec3, h: Vec3, roughness: f64) -> f64 {
    let a = roughness * roughness;
    let a2 = a * a;
    let n_dot_h = n.dot(h).max(0.0);
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    let denom = PI * denom * denom;
    if denom <= f64::EPSILON {
        return 0.0;
    }
    a2 / denom
}

fn fresnel_schlick(f0: Vec3, h: Vec3, v: Vec3) -> Vec3 {
    let h_dot_v = h.dot(v).max(0.0);
    f0 + (Vec3::ONE - f0) * (1.0 - h_dot_v).powi(5)
}

fn geometry_schlick_ggx(n_dot_v: f64, roughness: f64) -> f64 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

fn geometry_smith(n: Vec3, v: Vec3, l: Vec3, roughness: f64) -> f64 {
    let n_dot_v = n.dot(v).max(0.0);
    let n_dot_l = n.dot(l).max(0.0);
    geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Vec3 = Vec3 { x: 255.0, y: 255.0, z: 255.0 };

    #[test]
    fn test_point_attenuation_at_zero_distance() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let light = Light::point(p);
        assert!((light.attenuation(p) - 1.0).abs() < 1e-12);

        let custom = Light::with_kind(LightKind::Point {
            position: p,
            constant: 4.0,
            linear: 1.0,
            quadratic: 1.0,
        });
        assert!((custom.attenuation(p) - 0.25).abs() < 1e-12);
        assert!(custom.attenuation(Vec3::ZERO) < 0.25);
    }

    #[test]
    fn test_directional_attenuation_is_one() {
        let light = Light::directional(Vec3::new(0.3, 1.0, -0.2));
        for p in [Vec3::ZERO, Vec3::new(100.0, -50.0, 3.0)] {
            assert_eq!(light.attenuation(p), 1.0);
        }
    }

    #[test]
    fn test_directional_occluded_is_ambient_only() {
        let light = Light::directional(Vec3::new(0.0, 0.0, 1.0));
        let n = Vec3::new(0.0, 0.0, 1.0);
        let lit = light.lighting(n, Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), WHITE, false);
        let dark = light.lighting(n, Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), WHITE, true);
        assert!((dark.x - 0.2 * 255.0).abs() < 1e-9);
        // ambient + diffuse + specular, all at full strength head-on
        assert!((lit.x - (0.2 + 0.5 + 1.0) * 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_facing_away_gets_ambient() {
        let light = Light::directional(Vec3::new(0.0, 0.0, 1.0));
        let n = Vec3::new(0.0, 0.0, -1.0);
        let c = light.lighting(n, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), WHITE, false);
        assert!((c.x - 0.2 * 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_spot_cone() {
        let light = Light::spot(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let n = Vec3::UP;
        let eye = Vec3::new(0.0, 5.0, 1.0);
        assert!((light.spot_intensity(Vec3::ZERO) - 1.0).abs() < 1e-12);
        assert!(light.lighting(n, Vec3::ZERO, eye, WHITE, false).x > 0.0);

        let outside = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(light.spot_intensity(outside), 0.0);
        assert_eq!(light.lighting(n, outside, eye, WHITE, false), Vec3::ZERO);
        assert_eq!(light.lighting(n, Vec3::ZERO, eye, WHITE, true), Vec3::ZERO);
    }

    #[test]
    fn test_pbr_head_on_is_diffuse_dominated() {
        let light = Light::directional(Vec3::new(0.0, 0.0, 1.0));
        let n = Vec3::new(0.0, 0.0, 1.0);
        let c = light.pbr_lighting(n, Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0), WHITE);
        // F = F0 head-on, D = 0 for a perfectly smooth surface
        let expected = (1.0 - PBR_F0) * 255.0 / PI * 2.0;
        assert!((c.x - expected).abs() < 1e-6);
        assert!(c.x.is_finite());
    }

    #[test]
    fn test_pbr_back_side_is_black() {
        let light = Light::point(Vec3::new(0.0, 0.0, -4.0));
        let n = Vec3::new(0.0, 0.0, 1.0);
        let c = light.pbr_lighting(n, Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0), WHITE);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn test_fit_encloses_points() {
        let mut light = Light::directional(Vec3::new(0.3, 1.0, 0.2));
        let points = vec![
            Vec3::new(-2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(1.0, -1.0, -1.5),
        ];
        light.fit_to_points(points.iter().copied()).unwrap();
        let m = light.light_space();
        for p in points {
            let c = m * p.to_point();
            assert!(c.x.abs() <= 1.0 + 1e-9);
            assert!(c.y.abs() <= 1.0 + 1e-9);
            assert!(c.z.abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_fit_nearest_point_maps_to_depth_one() {
        let mut light = Light::directional(Vec3::new(0.0, 0.0, 1.0));
        let points = [Vec3::new(-1.0, -1.0, -4.0), Vec3::new(1.0, 1.0, 2.0)];
        light.fit_to_points(points).unwrap();
        let near = light.light_space() * Vec3::new(0.0, 0.0, 2.0).to_point();
        let far = light.light_space() * Vec3::new(0.0, 0.0, -4.0).to_point();
        assert!(((near.z + 1.0) * 0.5 - 1.0).abs() < 1e-9);
        assert!(((far.z + 1.0) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fit_straight_down_uses_alternate_up() {
        let mut light = Light::directional(Vec3::UP);
        let points = [Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 1.0)];
        light.fit_to_points(points).unwrap();
        assert!(light.view.m.iter().flatten().all(|v| v.is_finite()));
        assert!(light.light_space().inverse().is_ok());
    }

    #[test]
    fn test_shadow_lookup_truncates_to_covering_texel() {
        // Identity light space: the viewport alone maps world x/y to texels
        let mut light = Light::directional(Vec3::new(0.0, 0.0, 1.0));
        light.allocate_shadow(4, 4);
        light.shadow.set_depth(1, 0, 1.0);
        let viewport = Mat4::viewport(0.0, 0.0, 4.0, 4.0);

        // Lands at pixel (1.7, 0.2), inside texel (1, 0)
        assert!(light.in_shadow(&viewport, Vec3::new(-0.15, 0.9, -1.0)));
        // Lands at pixel (2.3, 0.2), inside texel (2, 0)
        assert!(!light.in_shadow(&viewport, Vec3::new(0.15, 0.9, -1.0)));
    }

    #[test]
    fn test_non_directional_never_in_shadow() {
        let mut light = Light::point(Vec3::new(0.0, 3.0, 0.0));
        light.allocate_shadow(4, 4);
        light.shadow.depth.fill(1.0);
        assert!(!light.in_shadow(&Mat4::viewport(0.0, 0.0, 4.0, 4.0), Vec3::ZERO));
    }
}
