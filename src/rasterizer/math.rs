//! Vector and matrix math for the software pipeline
//!
//! Everything is `f64`. Matrices are row-major and multiply column vectors
//! (`m * v`), so a chain `p * v * m` applies `m` first.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

pub const PI: f64 = std::f64::consts::PI;

/// Degrees to radians
pub fn radians(degrees: f64) -> f64 {
    PI * degrees / 180.0
}

// ============================================================================
// Vec2
// ============================================================================

/// 2D Vector (texture coordinates, pixel positions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f64) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, s: f64) {
        self.x *= s;
        self.y *= s;
    }
}

// ============================================================================
// Vec3
// ============================================================================

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        self * (1.0 / l)
    }

    /// Component-wise product (color modulation)
    pub fn mul_elem(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Homogeneous point (w = 1)
    pub fn to_point(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 1.0)
    }

    /// Homogeneous direction (w = 0)
    pub fn to_direction(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 0.0)
    }
}

/// Mirror `incident` about `normal`; both are expected to be unit vectors
/// and `incident` points away from the surface.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    normal * (2.0 * incident.dot(normal)) - incident
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, s: f64) -> Vec3 {
        Vec3::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

// ============================================================================
// Vec4
// ============================================================================

/// Homogeneous 4D vector; also used for RGBA colors in 0..255
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Vec4 {
    pub const ZERO: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn dot(self, other: Vec4) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn lerp(self, other: Vec4, t: f64) -> Vec4 {
        self + (other - self) * t
    }

    /// Clamp every component to [min, max]
    pub fn clamp(self, min: f64, max: f64) -> Vec4 {
        Vec4::new(
            self.x.clamp(min, max),
            self.y.clamp(min, max),
            self.z.clamp(min, max),
            self.w.clamp(min, max),
        )
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, o: Vec4) -> Vec4 {
        Vec4::new(self.x + o.x, self.y + o.y, self.z + o.z, self.w + o.w)
    }
}

impl AddAssign for Vec4 {
    fn add_assign(&mut self, o: Vec4) {
        *self = *self + o;
    }
}

impl Sub for Vec4 {
    type Output = Vec4;
    fn sub(self, o: Vec4) -> Vec4 {
        Vec4::new(self.x - o.x, self.y - o.y, self.z - o.z, self.w - o.w)
    }
}

impl Mul<f64> for Vec4 {
    type Output = Vec4;
    fn mul(self, s: f64) -> Vec4 {
        Vec4::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }
}

impl MulAssign<f64> for Vec4 {
    fn mul_assign(&mut self, s: f64) {
        *self = *self * s;
    }
}

impl Div<f64> for Vec4 {
    type Output = Vec4;
    fn div(self, s: f64) -> Vec4 {
        Vec4::new(self.x / s, self.y / s, self.z / s, self.w / s)
    }
}

impl Neg for Vec4 {
    type Output = Vec4;
    fn neg(self) -> Vec4 {
        Vec4::new(-self.x, -self.y, -self.z, -self.w)
    }
}

// ============================================================================
// Mat4
// ============================================================================

/// 4x4 row-major matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub m: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const ZERO: Mat4 = Mat4 { m: [[0.0; 4]; 4] };

    pub fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    /// Matrix whose first three columns are `c0`, `c1`, `c2` (used for TBN)
    pub fn from_columns(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self::from_rows([
            [c0.x, c1.x, c2.x, 0.0],
            [c0.y, c1.y, c2.y, 0.0],
            [c0.z, c1.z, c2.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(v: Vec3) -> Self {
        let mut r = Mat4::IDENTITY;
        r.m[0][3] = v.x;
        r.m[1][3] = v.y;
        r.m[2][3] = v.z;
        r
    }

    pub fn scale(v: Vec3) -> Self {
        let mut r = Mat4::IDENTITY;
        r.m[0][0] = v.x;
        r.m[1][1] = v.y;
        r.m[2][2] = v.z;
        r
    }

    /// Rodrigues rotation about an arbitrary axis
    pub fn rotation_axis(degrees: f64, axis: Vec3) -> Self {
        let u = axis.normalize();
        let (s, c) = radians(degrees).sin_cos();
        let t = 1.0 - c;
        Self::from_rows([
            [u.x * u.x * t + c, u.x * u.y * t - u.z * s, u.x * u.z * t + u.y * s, 0.0],
            [u.x * u.y * t + u.z * s, u.y * u.y * t + c, u.y * u.z * t - u.x * s, 0.0],
            [u.x * u.z * t - u.y * s, u.y * u.z * t + u.x * s, u.z * u.z * t + c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// View matrix from an eye position, the unit *backward* axis and an up hint.
    /// The camera looks down `-z_axis`.
    pub fn look(eye: Vec3, z_axis: Vec3, up: Vec3) -> Self {
        let x_axis = up.cross(z_axis).normalize();
        let y_axis = z_axis.cross(x_axis).normalize();
        Self::from_rows([
            [x_axis.x, x_axis.y, x_axis.z, -x_axis.dot(eye)],
            [y_axis.x, y_axis.y, y_axis.z, -y_axis.dot(eye)],
            [z_axis.x, z_axis.y, z_axis.z, -z_axis.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Symmetric orthographic projection. `near`/`far` are view-space z values.
    pub fn ortho(right: f64, top: f64, near: f64, far: f64) -> Self {
        let mut r = Mat4::IDENTITY;
        r.m[0][0] = 1.0 / right;
        r.m[1][1] = 1.0 / top;
        r.m[2][2] = 2.0 / (near - far);
        r.m[2][3] = (near + far) / (far - near);
        r
    }

    /// OpenGL-style perspective projection, `fovy` in degrees, near/far > 0
    pub fn perspective(fovy: f64, aspect: f64, near: f64, far: f64) -> Self {
        let tan_half = (radians(fovy) / 2.0).tan();
        let mut r = Mat4::ZERO;
        r.m[0][0] = 1.0 / (tan_half * aspect);
        r.m[1][1] = 1.0 / tan_half;
        r.m[2][2] = (near + far) / (near - far);
        r.m[2][3] = (2.0 * far * near) / (near - far);
        r.m[3][2] = -1.0;
        r
    }

    /// NDC to pixel space. Y is flipped so that row 0 is the top of the image;
    /// z passes through unchanged.
    pub fn viewport(left: f64, top: f64, width: f64, height: f64) -> Self {
        let mut r = Mat4::IDENTITY;
        r.m[0][0] = width / 2.0;
        r.m[0][3] = left + width / 2.0;
        r.m[1][1] = -height / 2.0;
        r.m[1][3] = top + height / 2.0;
        r
    }

    pub fn transpose(&self) -> Mat4 {
        let mut r = Mat4::ZERO;
        for (i, row) in self.m.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                r.m[j][i] = *v;
            }
        }
        r
    }

    /// 3x3 minor obtained by deleting `row` and `col`
    fn minor(&self, row: usize, col: usize) -> f64 {
        let mut sub = [[0.0; 3]; 3];
        let mut si = 0;
        for i in (0..4).filter(|&i| i != row) {
            let mut sj = 0;
            for j in (0..4).filter(|&j| j != col) {
                sub[si][sj] = self.m[i][j];
                sj += 1;
            }
            si += 1;
        }
        det3(&sub)
    }

    /// Classical adjoint: transpose of the cofactor matrix
    pub fn adjugate(&self) -> Mat4 {
        let mut r = Mat4::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                r.m[j][i] = sign * self.minor(i, j);
            }
        }
        r
    }

    pub fn determinant(&self) -> f64 {
        (0..4)
            .map(|j| {
                let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
                sign * self.m[0][j] * self.minor(0, j)
            })
            .sum()
    }

    /// General inverse via the adjugate
    pub fn inverse(&self) -> Result<Mat4> {
        let adj = self.adjugate();
        let det: f64 = (0..4).map(|j| self.m[0][j] * adj.m[j][0]).sum();
        if det == 0.0 || !det.is_finite() {
            return Err(RenderError::SingularMatrix);
        }
        let inv_det = 1.0 / det;
        let mut r = adj;
        for row in r.m.iter_mut() {
            for v in row.iter_mut() {
                *v *= inv_det;
            }
        }
        Ok(r)
    }

    /// Inverse of a rotation + translation matrix: invert the linear block,
    /// then undo the translation.
    pub fn inverse_homogeneous(&self) -> Result<Mat4> {
        let mut linear = *self;
        linear.m[0][3] = 0.0;
        linear.m[1][3] = 0.0;
        linear.m[2][3] = 0.0;
        let untranslate = Mat4::translation(Vec3::new(-self.m[0][3], -self.m[1][3], -self.m[2][3]));
        Ok(linear.inverse()? * untranslate)
    }

    /// Adjugate of the upper 3x3 block; the rest of the matrix is identity
    pub fn adjugate3(&self) -> Mat4 {
        let a = &self.m;
        let mut r = Mat4::IDENTITY;
        r.m[0][0] = a[1][1] * a[2][2] - a[1][2] * a[2][1];
        r.m[0][1] = -(a[0][1] * a[2][2] - a[0][2] * a[2][1]);
        r.m[0][2] = a[0][1] * a[1][2] - a[0][2] * a[1][1];
        r.m[1][0] = -(a[1][0] * a[2][2] - a[1][2] * a[2][0]);
        r.m[1][1] = a[0][0] * a[2][2] - a[0][2] * a[2][0];
        r.m[1][2] = -(a[0][0] * a[1][2] - a[0][2] * a[1][0]);
        r.m[2][0] = a[1][0] * a[2][1] - a[1][1] * a[2][0];
        r.m[2][1] = -(a[0][0] * a[2][1] - a[0][1] * a[2][0]);
        r.m[2][2] = a[0][0] * a[1][1] - a[0][1] * a[1][0];
        r
    }

    /// Transpose of the upper 3x3 block only
    pub fn transpose3(&self) -> Mat4 {
        let mut r = *self;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] = self.m[j][i];
            }
        }
        r
    }

    pub fn determinant3(&self) -> f64 {
        let a = &self.m;
        det3(&[
            [a[0][0], a[0][1], a[0][2]],
            [a[1][0], a[1][1], a[1][2]],
            [a[2][0], a[2][1], a[2][2]],
        ])
    }

    /// Inverse-transpose of the upper 3x3 block, for transforming normals
    pub fn normal_matrix(&self) -> Result<Mat4> {
        let det = self.determinant3();
        if det == 0.0 || !det.is_finite() {
            return Err(RenderError::SingularMatrix);
        }
        let mut r = self.adjugate3().transpose3();
        for row in r.m.iter_mut().take(3) {
            for v in row.iter_mut().take(3) {
                *v /= det;
            }
        }
        Ok(r)
    }

    /// Drop the translation column (e.g. to keep a skybox centred on the eye)
    pub fn without_translation(&self) -> Mat4 {
        let mut r = *self;
        r.m[0][3] = 0.0;
        r.m[1][3] = 0.0;
        r.m[2][3] = 0.0;
        r
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

fn det3(a: &[[f64; 3]; 3]) -> f64 {
    a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
        - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
        + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut r = Mat4::ZERO;
        for i in 0..4 {
            for j in 0..4 {
                r.m[i][j] = (0..4).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        r
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        let row = |i: usize| {
            self.m[i][0] * v.x + self.m[i][1] * v.y + self.m[i][2] * v.z + self.m[i][3] * v.w
        };
        Vec4::new(row(0), row(1), row(2), row(3))
    }
}

// ============================================================================
// AABB
// ============================================================================

/// Axis-aligned bounding box. The default box is empty (min = +inf,
/// max = -inf) so that unions can start from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f64::INFINITY),
            max: Vec3::splat(f64::NEG_INFINITY),
        }
    }

    /// Box spanned by two arbitrary corners
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
        Aabb { min: a.min.min(b.min), max: a.max.max(b.max) }
    }

    pub fn union_point(a: &Aabb, p: Vec3) -> Aabb {
        Aabb { min: a.min.min(p), max: a.max.max(p) }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

// ============================================================================
// Rasterization helpers
// ============================================================================

/// Barycentric coordinates (alpha, beta, gamma) of `p` with respect to the
/// screen-space triangle `a, b, c` (only x/y are used). Returns `None` when
/// the point is outside or the triangle is degenerate; boundary points count
/// as inside.
pub fn in_triangle(p: Vec2, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let x_ba = b.x - a.x;
    let x_ca = c.x - a.x;
    let x_pa = p.x - a.x;
    let y_ba = b.y - a.y;
    let y_ca = c.y - a.y;
    let y_pa = p.y - a.y;

    let den = x_ba * y_ca - x_ca * y_ba;
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    let beta = (x_pa * y_ca - x_ca * y_pa) / den;
    let gamma = (x_ba * y_pa - x_pa * y_ba) / den;
    let alpha = 1.0 - beta - gamma;

    if alpha >= 0.0 && beta >= 0.0 && gamma >= 0.0 {
        Some(Vec3::new(alpha, beta, gamma))
    } else {
        None
    }
}
