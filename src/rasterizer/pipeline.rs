//! Draw orchestration
//!
//! Per triangle: vertex stage, back-face cull in view space, perspective
//! pre-division, homogeneous clipping, divide + viewport, then the clipped fan
//! is filled (Phong/PBR) or outlined (line mode) into the back buffer.

use super::clip::{clip_polygon, clip_triangle, ClipPlane};
use super::light::Light;
use super::math::{Mat4, Vec3, Vec4};
use super::render::{draw_line, rasterize_background, rasterize_triangle, FrameBuffer};
use super::shader::{perspective_correct, tbn_matrix, Shader, ShaderContext};
use super::shadow::render_shadow_maps;
use super::types::{RenderMode, VertexOut};
use crate::error::Result;
use crate::world::{Camera, Mesh, Skybox};

/// Skybox geometry sits inside the near plane, so only the side planes apply
const SKYBOX_PLANES: [ClipPlane; 5] = [
    ClipPlane::WZero,
    ClipPlane::Left,
    ClipPlane::Right,
    ClipPlane::Top,
    ClipPlane::Bottom,
];

/// What one `draw` call renders. Everything is borrowed from the scene.
#[derive(Debug, Clone, Copy)]
pub struct DrawList<'a> {
    pub camera: &'a Camera,
    pub meshes: &'a [Mesh],
    pub lights: &'a [Light],
    pub skybox: Option<&'a Skybox>,
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted: usize,
    pub culled: usize,
    /// Triangles that clipping removed entirely
    pub clipped: usize,
    /// Fan triangles handed to the rasterizer
    pub rasterized: usize,
    pub fragments: usize,
}

pub struct Pipeline {
    width: usize,
    height: usize,
    mode: RenderMode,
    shader: Shader,
    front: FrameBuffer,
    back: FrameBuffer,
    viewport: Mat4,
    projection: Mat4,
}

impl Pipeline {
    /// Phong mode, 60 degree perspective over [1, 30]
    pub fn new(width: usize, height: usize) -> Self {
        let aspect = width as f64 / height.max(1) as f64;
        Self {
            width,
            height,
            mode: RenderMode::Full,
            shader: Shader::for_mode(RenderMode::Full),
            front: FrameBuffer::new(width, height),
            back: FrameBuffer::new(width, height),
            viewport: Mat4::viewport(0.0, 0.0, width as f64, height as f64),
            projection: Mat4::perspective(60.0, aspect, 1.0, 30.0),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn shader(&self) -> Shader {
        self.shader
    }

    pub fn viewport(&self) -> &Mat4 {
        &self.viewport
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Replace the active shader
    pub fn switch_mode(&mut self, mode: RenderMode) {
        if mode != self.mode {
            log::info!("render mode: {}", mode.label());
        }
        self.mode = mode;
        self.shader = Shader::for_mode(mode);
    }

    /// Clear the back buffer; `color` components are in 0..1
    pub fn clear(&mut self, color: Vec4) {
        self.back.clear(color);
    }

    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Last completed frame as RGBA8
    pub fn color_buffer(&self) -> &[u8] {
        self.front.color_buffer()
    }

    pub fn front_buffer(&self) -> &FrameBuffer {
        &self.front
    }

    pub fn back_buffer(&self) -> &FrameBuffer {
        &self.back
    }

    /// Refit and render every directional light's shadow map at this
    /// pipeline's resolution
    pub fn render_shadow_maps(&self, lights: &mut [Light], meshes: &[Mesh]) -> Result<usize> {
        render_shadow_maps(lights, meshes, self.width, self.height, &self.viewport)
    }

    /// Draw every mesh (and the skybox, in filled modes) into the back buffer
    pub fn draw(&mut self, list: &DrawList) -> FrameStats {
        let mut stats = FrameStats::default();
        let shader = self.shader;
        let filled = self.mode.is_filled();

        for mesh in list.meshes {
            let mut ctx = ShaderContext {
                model: mesh.model,
                normal_matrix: mesh.normal_matrix,
                view: list.camera.view,
                projection: self.projection,
                viewport: self.viewport,
                eye: list.camera.eye,
                lights: list.lights,
                albedo: &mesh.albedo,
                normal_map: &mesh.normal_map,
                tbn: Mat4::IDENTITY,
            };

            for [a, b, c] in mesh.triangles() {
                stats.submitted += 1;
                ctx.tbn = tbn_matrix(a, b, c);

                let mut v0 = shader.vertex(&ctx, a);
                let mut v1 = shader.vertex(&ctx, b);
                let mut v2 = shader.vertex(&ctx, c);
                if is_back_face(&v0, &v1, &v2) {
                    stats.culled += 1;
                    continue;
                }

                perspective_correct(&mut v0);
                perspective_correct(&mut v1);
                perspective_correct(&mut v2);

                let mut polygon = clip_triangle(&v0, &v1, &v2);
                if polygon.len() < 3 {
                    stats.clipped += 1;
                    continue;
                }
                for v in polygon.iter_mut() {
                    to_screen(v, &self.viewport);
                }

                for k in 0..polygon.len() - 2 {
                    let (p0, p1, p2) = (&polygon[0], &polygon[k + 1], &polygon[k + 2]);
                    stats.rasterized += 1;
                    let shade = |f: &VertexOut| shader.fragment(&ctx, f);
                    if filled {
                        stats.fragments += rasterize_triangle(&mut self.back, p0, p1, p2, shade);
                    } else {
                        stats.fragments += draw_line(&mut self.back, p0, p1, shade);
                        stats.fragments += draw_line(&mut self.back, p1, p2, shade);
                        stats.fragments += draw_line(&mut self.back, p2, p0, shade);
                    }
                }
            }
        }

        if filled {
            if let Some(skybox) = list.skybox {
                self.draw_skybox(skybox, list.camera);
            }
        }

        log::debug!(
            "frame: {} submitted, {} culled, {} clipped, {} rasterized, {} fragments",
            stats.submitted,
            stats.culled,
            stats.clipped,
            stats.rasterized,
            stats.fragments
        );
        stats
    }

    /// Cube around the eye, drawn behind everything else
    fn draw_skybox(&mut self, skybox: &Skybox, camera: &Camera) {
        let transform = self.projection * camera.view.without_translation();

        for (face, tri) in skybox.triangles() {
            let [mut v0, mut v1, mut v2] = tri.map(|v| VertexOut {
                clip_position: transform * v.position.to_point(),
                texcoord: v.texcoord,
                ..Default::default()
            });
            perspective_correct(&mut v0);
            perspective_correct(&mut v1);
            perspective_correct(&mut v2);

            let mut polygon = clip_polygon(vec![v0, v1, v2], &SKYBOX_PLANES);
            if polygon.len() < 3 {
                continue;
            }
            for v in polygon.iter_mut() {
                to_screen(v, &self.viewport);
                v.pixel_position.z = 1.0;
            }

            let shade = |f: &VertexOut| {
                let c = skybox.sample(f.texcoord, face);
                Vec4::new(c.x, c.y, c.z, 255.0)
            };
            for k in 0..polygon.len() - 2 {
                rasterize_background(&mut self.back, &polygon[0], &polygon[k + 1], &polygon[k + 2], shade);
            }
        }
    }
}

/// True when the view-space triangle faces away from the eye at the origin
pub fn is_back_face(a: &VertexOut, b: &VertexOut, c: &VertexOut) -> bool {
    let (a, b, c): (Vec3, Vec3, Vec3) = (a.view_position.xyz(), b.view_position.xyz(), c.view_position.xyz());
    let normal = (b - a).cross(c - a);
    normal.dot(-a) < 0.0
}

/// Perspective divide (depth remapped to [0, 1]) followed by the viewport
fn to_screen(v: &mut VertexOut, viewport: &Mat4) {
    let w = v.clip_position.w;
    v.clip_position = v.clip_position / w;
    v.clip_position.w = 1.0;
    v.clip_position.z = (v.clip_position.z + 1.0) * 0.5;
    v.pixel_position = *viewport * v.clip_position;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Texture, Vec2, VertexIn};
    use crate::world::Face;

    const SIZE: usize = 64;

    fn facing_triangle(z: f64) -> Mesh {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let vertices = vec![
            VertexIn::new(Vec3::new(-1.0, -1.0, z), n, Vec2::new(0.0, 0.0)),
            VertexIn::new(Vec3::new(1.0, -1.0, z), n, Vec2::new(1.0, 0.0)),
            VertexIn::new(Vec3::new(0.0, 1.0, z), n, Vec2::new(0.5, 1.0)),
        ];
        let mut mesh = Mesh::new("tri", vertices, vec![0, 1, 2]).unwrap();
        mesh.albedo = Texture::solid(255, 255, 255);
        mesh.normal_map = Texture::solid(128, 128, 255);
        mesh
    }

    /// Pixel a world-space point lands on with the default camera
    fn project(pipeline: &Pipeline, p: Vec3) -> (i64, i64) {
        let clip = *pipeline.projection() * p.to_point();
        let ndc = clip / clip.w;
        let px = *pipeline.viewport() * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
        (px.x.floor() as i64, px.y.floor() as i64)
    }

    fn pixel(pipeline: &Pipeline, (x, y): (i64, i64)) -> [u8; 4] {
        pipeline.front_buffer().get_pixel(x, y).expect("pixel in bounds")
    }

    #[test]
    fn test_lit_triangle_brighter_than_ambient() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        let camera = Camera::default();
        let meshes = vec![facing_triangle(-3.0)];
        let lights = vec![Light::directional(Vec3::new(0.0, 0.0, 1.0))];

        pipeline.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        let stats = pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &lights, skybox: None });
        pipeline.swap_buffers();

        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.culled, 0);
        assert!(stats.fragments > 0);

        let centroid = Vec3::new(0.0, -1.0 / 3.0, -3.0);
        let [r, g, b, a] = pixel(&pipeline, project(&pipeline, centroid));
        let ambient_only = (0.2 * 255.0) as u8;
        assert!(r > ambient_only && g > ambient_only && b > ambient_only);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_triangle_behind_eye_draws_nothing() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        let camera = Camera::default();
        // Wound so it faces the eye, but every vertex has w <= 0
        let n = Vec3::new(0.0, 0.0, -1.0);
        let vertices = vec![
            VertexIn::new(Vec3::new(-1.0, -1.0, 3.0), n, Vec2::default()),
            VertexIn::new(Vec3::new(0.0, 1.0, 3.0), n, Vec2::default()),
            VertexIn::new(Vec3::new(1.0, -1.0, 3.0), n, Vec2::default()),
        ];
        let meshes = vec![Mesh::new("behind", vertices, vec![0, 1, 2]).unwrap()];
        let lights = vec![Light::directional(Vec3::new(0.0, 0.0, 1.0))];

        pipeline.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        let stats = pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &lights, skybox: None });

        assert_eq!(stats.culled, 0);
        assert_eq!(stats.clipped, 1);
        assert_eq!(stats.fragments, 0);
        assert!(pipeline.back_buffer().depth.iter().all(|&d| d == 1.0));
    }

    #[test]
    fn test_back_face_is_culled() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        let camera = Camera::default();
        let mut mesh = facing_triangle(-3.0);
        mesh.indices = vec![0, 2, 1];
        let stats = pipeline.draw(&DrawList { camera: &camera, meshes: &[mesh], lights: &[], skybox: None });
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.fragments, 0);
    }

    #[test]
    fn test_partially_visible_triangle_is_clipped_not_dropped() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        let camera = Camera::default();
        let n = Vec3::new(0.0, 0.0, 1.0);
        // Spans far beyond the left/right planes
        let vertices = vec![
            VertexIn::new(Vec3::new(-50.0, -1.0, -3.0), n, Vec2::default()),
            VertexIn::new(Vec3::new(50.0, -1.0, -3.0), n, Vec2::default()),
            VertexIn::new(Vec3::new(0.0, 1.0, -3.0), n, Vec2::default()),
        ];
        let meshes = vec![Mesh::new("wide", vertices, vec![0, 1, 2]).unwrap()];
        let stats = pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &[], skybox: None });
        assert_eq!(stats.clipped, 0);
        assert!(stats.rasterized >= 2);
        assert!(stats.fragments > 0);
    }

    #[test]
    fn test_line_mode_draws_white_edges_only() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        pipeline.switch_mode(RenderMode::Line);
        assert_eq!(pipeline.shader(), Shader::Line);

        let camera = Camera::default();
        let meshes = vec![facing_triangle(-3.0)];
        pipeline.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &[], skybox: None });
        pipeline.swap_buffers();

        let apex = project(&pipeline, Vec3::new(0.0, 1.0, -3.0));
        assert_eq!(pixel(&pipeline, apex), [255, 255, 255, 255]);
        let centroid = project(&pipeline, Vec3::new(0.0, -1.0 / 3.0, -3.0));
        assert_eq!(pixel(&pipeline, centroid), [0, 0, 0, 255]);
    }

    #[test]
    fn test_pbr_mode_lights_surface() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        pipeline.switch_mode(RenderMode::Pbr);
        let camera = Camera::default();
        let meshes = vec![facing_triangle(-3.0)];
        let lights = vec![Light::directional(Vec3::new(0.0, 0.0, 1.0))];
        pipeline.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &lights, skybox: None });
        pipeline.swap_buffers();

        let [r, _, _, a] = pixel(&pipeline, project(&pipeline, Vec3::new(0.0, -1.0 / 3.0, -3.0)));
        assert!(r > 100);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_skybox_fills_background_only() {
        let mut pipeline = Pipeline::new(SIZE, SIZE);
        let camera = Camera::default();
        let mut sky = Skybox::new();
        for face in Face::ALL {
            sky.set_face(face, Texture::solid(0, 0, 200));
        }
        let meshes = vec![facing_triangle(-3.0)];
        let lights = vec![Light::directional(Vec3::new(0.0, 0.0, 1.0))];

        pipeline.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        pipeline.draw(&DrawList { camera: &camera, meshes: &meshes, lights: &lights, skybox: Some(&sky) });
        pipeline.swap_buffers();

        assert_eq!(pixel(&pipeline, (2, 2)), [0, 0, 200, 255]);
        let centroid = project(&pipeline, Vec3::new(0.0, -1.0 / 3.0, -3.0));
        assert_eq!(pixel(&pipeline, centroid), [255, 255, 255, 255]);
    }

    #[test]
    fn test_swap_exposes_finished_frame() {
        let mut pipeline = Pipeline::new(4, 4);
        pipeline.clear(Vec4::new(1.0, 0.0, 0.0, 1.0));
        pipeline.swap_buffers();
        pipeline.clear(Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(&pipeline.color_buffer()[..4], &[255, 0, 0, 255]);
        pipeline.swap_buffers();
        assert_eq!(&pipeline.color_buffer()[..4], &[0, 255, 0, 255]);
        assert_eq!(pipeline.color_buffer().len(), 4 * 4 * 4);
    }

    #[test]
    fn test_shadow_maps_rendered_at_pipeline_size() {
        let pipeline = Pipeline::new(32, 16);
        let meshes = vec![facing_triangle(-3.0)];
        let mut lights = vec![Light::directional(Vec3::new(0.0, 0.0, 1.0)), Light::point(Vec3::ZERO)];
        let n = pipeline.render_shadow_maps(&mut lights, &meshes).unwrap();
        assert_eq!(n, 1);
        assert_eq!((lights[0].shadow.width, lights[0].shadow.height), (32, 16));
    }
}
