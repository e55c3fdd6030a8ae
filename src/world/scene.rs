//! Scene description loading
//!
//! Line-oriented text format:
//!
//! ```text
//! scene0
//! m 1
//! 0 cube brick
//! p 0 0 -5
//! r 0 1 0 45
//! s 1 1 1
//! l 2
//! t dl
//! d 1 1 1
//! t sl
//! p 0 3 0
//! d 0 1 0
//! s
//! sky
//! ```
//!
//! Assets are resolved relative to the scene file: `meshes/<obj>.obj`,
//! `textures/<tex>/<tex>_{albedo,normal}.png` and `skybox/<name>_<face>.png`.
//! Any asset that fails to load fails the whole scene.

use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};
use crate::rasterizer::{Light, Vec3};

use super::camera::Camera;
use super::mesh::{model_matrix, Mesh};
use super::skybox::Skybox;

const HEADER: &str = "scene0";

#[derive(Debug, Clone, PartialEq)]
pub struct MeshEntry {
    pub obj: String,
    pub texture: String,
    pub position: Vec3,
    pub axis: Vec3,
    /// Rotation about `axis`, degrees
    pub degrees: f64,
    pub scale: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightEntry {
    Directional { direction: Vec3 },
    Point { position: Vec3 },
    Spot { position: Vec3, direction: Vec3 },
}

/// Parsed scene file, before any asset is loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDescription {
    pub meshes: Vec<MeshEntry>,
    pub lights: Vec<LightEntry>,
    pub skybox: Option<String>,
}

/// Non-blank lines with their 1-based line numbers
struct Lines<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect();
        Self { lines, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn next_line(&mut self, what: &str) -> Result<(usize, Vec<&'a str>)> {
        match self.lines.get(self.pos) {
            Some(&(n, l)) => {
                self.pos += 1;
                Ok((n, l.split_whitespace().collect()))
            }
            None => {
                let after = self.lines.last().map_or(1, |&(n, _)| n + 1);
                Err(RenderError::parse(after, format!("unexpected end of file, expected {}", what)))
            }
        }
    }

    /// Next line, which must start with `key` and carry `count` numbers
    fn numbers(&mut self, key: &str, count: usize) -> Result<Vec<f64>> {
        let (n, tokens) = self.next_line(&format!("'{}' line", key))?;
        if tokens.first() != Some(&key) {
            return Err(RenderError::parse(n, format!("expected '{}' line", key)));
        }
        if tokens.len() != count + 1 {
            return Err(RenderError::parse(n, format!("'{}' needs {} values, got {}", key, count, tokens.len() - 1)));
        }
        tokens[1..]
            .iter()
            .map(|t| t.parse::<f64>().map_err(|_| RenderError::parse(n, format!("invalid number '{}'", t))))
            .collect()
    }

    fn vec3(&mut self, key: &str) -> Result<Vec3> {
        let v = self.numbers(key, 3)?;
        Ok(Vec3::new(v[0], v[1], v[2]))
    }
}

fn parse_count(n: usize, tokens: &[&str]) -> Result<usize> {
    match tokens {
        [_, count] => count
            .parse()
            .map_err(|_| RenderError::parse(n, format!("invalid count '{}'", count))),
        _ => Err(RenderError::parse(n, "expected a single count")),
    }
}

impl SceneDescription {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Lines::new(text);
        let (n, header) = lines.next_line("header")?;
        if header.first() != Some(&HEADER) {
            return Err(RenderError::parse(n, format!("scene file must start with '{}'", HEADER)));
        }

        let mut desc = SceneDescription::default();
        while !lines.is_done() {
            let (n, tokens) = lines.next_line("section")?;
            match tokens.first().copied() {
                Some("m") => {
                    for _ in 0..parse_count(n, &tokens)? {
                        desc.meshes.push(parse_mesh(&mut lines)?);
                    }
                }
                Some("l") => {
                    for _ in 0..parse_count(n, &tokens)? {
                        desc.lights.push(parse_light(&mut lines)?);
                    }
                }
                Some("s") => {
                    let (_, name) = lines.next_line("skybox name")?;
                    desc.skybox = Some(name.join(" "));
                }
                Some(other) => {
                    return Err(RenderError::parse(n, format!("unknown section '{}'", other)));
                }
                None => {}
            }
        }
        Ok(desc)
    }
}

fn parse_mesh(lines: &mut Lines) -> Result<MeshEntry> {
    let (n, tokens) = lines.next_line("mesh entry")?;
    let [_, obj, texture] = tokens.as_slice() else {
        return Err(RenderError::parse(n, "mesh entry needs '<index> <obj> <texture>'"));
    };
    let (obj, texture) = (obj.to_string(), texture.to_string());
    let position = lines.vec3("p")?;
    let r = lines.numbers("r", 4)?;
    let scale = lines.vec3("s")?;
    Ok(MeshEntry {
        obj,
        texture,
        position,
        axis: Vec3::new(r[0], r[1], r[2]),
        degrees: r[3],
        scale,
    })
}

fn parse_light(lines: &mut Lines) -> Result<LightEntry> {
    let (n, tokens) = lines.next_line("light type")?;
    match tokens.as_slice() {
        ["t", "dl"] => Ok(LightEntry::Directional { direction: lines.vec3("d")? }),
        ["t", "pl"] => Ok(LightEntry::Point { position: lines.vec3("p")? }),
        ["t", "sl"] => {
            let position = lines.vec3("p")?;
            let direction = lines.vec3("d")?;
            Ok(LightEntry::Spot { position, direction })
        }
        _ => Err(RenderError::parse(n, "expected 't dl', 't pl' or 't sl'")),
    }
}

impl LightEntry {
    pub fn build(&self) -> Light {
        match *self {
            LightEntry::Directional { direction } => Light::directional(direction),
            LightEntry::Point { position } => Light::point(position),
            LightEntry::Spot { position, direction } => Light::spot(position, direction),
        }
    }
}

/// Everything the pipeline draws
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    pub meshes: Vec<Mesh>,
    pub lights: Vec<Light>,
    pub skybox: Option<Skybox>,
}

impl Scene {
    /// Parse a scene file and load every asset it references
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        let desc = SceneDescription::parse(&text)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let scene = Self::from_description(&desc, &base)?;
        log::info!(
            "loaded scene {} ({} meshes, {} lights, skybox: {})",
            path.display(),
            scene.meshes.len(),
            scene.lights.len(),
            scene.skybox.is_some()
        );
        Ok(scene)
    }

    pub fn from_description(desc: &SceneDescription, base: &Path) -> Result<Self> {
        let mut meshes = Vec::with_capacity(desc.meshes.len());
        for entry in &desc.meshes {
            let mut mesh = Mesh::load_obj(base.join("meshes").join(format!("{}.obj", entry.obj)))?;
            mesh.load_textures(base.join("textures").join(&entry.texture), &entry.texture)?;
            mesh.set_model_matrix(model_matrix(entry.position, entry.axis, entry.degrees, entry.scale))?;
            meshes.push(mesh);
        }

        let lights = desc.lights.iter().map(LightEntry::build).collect();
        let skybox = match &desc.skybox {
            Some(name) => Some(Skybox::load(base.join("skybox"), name)?),
            None => None,
        };

        Ok(Self { camera: Camera::default(), meshes, lights, skybox })
    }
}
