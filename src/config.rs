//! Viewer configuration, stored as RON

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::rasterizer::{Mat4, RenderMode, Vec4};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Framebuffer size in pixels
    pub width: usize,
    pub height: usize,
    /// Window pixels per framebuffer pixel
    pub scale: f32,
    /// Vertical field of view, degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    /// RGBA, 0..1
    pub clear_color: [f64; 4],
    pub mode: RenderMode,
    pub scene: PathBuf,
    /// Write every shadow map as PNG after the first render
    pub export_shadows: bool,
    pub shadow_dir: PathBuf,
    /// Refit and redraw shadow maps every frame instead of once at load
    pub refresh_shadows: bool,
    /// Units per millisecond
    pub camera_speed: f64,
    /// Degrees per pixel of mouse drag
    pub mouse_sensitivity: f64,
    /// env_logger filter, overrides RUST_LOG when set
    pub log_filter: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            scale: 1.0,
            fov: 60.0,
            near: 1.0,
            far: 30.0,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            mode: RenderMode::Full,
            scene: PathBuf::from("assets/scene.txt"),
            export_shadows: false,
            shadow_dir: PathBuf::from("shadows"),
            refresh_shadows: false,
            camera_speed: 0.01,
            mouse_sensitivity: 0.25,
            log_filter: None,
        }
    }
}

impl RenderConfig {
    /// Load a config from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("loaded config {}", path.display());
        Ok(config)
    }

    /// Save a config to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());

        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents).map_err(|e| RenderError::io(path, e))?;
        Ok(())
    }

    /// Parse a config from a RON string. Missing fields take their defaults.
    pub fn from_ron_str(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect(), self.near, self.far)
    }

    pub fn clear_color(&self) -> Vec4 {
        let [r, g, b, a] = self.clear_color;
        Vec4::new(r, g, b, a)
    }

    /// Window size in screen pixels
    pub fn window_size(&self) -> (i32, i32) {
        (
            (self.width as f32 * self.scale).round() as i32,
            (self.height as f32 * self.scale).round() as i32,
        )
    }
}
