//! Viewer state
//!
//! Owns the pipeline and the loaded scene. Input arrives as a plain
//! `FrameInput` so the update logic has no dependency on the window backend.

use std::path::PathBuf;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::rasterizer::{export_shadow_maps, DrawList, FrameStats, Pipeline, RenderMode};
use crate::world::Scene;

/// Input gathered by the window loop for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Milliseconds since the previous frame
    pub dt_ms: f64,
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Mouse offset while rotating: (x, y) with y growing upward
    pub look: Option<(f64, f64)>,
    pub mode: Option<RenderMode>,
    pub quit: bool,
}

pub struct Viewer {
    pub config: RenderConfig,
    pub pipeline: Pipeline,
    pub scene: Scene,
    pub last_stats: FrameStats,
    frame_count: u64,
}

impl Viewer {
    /// Set up the pipeline from `config` and render the initial shadow maps
    pub fn new(config: RenderConfig, mut scene: Scene) -> Result<Self> {
        let mut pipeline = Pipeline::new(config.width, config.height);
        pipeline.set_projection(config.projection());
        pipeline.switch_mode(config.mode);

        scene.camera.speed = config.camera_speed;
        scene.camera.sensitivity = config.mouse_sensitivity;
        scene.camera.update_view();

        pipeline.render_shadow_maps(&mut scene.lights, &scene.meshes)?;
        if config.export_shadows {
            let written = export_shadow_maps(&scene.lights, &config.shadow_dir)?;
            log::info!("exported {} shadow map(s) to {}", written.len(), config.shadow_dir.display());
        }

        Ok(Self { config, pipeline, scene, last_stats: FrameStats::default(), frame_count: 0 })
    }

    /// Apply one frame of input. Returns false once the viewer should close.
    pub fn update(&mut self, input: &FrameInput) -> Result<bool> {
        if input.quit {
            log::info!("quit after {} frames", self.frame_count);
            return Ok(false);
        }

        let camera = &mut self.scene.camera;
        if input.forward {
            camera.move_forward(input.dt_ms);
        }
        if input.back {
            camera.move_back(input.dt_ms);
        }
        if input.left {
            camera.move_left(input.dt_ms);
        }
        if input.right {
            camera.move_right(input.dt_ms);
        }
        if let Some((dx, dy)) = input.look {
            camera.rotate(dx, dy);
        }
        camera.update_view();

        if let Some(mode) = input.mode {
            self.pipeline.switch_mode(mode);
        }

        if self.config.refresh_shadows {
            self.pipeline.render_shadow_maps(&mut self.scene.lights, &self.scene.meshes)?;
        }
        Ok(true)
    }

    /// Clear, draw and swap. The finished frame is in `frame()`.
    pub fn render(&mut self) -> FrameStats {
        self.pipeline.clear(self.config.clear_color());
        let list = DrawList {
            camera: &self.scene.camera,
            meshes: &self.scene.meshes,
            lights: &self.scene.lights,
            skybox: self.scene.skybox.as_ref(),
        };
        self.last_stats = self.pipeline.draw(&list);
        self.pipeline.swap_buffers();
        self.frame_count += 1;
        self.last_stats
    }

    pub fn frame(&self) -> &[u8] {
        self.pipeline.color_buffer()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Write the current shadow maps next to the configured directory
    pub fn export_shadows(&self) -> Result<Vec<PathBuf>> {
        export_shadow_maps(&self.scene.lights, &self.config.shadow_dir)
    }
}
