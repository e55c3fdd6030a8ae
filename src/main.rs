//! softraster viewer
//!
//! Usage: `softraster [config.ron]`. A missing config file falls back to the
//! defaults.

use std::path::PathBuf;

use macroquad::prelude::*;
use softraster::app::{FrameInput, Viewer};
use softraster::config::RenderConfig;
use softraster::logging::{init_logging, LoggingConfig};
use softraster::rasterizer::RenderMode;
use softraster::world::Scene;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_CONFIG: &str = "softraster.ron";

fn config_path() -> PathBuf {
    std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

fn load_config() -> RenderConfig {
    let path = config_path();
    if !path.exists() {
        return RenderConfig::default();
    }
    match RenderConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}, using defaults", path.display(), e);
            RenderConfig::default()
        }
    }
}

fn window_conf() -> Conf {
    let config = load_config();
    let (window_width, window_height) = config.window_size();
    Conf {
        window_title: format!("softraster v{}", VERSION),
        window_width,
        window_height,
        window_resizable: false,
        ..Default::default()
    }
}

fn mode_key() -> Option<RenderMode> {
    if is_key_pressed(KeyCode::L) {
        Some(RenderMode::Line)
    } else if is_key_pressed(KeyCode::F) {
        Some(RenderMode::Full)
    } else if is_key_pressed(KeyCode::P) {
        Some(RenderMode::Pbr)
    } else {
        None
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let config = load_config();
    init_logging(LoggingConfig { env_filter: config.log_filter.clone(), ..Default::default() });

    let scene = match Scene::load(&config.scene) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("failed to load scene {}: {}", config.scene.display(), e);
            std::process::exit(1);
        }
    };
    let mut viewer = match Viewer::new(config, scene) {
        Ok(viewer) => viewer,
        Err(e) => {
            log::error!("failed to set up viewer: {}", e);
            std::process::exit(1);
        }
    };

    // Last mouse position while the right button is held
    let mut last_mouse: Option<(f32, f32)> = None;

    loop {
        let mouse = mouse_position();
        let look = if is_mouse_button_down(MouseButton::Right) {
            let offset = last_mouse.map(|(x, y)| ((mouse.0 - x) as f64, (y - mouse.1) as f64));
            last_mouse = Some(mouse);
            offset
        } else {
            last_mouse = None;
            None
        };

        let input = FrameInput {
            dt_ms: get_frame_time() as f64 * 1000.0,
            forward: is_key_down(KeyCode::W),
            back: is_key_down(KeyCode::S),
            left: is_key_down(KeyCode::A),
            right: is_key_down(KeyCode::D),
            look,
            mode: mode_key(),
            quit: is_key_pressed(KeyCode::Escape),
        };

        match viewer.update(&input) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::error!("frame update failed: {}", e);
                break;
            }
        }

        let stats = viewer.render();
        if viewer.frame_count() % 120 == 0 {
            log::debug!("{:?}", stats);
        }

        clear_background(BLACK);
        let (width, height) = (viewer.pipeline.width(), viewer.pipeline.height());
        let texture = Texture2D::from_rgba8(width as u16, height as u16, viewer.frame());
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        let overlay = format!("{} fps  {}", get_fps(), viewer.pipeline.mode().label());
        draw_text(&overlay, 8.0, 20.0, 20.0, YELLOW);

        next_frame().await;
    }
}
