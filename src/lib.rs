//! softraster: a CPU software rasterizer
//!
//! Meshes go through a vertex stage, back-face culling, homogeneous clipping
//! and a perspective-correct, depth-tested rasterizer into an RGBA frame
//! buffer. Shading is Phong (with normal maps and directional shadow maps) or
//! Cook-Torrance PBR; a wireframe line mode is also available.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod rasterizer;
pub mod world;

pub use error::{RenderError, Result};
