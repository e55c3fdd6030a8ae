//! CPU rasterizer
//!
//! Everything between a mesh and a finished RGBA frame:
//! - f64 vector/matrix math and the AABB used for light fitting
//! - Vertex stage, Phong and Cook-Torrance fragment shading
//! - Homogeneous clipping against the seven frustum planes
//! - Perspective-correct triangle fill and Bresenham lines, both depth tested
//! - Directional-light shadow maps

mod clip;
mod light;
mod math;
mod pipeline;
mod render;
mod shader;
mod shadow;
mod types;

pub use clip::*;
pub use light::*;
pub use math::*;
pub use pipeline::*;
pub use render::*;
pub use shader::*;
pub use shadow::*;
pub use types::*;
