//! Scene content: meshes, camera, skybox and the scene file loader

mod camera;
mod mesh;
mod scene;
mod skybox;

pub use camera::*;
pub use mesh::*;
pub use scene::*;
pub use skybox::*;
