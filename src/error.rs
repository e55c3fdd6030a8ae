//! Error type shared by the whole renderer
//!
//! Only data/programmer errors end up here (singular matrices, unreadable
//! assets, malformed scene or config files). Pixel-level problems such as
//! out-of-bounds writes are silently clamped by the buffers instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Matrix inversion hit a zero determinant
    #[error("matrix is singular (determinant is zero)")]
    SingularMatrix,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("mesh index {index} out of range for {vertex_count} vertices")]
    MeshIndex { index: usize, vertex_count: usize },

    #[error("scene parse error at line {line}: {message}")]
    SceneParse { line: usize, message: String },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("config serialize error: {0}")]
    ConfigWrite(#[from] ron::Error),
}

impl RenderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io { path: path.into(), source }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        RenderError::SceneParse { line, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
