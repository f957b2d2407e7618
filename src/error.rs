/// Error types for the fallible boundaries of the renderer:
/// mesh validation at load time, configuration files and image output.
/// Per-triangle degeneracies are never errors; the pipeline skips them.
use std::path::PathBuf;
use thiserror::Error;

/// Malformed mesh data, rejected once when the mesh is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("index {index} at position {position} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        index: u32,
        position: usize,
        vertex_count: usize,
    },

    #[error("triangle list has {len} indices, which is not a multiple of 3")]
    IncompleteTriangleList { len: usize },

    #[error("triangle strip needs at least 3 indices, got {len}")]
    StripTooShort { len: usize },

    #[error("texture id {id} is not present in the registry")]
    UnknownTexture { id: usize },
}

/// Failure to load or parse a render configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid render config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Failures surfaced by the frame orchestrator and texture construction.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid framebuffer dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("texture data has {actual} texels, expected {expected} for {width}x{height}")]
    TextureSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("failed to encode framebuffer image: {0}")]
    Image(#[from] image::ImageError),
}
