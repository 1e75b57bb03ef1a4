//! Load failures.
//!
//! Every stage of a scene load reports through [`SceneError`]. A load either
//! returns a complete [`Scene`](crate::data_structures::scene::Scene) or one of
//! these errors, never both.

use std::path::PathBuf;

use crate::data_structures::document::{ComponentType, Dimensions, PrimitiveMode};

/// Errors that abort a scene load.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("file not found: '{}'", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    DocumentMalformed(String),

    #[error("unsupported topology {mode:?} in mesh {mesh}, primitive {primitive} (only triangle lists are supported)")]
    UnsupportedTopology {
        mesh: usize,
        primitive: usize,
        mode: PrimitiveMode,
    },

    #[error("unsupported format for {semantic} accessor {accessor}: {dimensions:?} of {component_type:?}")]
    UnsupportedAccessorFormat {
        accessor: usize,
        semantic: String,
        component_type: ComponentType,
        dimensions: Dimensions,
    },

    #[error("failed to decode texture '{label}'")]
    TextureDecodeFailed {
        label: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create GPU resource '{label}': {reason}")]
    GpuResourceCreationFailed { label: String, reason: String },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
}

impl SceneError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        SceneError::DocumentMalformed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
