//! Error taxonomy for the flattening engine.

use thiserror::Error;

use crate::layer::{LayerId, LayerKind};

/// Failure reported by a [`RasterSource`](crate::source::RasterSource) while
/// fetching a layer's pixel content.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("No raster content for layer {0}")]
    Missing(LayerId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors produced by the visibility, color, pruning and compositing steps.
///
/// Every variant is permanent for the document that produced it. Nothing is
/// retried and nothing is masked.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Structural error at layer {layer}: {message}")]
    Structural { layer: LayerId, message: String },

    #[error("Unsupported content in layer \"{name}\": {kind} layers must be rasterized upstream")]
    UnsupportedContent { name: String, kind: LayerKind },

    #[error("Malformed color layer \"{name}\": {reason}")]
    MalformedColor { name: String, reason: String },

    #[error("Canvas {width}x{height} exceeds the {limit} pixel limit")]
    CanvasTooLarge { width: u32, height: u32, limit: u64 },

    #[error("Rasterization failed for layer \"{name}\": {source}")]
    Rasterization {
        name: String,
        #[source]
        source: RasterError,
    },
}

impl EngineError {
    pub fn structural(layer: LayerId, message: impl Into<String>) -> Self {
        Self::Structural {
            layer,
            message: message.into(),
        }
    }

    pub fn malformed_color(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedColor {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
