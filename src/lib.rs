//! Layerflat Core - Layered Document Flattening Engine
//!
//! Turns a parsed layer stack into a few flattened rasters:
//! 1. Visibility: which layers actually show, given their ancestors
//! 2. Color: the `#rrggbbaa` carried by the solid-fill metadata layer
//! 3. Pruning: drop every layer fully covered by a later opaque one
//! 4. Compositing: REPLACE per layer, source-over for the merged preview
//!
//! Documents share no state; callers may process a batch in parallel.

pub mod error;
pub mod layer;
pub mod source;
pub mod visibility;
pub mod color;
pub mod prune;
pub mod composite;
pub mod config;
pub mod validation;
pub mod hashing;
pub mod pipeline;
pub mod export;
pub mod logging;

pub use error::{EngineError, RasterError};
pub use layer::{Document, Layer, LayerId, LayerKind, Parent, Rect, Descriptor, ColorMode};
pub use source::{RasterSource, FileRasterSource, MemoryRasterSource};
pub use visibility::is_visible;
pub use color::{extract_color, document_color, EncodedColor};
pub use prune::{prune, KeptLayer, Occlusion, PruneOutcome};
pub use composite::{render_layer, merge_preview, source_over};
pub use config::{EngineConfig, FailureMode};
pub use validation::{ValidationResult, ValidationViolation, ViolationSeverity};
pub use pipeline::{FlattenPipeline, FlattenedDocument, RenderedLayer, PipelineError};
pub use export::{export_document, DocumentReport, ExportedFile};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
