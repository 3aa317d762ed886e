//! Flatten Pipeline - Single Entry Point per Document
//!
//! validate -> document color -> prune (renders kept layers) -> merge preview.
//! Validation always runs first; there is no way around it.

use image::RgbaImage;
use thiserror::Error;

use crate::color::{document_color, EncodedColor};
use crate::composite::merge_preview;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::layer::{Document, LayerId};
use crate::prune::{prune, Occlusion};
use crate::source::RasterSource;
use crate::validation::{ValidationResult, Validator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Export error: {0}")]
    Export(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One kept layer rendered at canvas size.
#[derive(Debug, Clone)]
pub struct RenderedLayer {
    pub index: usize,
    pub layer_id: LayerId,
    pub name: String,
    pub buffer: RgbaImage,
}

/// Everything produced for one document.
#[derive(Debug, Clone)]
pub struct FlattenedDocument {
    pub width: u32,
    pub height: u32,
    pub color: Option<EncodedColor>,
    pub layers: Vec<RenderedLayer>,
    /// Present only when more than one layer was kept.
    pub preview: Option<RgbaImage>,
    pub occlusions: Vec<Occlusion>,
}

pub struct FlattenPipeline {
    config: EngineConfig,
    validator: Validator,
}

impl FlattenPipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            validator: Validator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate_document(&self, doc: &Document) -> ValidationResult {
        self.validator.validate(doc, &self.config)
    }

    /// The document's metadata color, if it has one.
    pub fn extract_color(&self, doc: &Document) -> Result<Option<EncodedColor>, PipelineError> {
        Ok(document_color(doc, &self.config.color_layer_name)?)
    }

    pub fn flatten<S>(&self, doc: &Document, source: &S) -> Result<FlattenedDocument, PipelineError>
    where
        S: RasterSource + ?Sized,
    {
        let validation = self.validate_document(doc);
        if !validation.valid {
            let messages: Vec<_> = validation.violations.iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }

        let color = self.extract_color(doc)?;
        let outcome = prune(doc, source, &self.config.color_layer_name)?;

        let occlusions = outcome.occlusions;
        let layers: Vec<_> = outcome.kept.into_iter()
            .map(|kept| RenderedLayer {
                index: kept.index,
                layer_id: kept.layer.id,
                name: kept.layer.name.clone(),
                buffer: kept.buffer,
            })
            .collect();

        let preview = if layers.len() > 1 {
            Some(merge_preview(layers.iter().map(|l| &l.buffer), doc.width, doc.height)?)
        } else {
            None
        };

        let color_label = color.map_or_else(|| "none".to_string(), |c| c.to_string());
        tracing::info!(
            kept = layers.len(),
            occlusions = occlusions.len(),
            color = %color_label,
            "document flattened"
        );

        Ok(FlattenedDocument {
            width: doc.width,
            height: doc.height,
            color,
            layers,
            preview,
            occlusions,
        })
    }
}

impl Default for FlattenPipeline {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
