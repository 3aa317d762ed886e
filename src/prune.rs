//! Occlusion Pruning
//!
//! One forward pass over the layer list, bottom to top. Each surviving layer
//! is rendered alone onto a transparent canvas; if that canvas comes out
//! fully opaque, nothing kept so far can show through it and the kept list
//! restarts from that layer. The rendered canvas of every kept layer is
//! handed on, so content is fetched once per layer.

use image::RgbaImage;
use serde::Serialize;

use crate::composite::{check_canvas, is_opaque, render_layer};
use crate::error::EngineError;
use crate::layer::{Document, Layer, LayerId, LayerKind};
use crate::source::RasterSource;
use crate::visibility::is_visible;

/// A layer that must be rendered, with its 1-based output number.
/// `index == 0` marks the sole survivor, which is written unnumbered.
#[derive(Debug, Clone)]
pub struct KeptLayer<'a> {
    pub layer: &'a Layer,
    pub index: usize,
    /// The layer alone on a transparent canvas, as `render_layer` produces it.
    pub buffer: RgbaImage,
}

impl KeptLayer<'_> {
    pub fn is_unnumbered(&self) -> bool {
        self.index == 0
    }
}

/// Diagnostic record: `occluder` covered the whole canvas and every layer
/// in `dropped` was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occlusion {
    pub occluder: LayerId,
    pub occluder_name: String,
    pub dropped: Vec<LayerId>,
}

#[derive(Debug)]
pub struct PruneOutcome<'a> {
    pub kept: Vec<KeptLayer<'a>>,
    pub occlusions: Vec<Occlusion>,
}

/// Compute the minimal ordered set of layers that needs rendering.
///
/// Layers named `metadata_name` carry document metadata, not artwork, and
/// are never kept.
pub fn prune<'a, S>(doc: &'a Document, source: &S, metadata_name: &str) -> Result<PruneOutcome<'a>, EngineError>
where
    S: RasterSource + ?Sized,
{
    check_canvas(doc.width, doc.height)?;

    let mut kept: Vec<(&'a Layer, RgbaImage)> = vec![];
    let mut occlusions = vec![];

    for layer in &doc.layers {
        if !is_visible(doc, layer)? || layer.rect.is_empty() {
            tracing::debug!(layer = layer.id, name = %layer.name, "skipping hidden or empty layer");
            continue;
        }
        if layer.name == metadata_name {
            tracing::debug!(layer = layer.id, "skipping color metadata layer");
            continue;
        }
        if matches!(layer.kind, LayerKind::Shape | LayerKind::Text) {
            return Err(EngineError::UnsupportedContent {
                name: layer.name.clone(),
                kind: layer.kind,
            });
        }

        let scratch = render_layer(layer, source, doc.width, doc.height)?;

        if is_opaque(&scratch) && !kept.is_empty() {
            tracing::warn!(
                layer = layer.id,
                name = %layer.name,
                dropped = kept.len(),
                "layers behind \"{}\" are hidden",
                layer.name
            );
            occlusions.push(Occlusion {
                occluder: layer.id,
                occluder_name: layer.name.clone(),
                dropped: kept.iter().map(|(l, _)| l.id).collect(),
            });
            kept.clear();
        }
        tracing::debug!(layer = layer.id, name = %layer.name, position = kept.len() + 1, "keeping layer");
        kept.push((layer, scratch));
    }

    let numbered = kept.len() > 1;
    let kept = kept
        .into_iter()
        .enumerate()
        .map(|(i, (layer, buffer))| KeptLayer {
            layer,
            index: if numbered { i + 1 } else { 0 },
            buffer,
        })
        .collect();

    Ok(PruneOutcome { kept, occlusions })
}
