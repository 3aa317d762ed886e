//! Export - PNG Files and Per-Document Report
//!
//! Naming follows the output index: `stem.png` for a sole survivor,
//! `stem_01.png`.. for numbered layers, `stem_MERGED.png` for the preview.

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::color::EncodedColor;
use crate::hashing::{buffer_digest, compute_manifest_hash};
use crate::pipeline::{FlattenedDocument, PipelineError};
use crate::prune::Occlusion;
use crate::ENGINE_VERSION;

pub const PREVIEW_SUFFIX: &str = "MERGED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    /// 0 for an unnumbered sole layer; `None` for the merged preview.
    pub index: Option<usize>,
    pub filename: String,
    pub size: [u32; 2],
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccludedLayers {
    pub occluder: String,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub id: String,
    pub source: String,
    pub processed_at: DateTime<Utc>,
    pub engine_version: String,
    pub color: Option<EncodedColor>,
    pub exports: Vec<ExportedFile>,
    pub occlusions: Vec<OccludedLayers>,
    pub manifest_hash: String,
}

/// File name for a layer output.
pub fn layer_file_name(stem: &str, index: usize) -> String {
    if index == 0 {
        format!("{}.png", stem)
    } else {
        format!("{}_{:02}.png", stem, index)
    }
}

/// File name for the merged preview, tagged with the document color if any.
pub fn preview_file_name(stem: &str, color: Option<&EncodedColor>) -> String {
    match color {
        Some(c) => format!("{}_{}_{}.png", stem, PREVIEW_SUFFIX, c.hex()),
        None => format!("{}_{}.png", stem, PREVIEW_SUFFIX),
    }
}

fn write_png(dir: &Path, filename: String, index: Option<usize>, buffer: &RgbaImage) -> Result<ExportedFile, PipelineError> {
    let path: PathBuf = dir.join(&filename);
    buffer.save_with_format(&path, image::ImageFormat::Png)?;
    tracing::debug!(path = %path.display(), "wrote png");
    Ok(ExportedFile {
        index,
        filename,
        size: [buffer.width(), buffer.height()],
        sha256: buffer_digest(buffer),
    })
}

/// Write every output of `flat` into `dir` and describe them in a report.
pub fn export_document(flat: &FlattenedDocument, dir: &Path, stem: &str, source: &str) -> Result<DocumentReport, PipelineError> {
    let mut exports = Vec::with_capacity(flat.layers.len() + 1);

    for layer in &flat.layers {
        let filename = layer_file_name(stem, layer.index);
        exports.push(write_png(dir, filename, Some(layer.index), &layer.buffer)?);
    }
    if let Some(preview) = &flat.preview {
        let filename = preview_file_name(stem, flat.color.as_ref());
        exports.push(write_png(dir, filename, None, preview)?);
    }

    let mut report = DocumentReport {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        processed_at: Utc::now(),
        engine_version: ENGINE_VERSION.to_string(),
        color: flat.color,
        exports,
        occlusions: flat.occlusions.iter().map(summarize).collect(),
        manifest_hash: String::new(), // Computed after
    };
    report.manifest_hash = compute_manifest_hash(&report)?;

    Ok(report)
}

fn summarize(o: &Occlusion) -> OccludedLayers {
    OccludedLayers {
        occluder: o.occluder_name.clone(),
        dropped: o.dropped.len(),
    }
}
