//! Document color extraction from the solid-fill metadata layer.
//!
//! The metadata layer is found by name, never by position. Its visibility
//! does not matter: a hidden metadata layer still carries the color.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;
use crate::layer::{Descriptor, Document, Layer, LayerKind, OPACITY_MAX};

pub const FILL_COLOR_KEY: &str = "color";
pub const RED_KEY: &str = "red";
pub const GREEN_KEY: &str = "green";
pub const BLUE_KEY: &str = "blue";

/// Color plus opacity, rendered as `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EncodedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl EncodedColor {
    /// Hex digits without the leading `#`.
    pub fn hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for EncodedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex())
    }
}

impl From<EncodedColor> for String {
    fn from(c: EncodedColor) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for EncodedColor {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 8 && h.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| format!("expected #rrggbbaa, got {:?}", s))?;
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("{:?}: {}", s, e))
        };
        Ok(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        })
    }
}

/// Round half away from zero.
pub fn round_half_away(x: f64) -> f64 {
    if x < 0.0 {
        (x - 0.5).ceil()
    } else {
        (x + 0.5).floor()
    }
}

/// Extract the encoded color from `layer` if it is the metadata layer.
///
/// Returns `Ok(None)` for any layer not named `metadata_name`.
pub fn extract_color(layer: &Layer, metadata_name: &str) -> Result<Option<EncodedColor>, EngineError> {
    if layer.name != metadata_name {
        return Ok(None);
    }
    if layer.kind != LayerKind::SolidFill {
        return Err(EngineError::malformed_color(
            &layer.name,
            format!("expected a solid-fill layer, found {}", layer.kind),
        ));
    }

    let fill = layer
        .fill
        .as_ref()
        .ok_or_else(|| EngineError::malformed_color(&layer.name, "layer has no fill attributes"))?;
    let color = fill
        .get(FILL_COLOR_KEY)
        .ok_or_else(|| EngineError::malformed_color(&layer.name, format!("missing \"{}\"", FILL_COLOR_KEY)))?;

    let r = channel(layer, color, RED_KEY)?;
    let g = channel(layer, color, GREEN_KEY)?;
    let b = channel(layer, color, BLUE_KEY)?;

    if layer.opacity > OPACITY_MAX {
        return Err(EngineError::malformed_color(
            &layer.name,
            format!("opacity {} outside 0-{}", layer.opacity, OPACITY_MAX),
        ));
    }
    let a = round_half_away(f64::from(layer.opacity) / f64::from(OPACITY_MAX) * 255.0) as u8;

    Ok(Some(EncodedColor { r, g, b, a }))
}

fn channel(layer: &Layer, color: &Descriptor, key: &str) -> Result<u8, EngineError> {
    let value = color
        .get(key)
        .ok_or_else(|| EngineError::malformed_color(&layer.name, format!("missing \"{}\" channel", key)))?;
    let value = value
        .as_number()
        .ok_or_else(|| EngineError::malformed_color(&layer.name, format!("\"{}\" is not numeric", key)))?;
    let rounded = round_half_away(value);
    if !(0.0..=255.0).contains(&rounded) {
        return Err(EngineError::malformed_color(
            &layer.name,
            format!("\"{}\" = {} outside 0-255", key, value),
        ));
    }
    Ok(rounded as u8)
}

/// Find the document's single metadata color, if any.
pub fn document_color(doc: &Document, metadata_name: &str) -> Result<Option<EncodedColor>, EngineError> {
    let mut found = None;
    for layer in &doc.layers {
        if let Some(color) = extract_color(layer, metadata_name)? {
            if found.is_some() {
                return Err(EngineError::malformed_color(
                    &layer.name,
                    "more than one color layer in document",
                ));
            }
            tracing::debug!(layer = layer.id, color = %color, "extracted document color");
            found = Some(color);
        }
    }
    Ok(found)
}
