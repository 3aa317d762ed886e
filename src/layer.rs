//! Document Model - Read-Only Layer Tree
//!
//! Layers are stored bottom-to-top in one flat list. Groups are ordinary
//! entries in that list; membership is expressed through [`Parent`] links
//! (by id, never by owning pointer) and the group's `children` list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type LayerId = u32;

/// Maximum layer opacity.
pub const OPACITY_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Raster,
    SolidFill,
    Text,
    Shape,
    Group,
    #[default]
    Unspecified,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerKind::Raster => "raster",
            LayerKind::SolidFill => "solid-fill",
            LayerKind::Text => "text",
            LayerKind::Shape => "shape",
            LayerKind::Group => "group",
            LayerKind::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

/// Where a layer hangs in the tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Parent {
    #[default]
    Root,
    Layer(LayerId),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorMode {
    #[default]
    Rgb,
    Cmyk,
    Grayscale,
    Indexed,
    Lab,
    Multichannel,
}

/// Integer rectangle in canvas space. May lie partly or wholly outside the canvas.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The part of a layer's content that lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect content of `content` size, anchored at this rectangle's
    /// origin and clipped to the rectangle, with a `canvas_w` x `canvas_h` canvas.
    pub fn place(&self, content: (u32, u32), canvas_w: u32, canvas_h: u32) -> Option<Placement> {
        let w = i64::from(self.width.min(content.0));
        let h = i64::from(self.height.min(content.1));
        let (x, y) = (i64::from(self.x), i64::from(self.y));

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(i64::from(canvas_w));
        let y1 = (y + h).min(i64::from(canvas_h));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(Placement {
            src_x: (x0 - x) as u32,
            src_y: (y0 - y) as u32,
            dst_x: x0 as u32,
            dst_y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Structured attribute bag attached to solid-fill layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Descriptor {
    Number(f64),
    Text(String),
    Bag(BTreeMap<String, Descriptor>),
}

impl Descriptor {
    pub fn get(&self, key: &str) -> Option<&Descriptor> {
        match self {
            Descriptor::Bag(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Descriptor::Number(n) => Some(*n),
            _ => None,
        }
    }
}

fn default_true() -> bool { true }
fn default_opacity() -> u8 { OPACITY_MAX }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// 0-100
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default)]
    pub parent: Parent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Descriptor>,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, kind: LayerKind, rect: Rect) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            opacity: OPACITY_MAX,
            rect,
            kind,
            parent: Parent::Root,
            children: vec![],
            fill: None,
        }
    }

    /// The layer's own flags allow it to show (ignores ancestors).
    pub fn shows(&self) -> bool {
        self.visible && self.opacity != 0
    }
}

/// A parsed layered document. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub color_mode: ColorMode,
    /// Bottom-to-top stacking order.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Document {
    pub fn new(width: u32, height: u32, layers: Vec<Layer>) -> Self {
        Self {
            width,
            height,
            color_mode: ColorMode::Rgb,
            layers,
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self, crate::config::ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_inside_canvas() {
        let p = Rect::new(2, 3, 4, 5).place((4, 5), 10, 10).unwrap();
        assert_eq!(p, Placement { src_x: 0, src_y: 0, dst_x: 2, dst_y: 3, width: 4, height: 5 });
    }

    #[test]
    fn test_place_negative_offset_crops_source() {
        let p = Rect::new(-3, -1, 5, 5).place((5, 5), 10, 10).unwrap();
        assert_eq!((p.src_x, p.src_y, p.dst_x, p.dst_y), (3, 1, 0, 0));
        assert_eq!((p.width, p.height), (2, 4));
    }

    #[test]
    fn test_place_overhanging_canvas() {
        let p = Rect::new(8, 8, 5, 5).place((5, 5), 10, 10).unwrap();
        assert_eq!((p.width, p.height), (2, 2));
    }

    #[test]
    fn test_place_outside_canvas() {
        assert!(Rect::new(20, 0, 5, 5).place((5, 5), 10, 10).is_none());
        assert!(Rect::new(-5, 0, 5, 5).place((5, 5), 10, 10).is_none());
    }

    #[test]
    fn test_place_clips_to_smaller_content() {
        let p = Rect::new(0, 0, 8, 8).place((3, 2), 10, 10).unwrap();
        assert_eq!((p.width, p.height), (3, 2));
    }

    #[test]
    fn test_layer_defaults_from_json() {
        let layer: Layer = serde_json::from_str(r#"{"id": 7, "name": "bg", "kind": "raster"}"#).unwrap();
        assert!(layer.visible);
        assert_eq!(layer.opacity, 100);
        assert_eq!(layer.parent, Parent::Root);
    }

    #[test]
    fn test_descriptor_nested_bag() {
        let d: Descriptor = serde_json::from_str(r#"{"color": {"red": 12, "name": "x"}}"#).unwrap();
        let color = d.get("color").unwrap();
        assert_eq!(color.get("red").and_then(Descriptor::as_number), Some(12.0));
        assert_eq!(color.get("name").and_then(Descriptor::as_number), None);
    }
}
