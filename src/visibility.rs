//! Effective layer visibility.

use std::collections::HashSet;

use crate::error::EngineError;
use crate::layer::{Document, Layer, LayerKind, Parent};

/// Whether `layer` actually shows in `doc`.
///
/// Groups never show themselves. Any ancestor that is hidden or at zero
/// opacity hides the whole subtree, whatever the layer's own flags say.
/// The ancestor walk is iterative and stops with a structural error on a
/// cycle or a dangling parent id.
pub fn is_visible(doc: &Document, layer: &Layer) -> Result<bool, EngineError> {
    if layer.kind == LayerKind::Group || !layer.shows() {
        return Ok(false);
    }

    let mut visited = HashSet::with_capacity(4);
    visited.insert(layer.id);
    let mut parent = layer.parent;

    loop {
        let id = match parent {
            Parent::Root => return Ok(true),
            Parent::Layer(id) => id,
        };
        if !visited.insert(id) {
            return Err(EngineError::structural(
                layer.id,
                format!("ancestor cycle through layer {}", id),
            ));
        }
        let ancestor = doc.layer(id).ok_or_else(|| {
            EngineError::structural(layer.id, format!("parent layer {} does not exist", id))
        })?;
        if !ancestor.shows() {
            return Ok(false);
        }
        parent = ancestor.parent;
    }
}
