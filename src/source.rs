//! Raster Content Sources
//!
//! The engine never decodes a document container itself. Pixel content for
//! a layer comes from a [`RasterSource`], called synchronously per layer.

use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::RasterError;
use crate::layer::{Layer, LayerId};

/// Provides a layer's pixel content, sized to the layer's rectangle.
pub trait RasterSource {
    fn raster_content(&self, layer: &Layer) -> Result<RgbaImage, RasterError>;
}

/// Reads `<dir>/<layer id>.png` for each layer.
pub struct FileRasterSource {
    dir: PathBuf,
}

impl FileRasterSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: LayerId) -> PathBuf {
        self.dir.join(format!("{}.png", id))
    }
}

impl RasterSource for FileRasterSource {
    fn raster_content(&self, layer: &Layer) -> Result<RgbaImage, RasterError> {
        let path = self.path_for(layer.id);
        if !path.exists() {
            return Err(RasterError::Missing(layer.id));
        }
        Ok(image::open(&path)?.to_rgba8())
    }
}

/// Holds decoded content in memory, keyed by layer id.
#[derive(Default)]
pub struct MemoryRasterSource {
    content: HashMap<LayerId, RgbaImage>,
}

impl MemoryRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: LayerId, image: RgbaImage) {
        self.content.insert(id, image);
    }

    pub fn with(mut self, id: LayerId, image: RgbaImage) -> Self {
        self.insert(id, image);
        self
    }
}

impl RasterSource for MemoryRasterSource {
    fn raster_content(&self, layer: &Layer) -> Result<RgbaImage, RasterError> {
        self.content
            .get(&layer.id)
            .cloned()
            .ok_or(RasterError::Missing(layer.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, Rect};
    use image::Rgba;

    #[test]
    fn test_file_source_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(2, 3, Rgba([10, 20, 30, 40]));
        img.save(dir.path().join("5.png")).unwrap();

        let source = FileRasterSource::new(dir.path());
        let layer = Layer::new(5, "art", LayerKind::Raster, Rect::new(0, 0, 2, 3));
        let loaded = source.raster_content(&layer).unwrap();
        assert_eq!(loaded.dimensions(), (2, 3));
        assert_eq!(*loaded.get_pixel(1, 2), Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn test_file_source_missing_layer() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRasterSource::new(dir.path());
        let layer = Layer::new(9, "ghost", LayerKind::Raster, Rect::new(0, 0, 1, 1));
        assert!(matches!(source.raster_content(&layer), Err(RasterError::Missing(9))));
    }

    #[test]
    fn test_memory_source_missing_layer() {
        let source = MemoryRasterSource::new();
        let layer = Layer::new(1, "a", LayerKind::Raster, Rect::new(0, 0, 1, 1));
        assert!(source.raster_content(&layer).is_err());
    }
}
