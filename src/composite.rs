//! Compositor
//!
//! Two pixel operations, both on non-premultiplied RGBA8:
//! - REPLACE (`blit_replace`): destination := source inside the placement.
//!   Used for per-layer extraction so output keeps the exact source pixels,
//!   transparency included.
//! - OVER (`source_over`): standard source-over blend, used only for the
//!   merged preview.

use image::{Rgba, RgbaImage};

use crate::error::EngineError;
use crate::layer::{Layer, Rect};
use crate::source::RasterSource;

const CHANNELS: usize = 4;

/// Largest canvas the engine allocates, in pixels (1 GiB of RGBA8).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Refuse canvases above [`MAX_CANVAS_PIXELS`].
pub fn check_canvas(width: u32, height: u32) -> Result<(), EngineError> {
    if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(EngineError::CanvasTooLarge {
            width,
            height,
            limit: MAX_CANVAS_PIXELS,
        });
    }
    Ok(())
}

/// Allocate a fully transparent canvas within the pixel limit.
pub fn new_canvas(width: u32, height: u32) -> Result<RgbaImage, EngineError> {
    check_canvas(width, height)?;
    Ok(RgbaImage::new(width, height))
}

/// Copy `src` into `dst` at `rect`, clipped to both `rect` and the canvas.
pub fn blit_replace(dst: &mut RgbaImage, src: &RgbaImage, rect: Rect) {
    let (canvas_w, canvas_h) = dst.dimensions();
    let Some(p) = rect.place(src.dimensions(), canvas_w, canvas_h) else {
        return;
    };

    let src_stride = src.width() as usize * CHANNELS;
    let dst_stride = canvas_w as usize * CHANNELS;
    let row_len = p.width as usize * CHANNELS;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = dst;

    for row in 0..p.height as usize {
        let s = (p.src_y as usize + row) * src_stride + p.src_x as usize * CHANNELS;
        let d = (p.dst_y as usize + row) * dst_stride + p.dst_x as usize * CHANNELS;
        dst_raw[d..d + row_len].copy_from_slice(&src_raw[s..s + row_len]);
    }
}

/// Whether every pixel of `buffer` is fully opaque. An empty buffer is not.
pub fn is_opaque(buffer: &RgbaImage) -> bool {
    !buffer.as_raw().is_empty() && buffer.pixels().all(|p| p[3] == u8::MAX)
}

/// Render one layer onto a fresh, fully transparent `width` x `height` canvas.
pub fn render_layer<S>(layer: &Layer, source: &S, width: u32, height: u32) -> Result<RgbaImage, EngineError>
where
    S: RasterSource + ?Sized,
{
    let mut canvas = new_canvas(width, height)?;
    let content = source
        .raster_content(layer)
        .map_err(|source| EngineError::Rasterization {
            name: layer.name.clone(),
            source,
        })?;

    blit_replace(&mut canvas, &content, layer.rect);
    Ok(canvas)
}

/// Blend one non-premultiplied pixel over another.
///
/// `outA = sA + dA(1 - sA)`, `outC = (sC*sA + dC*dA(1 - sA)) / outA`,
/// and a fully transparent result when `outA` is zero.
pub fn source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    match (src[3], dst[3]) {
        (0, 0) => return Rgba([0, 0, 0, 0]),
        (0, _) => return dst,
        (u8::MAX, _) => return src,
        _ => {}
    }

    let sa = f64::from(src[3]) / 255.0;
    let da = f64::from(dst[3]) / 255.0;
    let dst_weight = da * (1.0 - sa);
    let out_a = sa + dst_weight;

    let blend = |s: u8, d: u8| -> u8 {
        let c = (f64::from(s) * sa + f64::from(d) * dst_weight) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Blend `src` over `dst` pixel by pixel across their common area.
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage) {
    if dst.dimensions() == src.dimensions() {
        for (d, s) in dst.pixels_mut().zip(src.pixels()) {
            *d = source_over(*d, *s);
        }
        return;
    }

    let w = dst.width().min(src.width());
    let h = dst.height().min(src.height());
    for y in 0..h {
        for x in 0..w {
            let out = source_over(*dst.get_pixel(x, y), *src.get_pixel(x, y));
            dst.put_pixel(x, y, out);
        }
    }
}

/// Flatten `buffers` bottom-to-top into one `width` x `height` preview.
pub fn merge_preview<'a, I>(buffers: I, width: u32, height: u32) -> Result<RgbaImage, EngineError>
where
    I: IntoIterator<Item = &'a RgbaImage>,
{
    let mut acc = new_canvas(width, height)?;
    for buffer in buffers {
        blend_over(&mut acc, buffer);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use crate::source::MemoryRasterSource;

    #[test]
    fn test_blit_replace_keeps_transparency() {
        let mut dst = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([100, 50, 25, 0]));
        blit_replace(&mut dst, &src, Rect::new(1, 1, 2, 2));
        assert_eq!(*dst.get_pixel(1, 1), Rgba([100, 50, 25, 0]));
        assert_eq!(*dst.get_pixel(0, 0), Rgba([9, 9, 9, 255]));
        assert_eq!(*dst.get_pixel(3, 3), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn test_blit_replace_negative_offset() {
        let mut dst = RgbaImage::new(3, 3);
        let mut src = RgbaImage::new(2, 2);
        src.put_pixel(1, 1, Rgba([1, 2, 3, 4]));
        blit_replace(&mut dst, &src, Rect::new(-1, -1, 2, 2));
        assert_eq!(*dst.get_pixel(0, 0), Rgba([1, 2, 3, 4]));
        assert_eq!(*dst.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_render_layer_clips_to_canvas() {
        let layer = Layer::new(1, "big", LayerKind::Raster, Rect::new(-2, -2, 8, 8));
        let source = MemoryRasterSource::new().with(1, RgbaImage::from_pixel(8, 8, Rgba([7, 7, 7, 255])));
        let out = render_layer(&layer, &source, 4, 4).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        assert!(is_opaque(&out));
    }

    #[test]
    fn test_render_layer_outside_canvas_is_transparent() {
        let layer = Layer::new(1, "far", LayerKind::Raster, Rect::new(50, 50, 2, 2));
        let source = MemoryRasterSource::new().with(1, RgbaImage::from_pixel(2, 2, Rgba([7, 7, 7, 255])));
        let out = render_layer(&layer, &source, 4, 4).unwrap();
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_render_layer_rasterization_error() {
        let layer = Layer::new(3, "missing", LayerKind::Raster, Rect::new(0, 0, 2, 2));
        let err = render_layer(&layer, &MemoryRasterSource::new(), 4, 4).unwrap_err();
        assert!(matches!(err, EngineError::Rasterization { .. }));
    }

    #[test]
    fn test_source_over_half_on_opaque() {
        let out = source_over(Rgba([0, 0, 255, 255]), Rgba([255, 0, 0, 128]));
        assert_eq!(out[3], 255);
        assert_eq!(out[0], 128);
        assert_eq!(out[2], 127);
    }

    #[test]
    fn test_source_over_onto_transparent_keeps_color() {
        let out = source_over(Rgba([0, 0, 0, 0]), Rgba([40, 80, 120, 60]));
        assert_eq!(out, Rgba([40, 80, 120, 60]));
    }

    #[test]
    fn test_source_over_both_transparent_is_zero() {
        let out = source_over(Rgba([5, 5, 5, 0]), Rgba([9, 9, 9, 0]));
        assert_eq!(out, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_source_over_two_halves() {
        // outA = 0.5 + 0.5 * 0.5 = 0.75
        let out = source_over(Rgba([0, 0, 0, 128]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 192);
    }

    #[test]
    fn test_merge_preview_empty() {
        let out = merge_preview(std::iter::empty(), 3, 2).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_oversized_canvas_refused_before_fetch() {
        // The source is empty: a fetch would fail with a rasterization error instead.
        let layer = Layer::new(1, "a", LayerKind::Raster, Rect::new(0, 0, 1, 1));
        let err = render_layer(&layer, &MemoryRasterSource::new(), u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(err, EngineError::CanvasTooLarge { .. }));

        let err = merge_preview(std::iter::empty(), 100_000, 100_000).unwrap_err();
        assert!(matches!(err, EngineError::CanvasTooLarge { width: 100_000, .. }));
    }

    #[test]
    fn test_canvas_limit_boundary() {
        assert!(new_canvas((1 << 14) + 1, 1 << 14).is_err());
        assert!(new_canvas(u32::MAX, 1).is_err());
        assert_eq!(new_canvas(3, 2).unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn test_is_opaque() {
        assert!(is_opaque(&RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))));
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 254]));
        assert!(!is_opaque(&img));
        assert!(!is_opaque(&RgbaImage::new(0, 0)));
    }
}
