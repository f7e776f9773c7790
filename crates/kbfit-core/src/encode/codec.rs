//! The codec capability the target-size search is written against.
//!
//! A codec renders a source image into a working canvas at given dimensions
//! and compresses that canvas to bytes at a quality factor. The search only
//! ever sees byte lengths, so any encoder that can do those two things can be
//! plugged in: the native [`RasterCodec`] below, a test double, or (in the
//! WASM crate) the browser's canvas encoder.

use std::cell::RefCell;

use super::{encode_jpeg, encode_png, encode_webp, quality_to_percent, LOSSY_WEBP_AVAILABLE};
use super::{EncodeError, OutputFormat};
use crate::decode::{resize, DecodedImage, FilterType};

/// Render + compress capability.
pub trait Codec {
    /// Pixel buffer the codec compresses. Rendered once per set of
    /// dimensions and reused across quality trials.
    type Canvas;

    /// Render `source` at exactly `width` x `height`.
    fn render(
        &self,
        source: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<Self::Canvas, EncodeError>;

    /// Compress a rendered canvas. `quality` is a factor in `[0, 1]` and is
    /// ignored by formats for which [`Codec::honors_quality`] is false.
    fn compress(
        &self,
        canvas: &Self::Canvas,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError>;

    /// Whether changing `quality` can change the output size for `format`.
    fn honors_quality(&self, format: OutputFormat) -> bool {
        format.is_lossy()
    }
}

impl<C: Codec + ?Sized> Codec for &C {
    type Canvas = C::Canvas;

    fn render(
        &self,
        source: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<Self::Canvas, EncodeError> {
        (**self).render(source, width, height)
    }

    fn compress(
        &self,
        canvas: &Self::Canvas,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        (**self).compress(canvas, format, quality)
    }

    fn honors_quality(&self, format: OutputFormat) -> bool {
        (**self).honors_quality(format)
    }
}

/// Native codec built on the `image` crate, plus libwebp for lossy WebP.
///
/// JPEG and (on native targets) WebP honour the quality factor. PNG is
/// lossless, so for it the search falls back to dimension reduction only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec {
    filter: FilterType,
}

impl RasterCodec {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

/// Rendered pixels plus the encodes already made from them.
///
/// Quality factors are quantised to whole percents before encoding, so late
/// bisection steps often land on a percent already tried. Those are served
/// from here instead of being encoded again.
#[derive(Debug)]
pub struct RasterCanvas {
    image: DecodedImage,
    encoded: RefCell<Vec<(OutputFormat, u8, Vec<u8>)>>,
}

impl RasterCanvas {
    pub fn new(image: DecodedImage) -> Self {
        Self {
            image,
            encoded: RefCell::new(Vec::new()),
        }
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    /// Distinct encodes made from this canvas.
    pub fn encode_count(&self) -> usize {
        self.encoded.borrow().len()
    }

    fn cached(&self, format: OutputFormat, percent: u8) -> Option<Vec<u8>> {
        self.encoded
            .borrow()
            .iter()
            .find(|(f, p, _)| *f == format && *p == percent)
            .map(|(_, _, bytes)| bytes.clone())
    }
}

impl Codec for RasterCodec {
    type Canvas = RasterCanvas;

    fn render(
        &self,
        source: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<RasterCanvas, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }
        resize(source, width, height, self.filter)
            .map(RasterCanvas::new)
            .map_err(|e| EncodeError::RenderFailed(e.to_string()))
    }

    fn compress(
        &self,
        canvas: &RasterCanvas,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        // Formats that ignore quality share one cache slot
        let percent = if self.honors_quality(format) {
            quality_to_percent(quality)
        } else {
            0
        };
        if let Some(bytes) = canvas.cached(format, percent) {
            log::debug!("Reusing {} encode at {}%", format, percent);
            return Ok(bytes);
        }

        let image = &canvas.image;
        let (pixels, width, height) = (&image.pixels, image.width, image.height);
        let bytes = match format {
            OutputFormat::Jpeg => encode_jpeg(pixels, width, height, percent)?,
            OutputFormat::Png => encode_png(pixels, width, height)?,
            OutputFormat::Webp if LOSSY_WEBP_AVAILABLE => {
                encode_webp(pixels, width, height, percent)?
            }
            OutputFormat::Webp => super::encode_webp_lossless(pixels, width, height)?,
        };
        canvas
            .encoded
            .borrow_mut()
            .push((format, percent, bytes.clone()));
        Ok(bytes)
    }

    fn honors_quality(&self, format: OutputFormat) -> bool {
        match format {
            OutputFormat::Jpeg => true,
            OutputFormat::Webp => LOSSY_WEBP_AVAILABLE,
            OutputFormat::Png => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x / 4 + y / 4) % 2 == 0 { 230 } else { 20 };
                pixels.extend_from_slice(&[v, (x * 3) as u8, (y * 5) as u8]);
            }
        }
        DecodedImage::new(width, height, pixels)
    }

    #[test]
    fn test_render_reuses_same_size() {
        let codec = RasterCodec::default();
        let src = checker(40, 30);
        let canvas = codec.render(&src, 40, 30).unwrap();
        assert_eq!(canvas.image(), &src);
    }

    #[test]
    fn test_render_downscales() {
        let codec = RasterCodec::new(FilterType::Lanczos3);
        let canvas = codec.render(&checker(40, 30), 20, 15).unwrap();
        assert_eq!((canvas.image().width, canvas.image().height), (20, 15));
    }

    #[test]
    fn test_render_zero_dimensions() {
        let codec = RasterCodec::default();
        let result = codec.render(&checker(4, 4), 0, 4);
        assert!(matches!(result, Err(EncodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_render_inconsistent_source() {
        let codec = RasterCodec::default();
        let bad = DecodedImage {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        };
        let result = codec.render(&bad, 2, 2);
        assert!(matches!(result, Err(EncodeError::RenderFailed(_))));
    }

    #[test]
    fn test_compress_each_format() {
        let codec = RasterCodec::default();
        let canvas = RasterCanvas::new(checker(16, 16));

        let jpeg = codec.compress(&canvas, OutputFormat::Jpeg, 0.8).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);

        let png = codec.compress(&canvas, OutputFormat::Png, 0.8).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let webp = codec.compress(&canvas, OutputFormat::Webp, 0.8).unwrap();
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_png_ignores_quality() {
        let codec = RasterCodec::default();
        let canvas = RasterCanvas::new(checker(16, 16));
        let a = codec.compress(&canvas, OutputFormat::Png, 0.1).unwrap();
        let b = codec.compress(&canvas, OutputFormat::Png, 0.9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_honors_quality() {
        let codec = RasterCodec::default();
        assert!(codec.honors_quality(OutputFormat::Jpeg));
        assert!(!codec.honors_quality(OutputFormat::Png));
        assert_eq!(codec.honors_quality(OutputFormat::Webp), LOSSY_WEBP_AVAILABLE);
    }

    #[test]
    fn test_webp_quality_changes_size() {
        if !LOSSY_WEBP_AVAILABLE {
            return;
        }
        let codec = RasterCodec::default();
        let canvas = RasterCanvas::new(checker(64, 64));
        let low = codec.compress(&canvas, OutputFormat::Webp, 0.1).unwrap();
        let high = codec.compress(&canvas, OutputFormat::Webp, 0.95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_same_percent_is_encoded_once() {
        let codec = RasterCodec::default();
        let canvas = RasterCanvas::new(checker(32, 32));

        let a = codec.compress(&canvas, OutputFormat::Jpeg, 0.501).unwrap();
        let b = codec.compress(&canvas, OutputFormat::Jpeg, 0.498).unwrap();
        assert_eq!(a, b);
        assert_eq!(canvas.encode_count(), 1);

        codec.compress(&canvas, OutputFormat::Jpeg, 0.6).unwrap();
        codec.compress(&canvas, OutputFormat::Png, 0.1).unwrap();
        codec.compress(&canvas, OutputFormat::Png, 0.9).unwrap();
        assert_eq!(canvas.encode_count(), 3);
    }

    #[test]
    fn test_reference_forwards() {
        let codec = RasterCodec::default();
        let by_ref = &codec;
        assert!(!by_ref.honors_quality(OutputFormat::Png));
        let canvas = by_ref.render(&checker(8, 8), 4, 4).unwrap();
        assert!(by_ref.compress(&canvas, OutputFormat::Jpeg, 0.5).is_ok());
    }
}
