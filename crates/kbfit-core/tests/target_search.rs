use std::cell::RefCell;

use kbfit_core::decode::decode_image;
use kbfit_core::encode::{encode_png, EncodeError};
use kbfit_core::{
    CancelToken, Codec, DecodedImage, EncodingRequest, OutputFormat, RasterCodec, SearchError,
    SearchPolicy, Strategy, TargetSizeEncoder,
};

/// Codec with a smooth size model: `area * (0.02 + 0.5 * q^2)` bytes for
/// lossy formats, `area / 2` for PNG. Records every compress call.
#[derive(Default)]
struct ModelCodec {
    calls: RefCell<Vec<(f32, u32, u32)>>,
}

impl Codec for ModelCodec {
    type Canvas = (u32, u32);

    fn render(
        &self,
        _source: &DecodedImage,
        width: u32,
        height: u32,
    ) -> Result<(u32, u32), EncodeError> {
        Ok((width, height))
    }

    fn compress(
        &self,
        canvas: &(u32, u32),
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, EncodeError> {
        self.calls.borrow_mut().push((quality, canvas.0, canvas.1));
        let area = canvas.0 as f64 * canvas.1 as f64;
        let per_pixel = match format {
            OutputFormat::Png => 0.5,
            _ => 0.02 + 0.5 * f64::from(quality * quality),
        };
        Ok(vec![0; (area * per_pixel) as usize])
    }
}

/// Codec that fails on every compress.
struct BrokenCodec;

impl Codec for BrokenCodec {
    type Canvas = ();

    fn render(&self, _: &DecodedImage, _: u32, _: u32) -> Result<(), EncodeError> {
        Ok(())
    }

    fn compress(&self, _: &(), _: OutputFormat, _: f32) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::EncodingFailed("encoder unavailable".into()))
    }
}

fn blank(width: u32, height: u32) -> DecodedImage {
    DecodedImage::new(
        width,
        height,
        vec![0; DecodedImage::expected_len(width, height)],
    )
}

/// Smooth diagonal gradient, compresses well.
fn gradient(width: u32, height: u32) -> DecodedImage {
    let mut pixels = Vec::with_capacity(DecodedImage::expected_len(width, height));
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width) as u8);
            pixels.push((y * 255 / height) as u8);
            pixels.push(((x + y) * 127 / (width + height)) as u8);
        }
    }
    DecodedImage::new(width, height, pixels)
}

/// Deterministic pseudo-random pixels, compresses badly.
fn noise(width: u32, height: u32) -> DecodedImage {
    let mut state: u32 = 0x2545_f491;
    let pixels = (0..DecodedImage::expected_len(width, height))
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    DecodedImage::new(width, height, pixels)
}

#[test]
fn generous_target_returns_probe() {
    let encoder = TargetSizeEncoder::new(RasterCodec::default());
    let request = EncodingRequest::from_kb(200, OutputFormat::Jpeg);

    let result = encoder.encode(&gradient(64, 64), &request).unwrap();

    assert_eq!(result.trials, 1);
    assert_eq!(result.strategy, Strategy::Probe);
    assert_eq!(result.quality, 0.95);
    assert_eq!((result.width, result.height), (64, 64));
    assert!(result.size() <= 200 * 1024);
}

#[test]
fn large_photo_capped_then_bisected() {
    let codec = ModelCodec::default();
    let encoder = TargetSizeEncoder::new(&codec);
    let request = EncodingRequest::from_kb(200, OutputFormat::Jpeg).with_max_width(1280);

    let result = encoder.encode(&blank(4000, 3000), &request).unwrap();
    let calls = codec.calls.borrow();

    assert_eq!((result.width, result.height), (1280, 960));
    assert_eq!(result.strategy, Strategy::QualitySearch);
    assert!(result.size() <= 204_800);
    assert!(result.size() as f64 > 204_800.0 * 0.99, "size {}", result.size());
    // Probe plus exactly twelve bisection steps, all on the working canvas
    assert_eq!(calls.len(), 13);
    assert!(calls.iter().all(|&(_, w, h)| (w, h) == (1280, 960)));
    // The probe is oversized
    assert_eq!(calls[0].0, 0.95);
}

#[test]
fn tiny_target_on_large_photo_is_unattainable() {
    let image = blank(4000, 3000);
    let request = EncodingRequest::from_kb(5, OutputFormat::Jpeg);

    // Rejected outright under the default usability floor
    let guarded = TargetSizeEncoder::new(ModelCodec::default());
    assert!(matches!(
        guarded.encode(&image, &request),
        Err(SearchError::InvalidRequest(_))
    ));

    let codec = ModelCodec::default();
    let encoder = TargetSizeEncoder::new(&codec).with_policy(SearchPolicy::unguarded());
    match encoder.encode(&image, &request) {
        Err(SearchError::TargetUnattainable {
            target_bytes,
            closest: Some(closest),
        }) => {
            assert_eq!(target_bytes, 5 * 1024);
            assert!(closest.size > 5 * 1024);
        }
        other => panic!("expected TargetUnattainable, got {other:?}"),
    }
    assert_eq!(codec.calls.borrow().len(), 19);
}

#[test]
fn png_skips_quality_search() {
    let codec = ModelCodec::default();
    let encoder = TargetSizeEncoder::new(&codec).with_policy(SearchPolicy::unguarded());
    let request = EncodingRequest::from_kb(50, OutputFormat::Png);

    // 400x300 at half a byte per pixel is 60000 bytes; one shrink gives 48600
    let result = encoder.encode(&blank(400, 300), &request).unwrap();
    let calls = codec.calls.borrow();

    assert_eq!(result.strategy, Strategy::DimensionFallback);
    assert_eq!((result.width, result.height), (360, 270));
    assert_eq!(calls.len(), 2);
    assert_eq!((calls[0].1, calls[0].2), (400, 300));
}

#[test]
fn png_with_native_codec_shrinks_instead_of_bisecting() {
    let codec = RasterCodec::default();
    let image = noise(200, 200);
    let full = codec
        .compress(&codec.render(&image, 200, 200).unwrap(), OutputFormat::Png, 0.95)
        .unwrap();
    let shrunk = codec
        .compress(&codec.render(&image, 180, 180).unwrap(), OutputFormat::Png, 0.7)
        .unwrap();
    assert!(shrunk.len() < full.len());

    // Fits exactly after the first 0.9 shrink
    let encoder = TargetSizeEncoder::new(codec).with_policy(SearchPolicy::unguarded());
    let request = EncodingRequest::new(shrunk.len() as u64, OutputFormat::Png);
    let result = encoder.encode(&image, &request).unwrap();

    assert_eq!(result.strategy, Strategy::DimensionFallback);
    assert_eq!((result.width, result.height), (180, 180));
    assert_eq!(result.trials, 2);
    assert_eq!(result.bytes, shrunk);
}

#[cfg(not(target_arch = "wasm32"))]
#[test]
fn webp_with_native_codec_bisects_quality() {
    let encoder = TargetSizeEncoder::new(RasterCodec::default())
        .with_policy(SearchPolicy::unguarded());
    let request = EncodingRequest::from_kb(40, OutputFormat::Webp);

    let result = encoder.encode(&noise(256, 256), &request).unwrap();

    assert_eq!(result.strategy, Strategy::QualitySearch);
    assert_eq!((result.width, result.height), (256, 256));
    assert!(result.size() <= 40 * 1024);
    assert!(result.quality < 0.95);
    assert_eq!(&result.bytes[8..12], b"WEBP");
}

#[test]
fn success_never_exceeds_target_with_real_jpeg() {
    let encoder = TargetSizeEncoder::new(RasterCodec::default());
    let image = noise(256, 256);

    for kb in [20, 40, 80] {
        let request = EncodingRequest::from_kb(kb, OutputFormat::Jpeg);
        let result = encoder.encode(&image, &request).unwrap();

        assert_eq!(result.strategy, Strategy::QualitySearch, "{kb} KB");
        assert!(result.size() <= kb as usize * 1024);
        assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    }
}

#[test]
fn identical_inputs_give_identical_bytes() {
    let encoder = TargetSizeEncoder::new(RasterCodec::default());
    let image = noise(256, 256);
    let request = EncodingRequest::from_kb(40, OutputFormat::Jpeg);

    let first = encoder.encode(&image, &request).unwrap();
    let second = encoder.encode(&image, &request).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn decoded_upload_round_trip() {
    let source = gradient(120, 80);
    let png = encode_png(&source.pixels, source.width, source.height).unwrap();
    let decoded = decode_image(&png).unwrap();
    assert_eq!(decoded, source);

    let encoder = TargetSizeEncoder::new(RasterCodec::default());
    let request = EncodingRequest::from_kb(20, OutputFormat::Jpeg).with_max_width(60);
    let result = encoder.encode(&decoded, &request).unwrap();

    assert_eq!((result.width, result.height), (60, 40));
    assert!(result.size() <= 20 * 1024);
}

#[test]
fn cancellation_before_search() {
    let token = CancelToken::new();
    token.cancel();
    let codec = ModelCodec::default();
    let encoder = TargetSizeEncoder::new(&codec).with_cancel_token(token);

    let result = encoder.encode(&blank(800, 600), &EncodingRequest::from_kb(50, OutputFormat::Jpeg));

    assert!(matches!(result, Err(SearchError::Cancelled)));
    assert!(codec.calls.borrow().is_empty());
}

#[test]
fn cancellation_during_search() {
    let token = CancelToken::new();
    let codec = ModelCodec::default();
    let encoder = TargetSizeEncoder::new(&codec).with_cancel_token(token.clone());
    let request = EncodingRequest::from_kb(50, OutputFormat::Jpeg);

    let result = encoder.encode_with_progress(&blank(800, 600), &request, |_| token.cancel());

    assert!(matches!(result, Err(SearchError::Cancelled)));
    assert_eq!(codec.calls.borrow().len(), 1);
}

#[test]
fn codec_failure_is_not_unattainable() {
    let encoder = TargetSizeEncoder::new(BrokenCodec);
    let request = EncodingRequest::from_kb(50, OutputFormat::Jpeg);

    let err = encoder.encode(&blank(100, 100), &request).unwrap_err();

    assert!(matches!(err, SearchError::CodecFailure(_)));
    assert_eq!(err.to_string(), "Codec failure: Encoding failed: encoder unavailable");
}
