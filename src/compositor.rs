//! Color filter compositing.
//!
//! The filter is a translucent multiply layer: every pixel is blended with the
//! option color the way a 2D canvas does with
//! `globalCompositeOperation = "multiply"` and a `fillRect` at `alpha`.
//! Output is always a fresh JPEG; the source is never touched.

use image::{ExtendedColorType, RgbImage, RgbaImage};

use crate::color::HexColor;
use crate::error::ComposeError;

/// Color layer laid over the photo.
#[derive(Debug, Clone, PartialEq)]
pub struct Tint {
    pub color: HexColor,
    pub alpha: f32,
}

impl Tint {
    pub fn new(color: HexColor, alpha: f32) -> Self {
        Self {
            color,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
}

/// Encoded image ready to show, store as a blob, or share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub const MIME: &'static str = "image/jpeg";
}

/// Blend `tint` over `source` and flatten the result onto black, which is
/// what a JPEG encode of a canvas does with transparent pixels.
pub fn composite(source: &RgbaImage, tint: Option<&Tint>) -> RgbImage {
    let (w, h) = source.dimensions();
    let mut out = RgbImage::new(w, h);

    let layer = tint.map(|t| {
        let [r, g, b] = t.color.rgb();
        ([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0], t.alpha)
    });

    for (src, dst) in source.pixels().zip(out.pixels_mut()) {
        let ab = src[3] as f32 / 255.0;
        for c in 0..3 {
            let cb = src[c] as f32 / 255.0;
            let value = match layer {
                Some((cs, a)) => {
                    let cs = cs[c];
                    // Separable blend against a possibly transparent backdrop,
                    // then source-over at the layer alpha (premultiplied).
                    let blended = (1.0 - ab) * cs + ab * cb * cs;
                    a * blended + (1.0 - a) * ab * cb
                }
                None => ab * cb,
            };
            dst[c] = (value * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<EncodedImage, ComposeError> {
    let mut buffer = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ComposeError::Encode(e.to_string()))?;

    Ok(EncodedImage {
        bytes: buffer,
        width: image.width(),
        height: image.height(),
    })
}

/// Tint and encode. With no tint the source is only re-encoded.
pub fn compose(
    source: &RgbaImage,
    tint: Option<&Tint>,
    quality: u8,
) -> Result<EncodedImage, ComposeError> {
    let flat = composite(source, tint);
    let encoded = encode_jpeg(&flat, quality)?;
    log::debug!(
        "Composed {}x{} ({} bytes, tint={:?})",
        encoded.width,
        encoded.height,
        encoded.bytes.len(),
        tint.map(|t| t.color.as_str())
    );
    Ok(encoded)
}

/// Decode any supported image into RGBA.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, ComposeError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| ComposeError::Decode(e.to_string()))
}
