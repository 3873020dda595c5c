//! Base64 image payload decoding.
//!
//! The payload is decoded fully before anything leaves the process, so a
//! malformed upload is rejected without spending a provider call on it.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use image::{ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;

/// Standard alphabet, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image data is empty")]
    Empty,

    #[error("Unrecognized image format: {0}")]
    UnknownFormat(image::ImageError),

    #[error("Failed to decode {format:?} image: {source}")]
    Decode {
        format: ImageFormat,
        source: image::ImageError,
    },

    #[error("Failed to re-encode image as PNG: {0}")]
    Encode(image::ImageError),
}

/// A validated image, ready to be attached to a provider request.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Format detected in the uploaded bytes.
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// MIME type of `bytes`, which differs from `format` after re-encoding.
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Formats the provider accepts without conversion.
fn native_mime_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Drop a browser `data:<mime>;base64,` prefix if present.
fn strip_data_url(payload: &str) -> &str {
    let trimmed = payload.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, data)) = trimmed.split_once(',') {
            return data;
        }
    }
    trimmed
}

/// Decode a base64 payload and parse it as an image.
///
/// PNG, JPEG and WebP bytes are forwarded untouched; any other format the
/// `image` crate can read is converted to PNG.
pub fn decode_base64_image(payload: &str) -> Result<DecodedImage, ImageDecodeError> {
    let encoded: String = strip_data_url(payload)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let raw = PAYLOAD_ENGINE.decode(encoded.as_bytes())?;
    if raw.is_empty() {
        return Err(ImageDecodeError::Empty);
    }

    let format = image::guess_format(&raw).map_err(ImageDecodeError::UnknownFormat)?;
    let decoded = image::load_from_memory_with_format(&raw, format)
        .map_err(|source| ImageDecodeError::Decode { format, source })?;
    let (width, height) = (decoded.width(), decoded.height());

    let (mime_type, bytes) = match native_mime_type(format) {
        Some(mime_type) => (mime_type, raw),
        None => {
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
                .map_err(ImageDecodeError::Encode)?;
            tracing::debug!(from = ?format, "Re-encoded image as PNG");
            ("image/png", png)
        }
    };

    Ok(DecodedImage {
        format,
        width,
        height,
        mime_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn encode(format: ImageOutputFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, image::Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn png_is_forwarded_unchanged() {
        let png = encode(ImageOutputFormat::Png);
        let image = decode_base64_image(&general_purpose::STANDARD.encode(&png)).unwrap();

        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.bytes, png);
    }

    #[test]
    fn jpeg_keeps_its_mime_type() {
        let jpeg = encode(ImageOutputFormat::Jpeg(90));
        let image = decode_base64_image(&general_purpose::STANDARD.encode(&jpeg)).unwrap();

        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.size(), jpeg.len());
    }

    #[test]
    fn bmp_is_reencoded_as_png() {
        let bmp = encode(ImageOutputFormat::Bmp);
        let image = decode_base64_image(&general_purpose::STANDARD.encode(&bmp)).unwrap();

        assert_eq!(image.format, ImageFormat::Bmp);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image::guess_format(&image.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn data_url_prefix_and_line_breaks_are_ignored() {
        let png = encode(ImageOutputFormat::Png);
        let b64 = general_purpose::STANDARD.encode(&png);
        let (head, tail) = b64.split_at(b64.len() / 2);
        let payload = format!("data:image/png;base64,{}\n{}", head, tail);

        let image = decode_base64_image(&payload).unwrap();
        assert_eq!(image.bytes, png);
    }

    #[test]
    fn missing_padding_is_accepted() {
        let png = encode(ImageOutputFormat::Png);
        let b64 = general_purpose::STANDARD_NO_PAD.encode(&png);
        assert!(decode_base64_image(&b64).is_ok());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = decode_base64_image("not base64 at all!!").unwrap_err();
        assert!(matches!(err, ImageDecodeError::InvalidBase64(_)));
        assert!(err.to_string().starts_with("Invalid base64 image data"));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            decode_base64_image("   ").unwrap_err(),
            ImageDecodeError::Empty
        ));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let b64 = general_purpose::STANDARD.encode(b"just some text, not pixels");
        assert!(matches!(
            decode_base64_image(&b64).unwrap_err(),
            ImageDecodeError::UnknownFormat(_)
        ));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let png = encode(ImageOutputFormat::Png);
        let b64 = general_purpose::STANDARD.encode(&png[..png.len() / 2]);
        assert!(matches!(
            decode_base64_image(&b64).unwrap_err(),
            ImageDecodeError::Decode { .. }
        ));
    }
}
