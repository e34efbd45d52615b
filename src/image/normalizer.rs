use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

pub const DEFAULT_EDGE_BOUND: u32 = 800;
pub const DEFAULT_JPEG_QUALITY: u8 = 82;

/// Image re-encoded to a bounded resolution and compression level, ready to
/// be sent to the generation service.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    edge_bound: u32,
    quality: u8,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_BOUND, DEFAULT_JPEG_QUALITY)
    }
}

impl ImageNormalizer {
    pub fn new(edge_bound: u32, quality: u8) -> Self {
        Self {
            edge_bound,
            quality,
        }
    }

    /// Decode, downsize, and re-encode an uploaded image.
    ///
    /// Neither output dimension exceeds the edge bound and the source is
    /// never upscaled. The same input bytes with the same settings always
    /// produce the same output bytes.
    pub fn normalize(&self, data: &[u8]) -> Result<NormalizedImage> {
        let decoded =
            image::load_from_memory(data).map_err(|e| Error::UnsupportedImage(e.to_string()))?;

        let resized = if decoded.width().max(decoded.height()) > self.edge_bound {
            decoded.resize(self.edge_bound, self.edge_bound, FilterType::Lanczos3)
        } else {
            decoded
        };

        // JPEG carries no alpha channel
        let rgb = resized.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| Error::Invariant(format!("JPEG encoding failed: {}", e)))?;

        Ok(NormalizedImage {
            bytes,
            mime_type: "image/jpeg",
            width,
            height,
        })
    }

    /// Run [`Self::normalize`] on the blocking pool so decode/resize work
    /// does not stall other requests on the async runtime.
    pub async fn normalize_offloaded(self, data: Vec<u8>) -> Result<NormalizedImage> {
        tokio::task::spawn_blocking(move || self.normalize(&data))
            .await
            .map_err(|e| Error::Invariant(format!("Image normalization task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([210, 140, 60, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_downscales_to_edge_bound_preserving_aspect() {
        let normalizer = ImageNormalizer::new(800, 82);
        let normalized = normalizer.normalize(&png_bytes(1600, 800)).unwrap();

        assert_eq!(normalized.width, 800);
        assert_eq!(normalized.height, 400);
        assert_eq!(normalized.mime_type, "image/jpeg");

        let reopened = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!(reopened.width(), 800);
        assert_eq!(reopened.height(), 400);
    }

    #[test]
    fn test_never_upscales_small_images() {
        let normalizer = ImageNormalizer::new(800, 82);
        let normalized = normalizer.normalize(&png_bytes(100, 50)).unwrap();

        assert_eq!(normalized.width, 100);
        assert_eq!(normalized.height, 50);
    }

    #[test]
    fn test_normalizing_normalized_output_keeps_dimensions() {
        let normalizer = ImageNormalizer::new(800, 82);
        let first = normalizer.normalize(&png_bytes(1200, 900)).unwrap();
        let second = normalizer.normalize(&first.bytes).unwrap();

        assert_eq!(second.width, first.width);
        assert_eq!(second.height, first.height);
    }

    #[test]
    fn test_output_is_deterministic() {
        let normalizer = ImageNormalizer::new(800, 82);
        let source = png_bytes(1024, 768);
        let first = normalizer.normalize(&source).unwrap();
        let second = normalizer.normalize(&source).unwrap();

        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_corrupt_bytes_are_unsupported() {
        let normalizer = ImageNormalizer::default();
        let err = normalizer.normalize(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
    }

    #[test]
    fn test_truncated_png_is_unsupported() {
        let normalizer = ImageNormalizer::default();
        let mut bytes = png_bytes(64, 64);
        bytes.truncate(20);
        let err = normalizer.normalize(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
    }

    #[tokio::test]
    async fn test_offloaded_normalization_matches_sync() {
        let normalizer = ImageNormalizer::new(800, 82);
        let source = png_bytes(900, 300);

        let sync = normalizer.normalize(&source).unwrap();
        let offloaded = normalizer.normalize_offloaded(source).await.unwrap();

        assert_eq!(offloaded.bytes, sync.bytes);
        assert_eq!(offloaded.width, 800);
    }
}
