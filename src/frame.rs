//! Frame container.
//!
//! A `Frame` is an immutable 3-channel, 8-bit RGB image with non-zero
//! dimensions. The caller owns it for the duration of one inspection; the
//! pipeline only borrows it.
//!
//! - `Frame::from_rgb`: wrap an already-decoded RGB buffer.
//! - `Frame::decode`: decode JPEG/PNG bytes from a frame source.
//! - `Frame::encode_jpeg`: wire encoding used by the HTTP backend client.
//! - `Frame::luminance`: single-channel view used by the quality analyzer.

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};

use crate::error::DecodeError;

/// Default JPEG quality for frames sent to a detection backend.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap a packed RGB buffer (`width * height * 3` bytes, row-major).
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty);
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .unwrap_or(usize::MAX);
        let actual = pixels.len();
        if actual != expected {
            return Err(DecodeError::Dimensions {
                width,
                height,
                expected,
                actual,
            });
        }
        let image = RgbImage::from_raw(width, height, pixels).ok_or(DecodeError::Dimensions {
            width,
            height,
            expected,
            actual,
        })?;
        Ok(Self { image })
    }

    /// Decode compressed image bytes (JPEG or PNG) into a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let image = image::load_from_memory(bytes)?.into_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty);
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Packed RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Single-channel luminance of the frame.
    pub fn luminance(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    /// Encode as a baseline JPEG for upload.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
        encoder.encode_image(&self.image)?;
        Ok(bytes)
    }
}
