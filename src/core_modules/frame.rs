// THEORY:
// The `Frame` is the raw input of a single pipeline pass: a rectangular grid of
// RGB samples with its origin at the top-left corner (x grows right, y grows
// down). A frame is immutable once built and is owned by exactly one pass.
//
// The `preprocessor` is the first stage of that pass. It shrinks the frame to
// the requested working width (never enlarging it) and smooths it with a
// Gaussian blur so sensor noise does not survive into the color masks.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, VisionError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;

/// An immutable RGB frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wraps an already-decoded RGB image, rejecting zero-sized input.
    pub fn from_rgb(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyFrame { width, height });
        }
        Ok(Self { image })
    }

    /// Decodes a compressed image (JPEG, PNG, ...) into a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        Self::from_rgb(image)
    }

    /// Decodes a base64 payload, tolerating a `data:image/...;base64,` prefix.
    pub fn from_base64(payload: &str) -> Result<Self> {
        let encoded = match payload.split_once(',') {
            Some((_, data)) => data,
            None => payload,
        };
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(VisionError::MissingFrame);
        }
        let bytes = STANDARD.decode(encoded)?;
        Self::decode(&bytes)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Total number of pixels in the frame.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        Pixel::from(*self.image.get_pixel(x, y))
    }

    /// Iterates samples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.image.pixels().map(|p| Pixel::from(*p))
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}

pub mod preprocessor {
    use super::*;
    use image::imageops::{self, FilterType};

    /// Computes the working size for a frame: the width is capped at
    /// `target_width` and the height follows the aspect ratio, rounded to the
    /// nearest pixel.
    pub fn working_size(width: u32, height: u32, target_width: u32) -> (u32, u32) {
        if width <= target_width || target_width == 0 {
            return (width, height);
        }
        let scale = target_width as f64 / width as f64;
        let scaled_height = (height as f64 * scale).round().max(1.0) as u32;
        (target_width, scaled_height)
    }

    /// Downscales and denoises a frame. The input frame is left untouched.
    pub fn preprocess(frame: &Frame, target_width: u32, blur_sigma: f32) -> Result<Frame> {
        let (width, height) = working_size(frame.width(), frame.height(), target_width);

        let resized = if (width, height) == (frame.width(), frame.height()) {
            frame.image.clone()
        } else {
            imageops::resize(&frame.image, width, height, FilterType::Triangle)
        };

        let smoothed = if blur_sigma > 0.0 {
            imageops::blur(&resized, blur_sigma)
        } else {
            resized
        };

        Frame::from_rgb(smoothed)
    }
}

#[cfg(test)]
mod tests {
    use super::preprocessor::*;
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn rejects_zero_sized_images() {
        let err = Frame::from_rgb(RgbImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, VisionError::EmptyFrame { width: 0, height: 10 }));
    }

    #[test]
    fn working_size_preserves_aspect_ratio() {
        assert_eq!(working_size(1280, 720, 640), (640, 360));
        assert_eq!(working_size(1000, 333, 640), (640, 213));
    }

    #[test]
    fn working_size_never_upscales() {
        assert_eq!(working_size(320, 240, 640), (320, 240));
        assert_eq!(working_size(640, 480, 640), (640, 480));
    }

    #[test]
    fn preprocess_downscales_without_touching_original() {
        let frame = Frame::from_rgb(solid(200, 100, [10, 200, 30])).unwrap();
        let small = preprocess(&frame, 50, 1.0).unwrap();
        assert_eq!((small.width(), small.height()), (50, 25));
        assert_eq!((frame.width(), frame.height()), (200, 100));
        // A flat field stays flat after blurring, up to rounding.
        let center = small.pixel(25, 12);
        assert!(center.red.abs_diff(10) <= 2);
        assert!(center.green.abs_diff(200) <= 2);
        assert!(center.blue.abs_diff(30) <= 2);
    }

    #[test]
    fn decodes_base64_png_with_data_url_prefix() {
        let mut bytes = Vec::new();
        solid(8, 4, [255, 0, 0])
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));

        let frame = Frame::from_base64(&payload).unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.pixel(0, 0), Pixel::new(255, 0, 0));
    }

    #[test]
    fn garbage_payloads_are_input_errors() {
        let err = Frame::from_base64("!!not base64!!").unwrap_err();
        assert!(err.is_input_error());

        let err = Frame::from_base64(&STANDARD.encode(b"not an image")).unwrap_err();
        assert!(matches!(err, VisionError::Decode(_)));

        let err = Frame::from_base64("").unwrap_err();
        assert!(matches!(err, VisionError::MissingFrame));
    }
}
