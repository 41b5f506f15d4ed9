//! Image decoding and resizing
//!
//! Decodes an uploaded byte buffer into an in-memory raster and produces
//! resized variants with Lanczos resampling. A zero height or width in a
//! [`CropSize`] derives the missing dimension from the source aspect ratio;
//! when both are set the image is resized to the exact box.

pub mod scheduler;

use crate::error::{AppError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

pub use scheduler::resize_all;

/// A target dimension spec for one resized variant.
///
/// At least one of `height`/`width` must be non-zero; a zero dimension is
/// derived proportionally from the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSize {
    pub height: u32,
    pub width: u32,
}

impl CropSize {
    /// Default large crop size
    pub const LARGE: CropSize = CropSize {
        height: 100,
        width: 700,
    };

    /// Default medium crop size
    pub const MEDIUM: CropSize = CropSize {
        height: 0,
        width: 250,
    };

    /// Default small crop size
    pub const SMALL: CropSize = CropSize {
        height: 0,
        width: 100,
    };

    /// Create a validated crop size
    pub fn new(height: u32, width: u32) -> Result<Self> {
        let size = CropSize { height, width };
        size.validate()?;
        Ok(size)
    }

    /// Check the at-least-one-dimension invariant
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 && self.width == 0 {
            return Err(AppError::Resize(format!(
                "invalid crop size {}X{}: height or width must be non-zero",
                self.height, self.width
            )));
        }
        Ok(())
    }
}

/// Actual pixel dimensions of a produced raster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageProps {
    pub height: u32,
    pub width: u32,
}

impl ImageProps {
    /// Key folder segment for the resized variant, e.g. `125X250`
    pub fn folder(&self) -> String {
        format!("{}X{}", self.height, self.width)
    }
}

/// One resized rendition of the source image
#[derive(Debug)]
pub struct ResizedVariant {
    pub size: CropSize,
    pub image: DynamicImage,
}

impl ResizedVariant {
    /// Dimensions of the resized raster (may differ from the requested
    /// spec when a dimension was derived from the aspect ratio)
    pub fn props(&self) -> ImageProps {
        let (width, height) = self.image.dimensions();
        ImageProps { height, width }
    }
}

/// Stateless decode/resize transform.
///
/// Safe to share across any number of concurrent resize tasks; it never
/// mutates its input image.
#[derive(Clone, Copy, Debug)]
pub struct Resizer {
    filter: FilterType,
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Resizer {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Decode raw bytes into an image
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage> {
        if data.is_empty() {
            return Err(AppError::Decode("empty image payload".to_string()));
        }

        image::load_from_memory(data)
            .map_err(|e| AppError::Decode(format!("failed to decode image: {e}")))
    }

    /// Resize the image to the given crop size.
    ///
    /// Re-validates the size so that an invalid spec fails only its own
    /// fan-out branch.
    pub fn resize(&self, image: &DynamicImage, size: CropSize) -> Result<DynamicImage> {
        size.validate()?;

        let (width, height) = self.target_dimensions(image.dimensions(), size);
        Ok(image.resize_exact(width.max(1), height.max(1), self.filter))
    }

    /// Compute output dimensions, deriving a zero dimension from the
    /// source aspect ratio
    fn target_dimensions(&self, (orig_w, orig_h): (u32, u32), size: CropSize) -> (u32, u32) {
        if size.width == 0 {
            let ratio = size.height as f64 / orig_h as f64;
            (((orig_w as f64) * ratio).round() as u32, size.height)
        } else if size.height == 0 {
            let ratio = size.width as f64 / orig_w as f64;
            (size.width, ((orig_h as f64) * ratio).round() as u32)
        } else {
            (size.width, size.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        test_image(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Jpeg(90))
            .unwrap();
        buf
    }

    #[test]
    fn crop_size_requires_a_dimension() {
        assert!(CropSize::new(0, 0).is_err());
        assert!(CropSize::new(0, 250).is_ok());
        assert!(CropSize::new(100, 0).is_ok());
        assert!(CropSize::new(100, 700).is_ok());
    }

    #[test]
    fn target_dimensions_derive_height_from_width() {
        let resizer = Resizer::new();
        let (w, h) = resizer.target_dimensions((1000, 500), CropSize { height: 0, width: 250 });
        assert_eq!((w, h), (250, 125));
    }

    #[test]
    fn target_dimensions_derive_width_from_height() {
        let resizer = Resizer::new();
        let (w, h) = resizer.target_dimensions((1000, 500), CropSize { height: 100, width: 0 });
        assert_eq!((w, h), (200, 100));
    }

    #[test]
    fn target_dimensions_exact_box() {
        let resizer = Resizer::new();
        let (w, h) = resizer.target_dimensions((1000, 500), CropSize::LARGE);
        assert_eq!((w, h), (700, 100));
    }

    #[test]
    fn resize_reports_actual_props() {
        let resizer = Resizer::new();
        let img = test_image(1000, 500);
        let resized = resizer
            .resize(&img, CropSize { height: 0, width: 100 })
            .unwrap();
        let variant = ResizedVariant {
            size: CropSize::SMALL,
            image: resized,
        };
        assert_eq!(
            variant.props(),
            ImageProps {
                height: 50,
                width: 100
            }
        );
        assert_eq!(variant.props().folder(), "50X100");
    }

    #[test]
    fn resize_is_idempotent_on_dimensions() {
        let resizer = Resizer::new();
        let img = test_image(800, 600);
        let a = resizer.resize(&img, CropSize::MEDIUM).unwrap();
        let b = resizer.resize(&img, CropSize::MEDIUM).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
        // Source is untouched
        assert_eq!(img.dimensions(), (800, 600));
    }

    #[test]
    fn resize_rejects_invalid_size() {
        let resizer = Resizer::new();
        let img = test_image(10, 10);
        let err = resizer
            .resize(&img, CropSize { height: 0, width: 0 })
            .unwrap_err();
        assert!(err.to_string().contains("0X0"));
    }

    #[test]
    fn decode_rejects_empty_payload() {
        let err = Resizer::new().decode(&[]).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Resizer::new().decode(b"not an image").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn decode_roundtrip() {
        let img = Resizer::new().decode(&jpeg_bytes(64, 32)).unwrap();
        assert_eq!(img.dimensions(), (64, 32));
    }
}
