//! Grayscale thumbnail generation via SIMD-accelerated resizing.
//!
//! Uses fast_image_resize, which picks AVX2/NEON code paths when available.
//! Every hashing algorithm starts from this reduction.

use crate::error::ImageError;
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

/// Reusable resizer. Keeps the internal buffers of fast_image_resize warm
/// when hashing many images on one worker.
pub struct ThumbnailResizer {
    resizer: Resizer,
}

impl ThumbnailResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Reduce an image to a `width` x `height` grayscale thumbnail with a
    /// bilinear filter.
    pub fn grayscale_thumbnail(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, ImageError> {
        let gray = image.to_luma8();

        if gray.width() == 0 || gray.height() == 0 {
            return Err(ImageError::Resize {
                reason: "source image has zero dimensions".to_string(),
            });
        }
        if width == 0 || height == 0 {
            return Err(ImageError::Resize {
                reason: "thumbnail dimensions must be nonzero".to_string(),
            });
        }

        let src = Image::from_vec_u8(gray.width(), gray.height(), gray.into_raw(), PixelType::U8)
            .map_err(|e| ImageError::Resize {
                reason: format!("failed to wrap source pixels: {e}"),
            })?;

        let mut dst = Image::new(width, height, PixelType::U8);

        let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
            fast_image_resize::FilterType::Bilinear,
        ));
        self.resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| ImageError::Resize {
                reason: format!("resize failed: {e}"),
            })?;

        let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, dst.into_vec()).ok_or_else(|| {
                ImageError::Resize {
                    reason: "result buffer has wrong size".to_string(),
                }
            })?;
        Ok(buffer)
    }
}

impl Default for ThumbnailResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off thumbnails.
pub fn grayscale_thumbnail(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, ImageError> {
    ThumbnailResizer::new().grayscale_thumbnail(image, width, height)
}
