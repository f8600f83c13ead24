// THEORY:
// `PixelBuffer` is the canonical frame the engine analyzes: width, height, a pixel
// layout and a tightly packed, row-major byte vector. Whatever the camera or image
// decoder produced has already been normalized into this shape by the adapter.
//
// The buffer is deliberately permissive on construction. A camera stream must stay
// alive even when one frame is malformed, so a bad buffer is allowed to exist and
// is only rejected by `validate` at analysis time, where the engine turns the error
// into an empty result.

use crate::core_modules::pixel::Pixel;
use crate::core_modules::roi::PixelRect;
use crate::error::{AnalysisError, Result};
use image::RgbaImage;

/// Byte layout of one pixel in a `PixelBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Four bytes per pixel: red, green, blue, alpha.
    Rgba8,
    /// Three bytes per pixel: red, green, blue. Treated as opaque.
    Rgb8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A row-major, unpadded 8-bit-per-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw bytes without checking them. See `validate`.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Wraps raw bytes, failing fast when the length does not match the dimensions.
    pub fn try_new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let buffer = Self::new(width, height, format, data);
        buffer.validate()?;
        Ok(buffer)
    }

    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Rgb8, data)
    }

    /// A buffer where every pixel is `pixel`.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&[pixel.red, pixel.green, pixel.blue, pixel.alpha]);
        }
        Self::rgba(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// `width * height`, or `None` when it does not fit in `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// The byte length implied by the dimensions and layout, or `None` when a
    /// malformed header describes more bytes than `usize` can address.
    pub fn expected_len(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.format.bytes_per_pixel())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AnalysisError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.expected_len().ok_or(AnalysisError::DimensionOverflow {
            width: self.width,
            height: self.height,
            bytes_per_pixel: self.format.bytes_per_pixel(),
        })?;
        if self.data.len() != expected {
            return Err(AnalysisError::InvalidInput {
                len: self.data.len(),
                expected,
                width: self.width,
                height: self.height,
                bytes_per_pixel: self.format.bytes_per_pixel(),
            });
        }
        Ok(())
    }

    /// The rectangle covering the whole frame.
    pub fn full_rect(&self) -> PixelRect {
        PixelRect {
            left: 0,
            top: 0,
            right: self.width,
            bottom: self.height,
        }
    }

    #[inline]
    fn decode(format: PixelFormat, bytes: &[u8]) -> Pixel {
        match format {
            PixelFormat::Rgba8 => Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            PixelFormat::Rgb8 => Pixel::opaque(bytes[0], bytes[1], bytes[2]),
        }
    }

    /// Every pixel in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        let format = self.format;
        self.data
            .chunks_exact(format.bytes_per_pixel())
            .map(move |bytes| Self::decode(format, bytes))
    }

    /// Pixels inside `rect`, row by row, without copying the region out.
    /// The rectangle must already be clamped to the buffer.
    pub fn region_pixels(&self, rect: PixelRect) -> impl Iterator<Item = Pixel> + '_ {
        let format = self.format;
        let bytes_per_pixel = format.bytes_per_pixel();
        let row_bytes = self.width as usize * bytes_per_pixel;
        let start = rect.left as usize * bytes_per_pixel;
        let end = rect.right as usize * bytes_per_pixel;
        (rect.top as usize..rect.bottom as usize).flat_map(move |row| {
            let row_start = row * row_bytes;
            self.data[row_start + start..row_start + end]
                .chunks_exact(bytes_per_pixel)
                .map(move |bytes| Self::decode(format, bytes))
        })
    }

    /// Converts to an `image` RGBA buffer, filling in alpha for RGB frames.
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        self.validate()?;
        let data = match self.format {
            PixelFormat::Rgba8 => self.data.clone(),
            PixelFormat::Rgb8 => self
                .pixels()
                .flat_map(|pixel| [pixel.red, pixel.green, pixel.blue, pixel.alpha])
                .collect(),
        };
        RgbaImage::from_raw(self.width, self.height, data).ok_or(AnalysisError::DimensionOverflow {
            width: self.width,
            height: self.height,
            bytes_per_pixel: 4,
        })
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        PixelBuffer::rgba(width, height, image.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> PixelBuffer {
        // Red channel holds the pixel's linear index so regions are easy to check.
        let mut data = Vec::new();
        for index in 0..(width * height) {
            data.extend_from_slice(&[index as u8, 0, 0, 255]);
        }
        PixelBuffer::rgba(width, height, data)
    }

    #[test]
    fn validate_rejects_mismatched_lengths() {
        let short = PixelBuffer::rgba(2, 2, vec![0; 15]);
        assert!(matches!(
            short.validate(),
            Err(AnalysisError::InvalidInput { len: 15, expected: 16, .. })
        ));

        let rgb = PixelBuffer::rgb(2, 2, vec![0; 12]);
        assert!(rgb.validate().is_ok());

        let empty = PixelBuffer::rgba(0, 4, Vec::new());
        assert!(matches!(empty.validate(), Err(AnalysisError::ZeroDimension { .. })));

        assert!(PixelBuffer::try_new(1, 1, PixelFormat::Rgb8, vec![1, 2]).is_err());
    }

    #[test]
    fn oversized_headers_fail_validation_instead_of_wrapping() {
        let huge = PixelBuffer::rgba(1 << 31, 1 << 31, Vec::new());
        assert!(huge.validate().is_err());

        if cfg!(target_pointer_width = "64") {
            assert_eq!(huge.pixel_count(), Some(1 << 62));
            assert_eq!(huge.expected_len(), None);
            assert!(matches!(
                huge.validate(),
                Err(AnalysisError::DimensionOverflow { bytes_per_pixel: 4, .. })
            ));
        }
    }

    #[test]
    fn rgb_pixels_decode_as_opaque() {
        let buffer = PixelBuffer::rgb(2, 1, vec![10, 20, 30, 40, 50, 60]);
        let pixels: Vec<Pixel> = buffer.pixels().collect();
        assert_eq!(pixels, vec![Pixel::opaque(10, 20, 30), Pixel::opaque(40, 50, 60)]);
    }

    #[test]
    fn region_pixels_walks_only_the_rectangle() {
        let buffer = numbered(4, 3);
        let rect = PixelRect {
            left: 1,
            top: 1,
            right: 3,
            bottom: 3,
        };
        let reds: Vec<u8> = buffer.region_pixels(rect).map(|p| p.red).collect();
        assert_eq!(reds, vec![5, 6, 9, 10]);
    }

    #[test]
    fn rgba_image_round_trip_keeps_dimensions() {
        let buffer = PixelBuffer::rgb(3, 2, vec![7; 18]);
        let image = buffer.to_rgba_image().expect("valid buffer");
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [7, 7, 7, 255]);

        let back = PixelBuffer::from(image);
        assert_eq!(back.format(), PixelFormat::Rgba8);
        assert_eq!(back.pixel_count(), Some(6));
    }
}
