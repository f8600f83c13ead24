// THEORY:
// The adapter sits at the boundary between whatever a camera or file hands us and
// the canonical `PixelBuffer` the engine analyzes. It owns three concerns the core
// deliberately knows nothing about:
//
// 1.  **Layout**: native frames arrive as one or more planes with their own row and
//     pixel strides, in RGBA, BGRA, RGB or planar YUV 4:2:0. They are repacked into
//     tightly packed RGBA.
// 2.  **Color space**: YUV is converted to RGB with the BT.601 full-range transform
//     in fixed-point integer math.
// 3.  **Working size**: frames whose long edge exceeds the configured maximum are
//     downscaled with the `image` crate, preserving aspect ratio.
//
// Formats the adapter cannot convert fail with `UnsupportedFormat`; the core never
// sees them.

use crate::error::{AnalysisError, Result};
use crate::pipeline::PixelBuffer;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use log::debug;
use std::fmt;
use std::path::Path;

/// Pixel layouts a native camera frame can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFormat {
    Rgba8888,
    Bgra8888,
    Rgb888,
    /// Three planes (Y, U, V), chroma subsampled 2x2.
    Yuv420,
    /// A platform format code with no converter.
    Other(u32),
}

impl fmt::Display for NativeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeFormat::Rgba8888 => write!(f, "RGBA_8888"),
            NativeFormat::Bgra8888 => write!(f, "BGRA_8888"),
            NativeFormat::Rgb888 => write!(f, "RGB_888"),
            NativeFormat::Yuv420 => write!(f, "YUV_420"),
            NativeFormat::Other(code) => write!(f, "format code {code:#x}"),
        }
    }
}

/// One plane of a native frame, borrowed from the producer.
#[derive(Debug, Clone, Copy)]
pub struct FramePlane<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of two consecutive rows.
    pub row_stride: usize,
    /// Bytes between the starts of two horizontally adjacent samples.
    pub pixel_stride: usize,
}

impl<'a> FramePlane<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// A tightly packed plane: `width * bytes_per_sample` bytes per row.
    pub fn packed(data: &'a [u8], width: u32, bytes_per_sample: usize) -> Self {
        Self::new(data, width as usize * bytes_per_sample, bytes_per_sample)
    }

    fn ensure_covers(&self, plane: usize, columns: u32, rows: u32, sample_bytes: usize) -> Result<()> {
        let required = if columns == 0 || rows == 0 {
            0
        } else {
            (rows as usize - 1) * self.row_stride + (columns as usize - 1) * self.pixel_stride + sample_bytes
        };
        if self.data.len() < required {
            return Err(AnalysisError::PlaneTooShort {
                plane,
                len: self.data.len(),
                required,
            });
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.row_stride + x as usize * self.pixel_stride
    }
}

/// A frame as the camera delivered it.
#[derive(Debug, Clone)]
pub struct NativeFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub format: NativeFormat,
    pub planes: Vec<FramePlane<'a>>,
}

fn require_planes(frame: &NativeFrame<'_>, expected: usize) -> Result<()> {
    if frame.planes.len() < expected {
        return Err(AnalysisError::MissingPlane {
            format: match frame.format {
                NativeFormat::Rgba8888 => "RGBA_8888",
                NativeFormat::Bgra8888 => "BGRA_8888",
                NativeFormat::Rgb888 => "RGB_888",
                NativeFormat::Yuv420 => "YUV_420",
                NativeFormat::Other(_) => "unknown",
            },
            expected,
            actual: frame.planes.len(),
        });
    }
    Ok(())
}

// Channel order of the interleaved formats, as offsets of (r, g, b) and optional alpha.
fn interleaved_layout(format: NativeFormat) -> Option<([usize; 3], Option<usize>, usize)> {
    match format {
        NativeFormat::Rgba8888 => Some(([0, 1, 2], Some(3), 4)),
        NativeFormat::Bgra8888 => Some(([2, 1, 0], Some(3), 4)),
        NativeFormat::Rgb888 => Some(([0, 1, 2], None, 3)),
        NativeFormat::Yuv420 | NativeFormat::Other(_) => None,
    }
}

fn convert_interleaved(
    frame: &NativeFrame<'_>,
    channels: [usize; 3],
    alpha: Option<usize>,
    sample_bytes: usize,
) -> Result<Vec<u8>> {
    require_planes(frame, 1)?;
    let plane = frame.planes[0];
    plane.ensure_covers(0, frame.width, frame.height, sample_bytes)?;

    let mut rgba = Vec::with_capacity(frame.width as usize * frame.height as usize * 4);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let sample = &plane.data[plane.offset(x, y)..plane.offset(x, y) + sample_bytes];
            rgba.extend_from_slice(&[
                sample[channels[0]],
                sample[channels[1]],
                sample[channels[2]],
                alpha.map_or(u8::MAX, |index| sample[index]),
            ]);
        }
    }
    Ok(rgba)
}

/// BT.601 full-range YUV to RGB, 16.16 fixed point.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let luma = y as i32;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let red = luma + ((91_881 * e) >> 16);
    let green = luma - ((22_554 * d + 46_802 * e) >> 16);
    let blue = luma + ((116_130 * d) >> 16);
    [
        red.clamp(0, 255) as u8,
        green.clamp(0, 255) as u8,
        blue.clamp(0, 255) as u8,
    ]
}

fn convert_yuv420(frame: &NativeFrame<'_>) -> Result<Vec<u8>> {
    require_planes(frame, 3)?;
    let (luma, blue_diff, red_diff) = (frame.planes[0], frame.planes[1], frame.planes[2]);
    let chroma_width = frame.width.div_ceil(2);
    let chroma_height = frame.height.div_ceil(2);
    luma.ensure_covers(0, frame.width, frame.height, 1)?;
    blue_diff.ensure_covers(1, chroma_width, chroma_height, 1)?;
    red_diff.ensure_covers(2, chroma_width, chroma_height, 1)?;

    let mut rgba = Vec::with_capacity(frame.width as usize * frame.height as usize * 4);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let [r, g, b] = yuv_to_rgb(
                luma.data[luma.offset(x, y)],
                blue_diff.data[blue_diff.offset(x / 2, y / 2)],
                red_diff.data[red_diff.offset(x / 2, y / 2)],
            );
            rgba.extend_from_slice(&[r, g, b, u8::MAX]);
        }
    }
    Ok(rgba)
}

/// Size that fits within `max_dimension` on both edges, preserving aspect ratio.
/// Frames already small enough are returned unchanged.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let scale = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
    (
        ((width as f64 * scale) as u32).max(1),
        ((height as f64 * scale) as u32).max(1),
    )
}

/// Downscales `image` when its long edge exceeds `max_dimension`.
pub fn downscale(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = fit_within(width, height, max_dimension);
    if (target_width, target_height) == (width, height) {
        return image;
    }
    debug!("downscaling {width}x{height} frame to {target_width}x{target_height}");
    imageops::resize(&image, target_width, target_height, FilterType::Triangle)
}

/// Converts a native frame into a packed RGBA buffer no larger than `max_dimension`.
pub fn frame_to_buffer(frame: &NativeFrame<'_>, max_dimension: u32) -> Result<PixelBuffer> {
    if frame.width == 0 || frame.height == 0 {
        return Err(AnalysisError::ZeroDimension {
            width: frame.width,
            height: frame.height,
        });
    }

    let rgba = match frame.format {
        NativeFormat::Yuv420 => convert_yuv420(frame)?,
        NativeFormat::Other(_) => {
            return Err(AnalysisError::UnsupportedFormat(frame.format.to_string()));
        }
        format => match interleaved_layout(format) {
            Some((channels, alpha, sample_bytes)) => {
                convert_interleaved(frame, channels, alpha, sample_bytes)?
            }
            None => return Err(AnalysisError::UnsupportedFormat(format.to_string())),
        },
    };

    let buffer = PixelBuffer::rgba(frame.width, frame.height, rgba);
    if fit_within(frame.width, frame.height, max_dimension) == (frame.width, frame.height) {
        return Ok(buffer);
    }
    Ok(PixelBuffer::from(downscale(buffer.to_rgba_image()?, max_dimension)))
}

/// Decodes an encoded still (PNG, JPEG, ...) into a working buffer.
pub fn decode_image(bytes: &[u8], max_dimension: u32) -> Result<PixelBuffer> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(PixelBuffer::from(downscale(image, max_dimension)))
}

/// Opens and decodes a still image from disk into a working buffer.
pub fn load_image(path: impl AsRef<Path>, max_dimension: u32) -> Result<PixelBuffer> {
    let image = image::open(path)?.to_rgba8();
    Ok(PixelBuffer::from(downscale(image, max_dimension)))
}
