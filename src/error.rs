use thiserror::Error;

/// Everything that can go wrong between receiving a frame and producing a result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("frame dimensions cannot be zero (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error(
        "pixel buffer length {len} does not match {width}x{height} at {bytes_per_pixel} bytes per pixel (expected {expected})"
    )]
    InvalidInput {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    },

    #[error("{width}x{height} at {bytes_per_pixel} bytes per pixel exceeds the addressable size")]
    DimensionOverflow {
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    },

    #[error("unsupported native frame format: {0}")]
    UnsupportedFormat(String),

    #[error("{format} frames need {expected} planes, got {actual}")]
    MissingPlane {
        format: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("plane {plane} holds {len} bytes but the frame layout needs {required}")]
    PlaneTooShort {
        plane: usize,
        len: usize,
        required: usize,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("the streaming worker has shut down")]
    WorkerClosed,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
