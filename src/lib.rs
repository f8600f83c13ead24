// THEORY:
// This file is the main entry point for the `pixel_colors` library crate.
// It defines the public API handed to frame producers: a camera callback, a still
// image loader, or the bundled command-line runner.
//
// The primary exports are the `PixelAnalyzer` (synchronous, one frame at a time)
// and the `StreamingPipeline` (asynchronous submit, instant read of the latest
// result), together with the options and result types that make up the wire
// contract. The leaf analyzers in `core_modules` stay public for callers that want
// a single stage, but the pipeline types are the intended surface.

pub mod adapter;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{AnalysisError, Result};
pub use parallel_pipeline::{AnalysisSnapshot, StreamingPipeline, SubmitOutcome};
pub use pipeline::{
    AnalysisOptions, ColorInfo, HsvColor, MotionResult, OverloadPolicy, PipelineConfig, PixelAnalyzer,
    PixelBuffer, PixelColorsResult, PixelFormat, RoiConfig,
};
