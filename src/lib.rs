#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Compositing Library
//!
//! Places a cut-out foreground over a background image: the foreground is
//! resized, positioned relative to the background center (or top-left), and
//! alpha-blended onto a copy of the background, optionally over a blurred
//! drop shadow. Background removal itself is delegated to a [`Segmenter`].
//!
//! ## Features
//!
//! - **Pure compositing core**: resize, centering, shadow synthesis and
//!   source-over blending on `image` buffers
//! - **Pluggable segmentation**: pass-through for pre-cut foregrounds, a
//!   precomputed grayscale mask, or a pretrained ONNX model (`onnx` feature)
//! - **Format Support**: PNG, JPEG, TIFF input and output, raw RGBA8 output
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use imgly_composite::{composite_images, CompositeConfig, ShadowSpec};
//! use image::{Rgba, RgbaImage};
//!
//! let background = RgbaImage::from_pixel(800, 600, Rgba([255, 255, 255, 255]));
//! let foreground = RgbaImage::from_pixel(200, 200, Rgba([255, 0, 0, 255]));
//!
//! let config = CompositeConfig::builder()
//!     .shadow(ShadowSpec::enabled())
//!     .build()?;
//! let result = composite_images(&background, &foreground, &config)?;
//!
//! assert_eq!(result.dimensions(), (800, 600));
//! assert_eq!(*result.image.get_pixel(400, 300), Rgba([255, 0, 0, 255]));
//! # Ok::<(), imgly_composite::CompositeError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, progress spinners and tracing setup
//! - `onnx`: Automatic background removal with ONNX Runtime
//! - `tracing-json`: JSON log output for the CLI
//! - `webp-support`: WebP input decoding
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! imgly-composite = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod processor;
pub mod request;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
#[cfg(feature = "onnx")]
pub use backends::OnnxSegmenter;
pub use backends::ModelPreprocessing;
pub use compositor::{
    alpha_blend, composite, composite_detailed, compute_centered_offset, ensure_pixel_budget,
    fit_foreground_to_background, resize_foreground, synthesize_shadow,
    synthesize_shadow_with_opacity, CompositeOutcome, Position, Shadow, MAX_LAYER_PIXELS,
};
pub use config::{
    Anchor, CompositeConfig, CompositeConfigBuilder, OutputFormat, Placement, ShadowOffset,
    ShadowSpec,
};
pub use error::{CompositeError, Result};
pub use processor::CompositeProcessor;
pub use request::{CompositeRequest, InputSlot, ReadyRequest};
pub use segmentation::{
    segment_checked, MaskSegmenter, PassthroughSegmenter, SegmentationMask, Segmenter,
};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{CompositeMetadata, CompositeResult, ProcessingTimings};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Composite decoded images with a pre-cut foreground
///
/// The foreground's own alpha channel is used as-is.
///
/// # Errors
/// - Invalid configuration
/// - Zero-area inputs
pub fn composite_images(
    background: &image::RgbaImage,
    foreground: &image::RgbaImage,
    config: &CompositeConfig,
) -> Result<CompositeResult> {
    let ready = CompositeRequest::new(config.clone())
        .with_background(background.clone())
        .with_foreground(foreground.clone())
        .into_ready()?;
    CompositeProcessor::new(config.clone())?.process_request(ready)
}

/// Composite encoded images (PNG, JPEG, TIFF) held in memory
///
/// # Examples
///
/// ```rust,no_run
/// use imgly_composite::{composite_from_bytes, CompositeConfig};
///
/// # fn example(background: Vec<u8>, foreground: Vec<u8>) -> anyhow::Result<()> {
/// let config = CompositeConfig::default();
/// let result = composite_from_bytes(&background, &foreground, &config)?;
/// let png = result.to_bytes(config.output_format, config.jpeg_quality)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - Either input fails to decode
/// - Invalid configuration
pub fn composite_from_bytes(
    background_bytes: &[u8],
    foreground_bytes: &[u8],
    config: &CompositeConfig,
) -> Result<CompositeResult> {
    CompositeProcessor::new(config.clone())?.process_bytes(background_bytes, foreground_bytes)
}
