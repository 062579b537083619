//! Unified compositing processor
//!
//! This module provides the `CompositeProcessor` that drives one run from
//! encoded inputs to a finished composite: decode, segment the foreground,
//! composite over the background. The CLI and library shortcuts both go
//! through it so behavior stays consistent.

use crate::{
    compositor::composite_detailed,
    config::CompositeConfig,
    error::Result,
    request::{CompositeRequest, ReadyRequest},
    segmentation::{segment_checked, PassthroughSegmenter, Segmenter},
    services::{ImageIOService, OutputFormatHandler, ProcessingStage, ProgressTracker},
    types::{CompositeMetadata, CompositeResult, ProcessingTimings},
};
use image::RgbaImage;
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Processor owning the configuration and segmenter for compositing runs
pub struct CompositeProcessor {
    config: CompositeConfig,
    segmenter: Box<dyn Segmenter>,
    progress_tracker: Option<ProgressTracker>,
}

impl CompositeProcessor {
    /// Create a processor that treats foregrounds as already cut out
    ///
    /// # Errors
    /// - Configuration fails validation
    pub fn new(config: CompositeConfig) -> Result<Self> {
        Self::with_segmenter(config, Box::new(PassthroughSegmenter))
    }

    /// Create a processor with a custom segmenter
    ///
    /// # Examples
    /// ```rust
    /// use imgly_composite::{CompositeConfig, CompositeProcessor, MaskSegmenter, SegmentationMask};
    ///
    /// let mask = SegmentationMask::new(vec![255; 16], (4, 4));
    /// let processor = CompositeProcessor::with_segmenter(
    ///     CompositeConfig::default(),
    ///     Box::new(MaskSegmenter::new(mask)),
    /// )?;
    /// assert_eq!(processor.segmenter_name(), "mask");
    /// # Ok::<(), imgly_composite::CompositeError>(())
    /// ```
    ///
    /// # Errors
    /// - Configuration fails validation
    pub fn with_segmenter(config: CompositeConfig, segmenter: Box<dyn Segmenter>) -> Result<Self> {
        config.validate()?;
        debug!("Creating composite processor with segmenter '{}'", segmenter.name());
        Ok(Self {
            config,
            segmenter,
            progress_tracker: None,
        })
    }

    /// Attach a progress tracker
    #[must_use]
    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    /// Replace or remove the progress tracker
    pub fn set_progress_tracker(&mut self, tracker: Option<ProgressTracker>) {
        self.progress_tracker = tracker;
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    #[must_use]
    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Composite two image files, using `-` to read one of them from stdin
    ///
    /// # Errors
    /// - File I/O errors when reading inputs
    /// - Image decoding failures
    /// - Segmentation or compositing failures
    #[instrument(skip(self, background_path, foreground_path), fields(
        background = %background_path.as_ref().display(),
        foreground = %foreground_path.as_ref().display()
    ))]
    pub fn process_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        background_path: P,
        foreground_path: Q,
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        self.begin_run();

        let decode_start = Instant::now();
        let decoded = ImageIOService::load_image(&background_path, "background").and_then(|bg| {
            ImageIOService::load_image(&foreground_path, "foreground").map(|fg| (bg, fg))
        });
        let (background, foreground) = self.track(decoded)?;
        let decode_ms = elapsed_ms(decode_start);

        let config = self.config.clone();
        let result = self.run(background, foreground, &config, decode_ms, total_start)?;
        self.complete(&result);
        Ok(result)
    }

    /// Composite two image files and write the encoded composite to `output`
    ///
    /// Uses the configured output format and JPEG quality. `-` writes to
    /// stdout. Progress runs through the encoding stage before completing.
    ///
    /// # Errors
    /// - Same as [`Self::process_files`]
    /// - Encoding or writing the output failed
    #[instrument(skip(self, background_path, foreground_path, output), fields(
        output = %output.as_ref().display()
    ))]
    pub fn process_files_to_output<P, Q, R>(
        &mut self,
        background_path: P,
        foreground_path: Q,
        output: R,
    ) -> Result<CompositeResult>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let total_start = Instant::now();
        self.begin_run();

        let decode_start = Instant::now();
        let decoded = ImageIOService::load_image(&background_path, "background").and_then(|bg| {
            ImageIOService::load_image(&foreground_path, "foreground").map(|fg| (bg, fg))
        });
        let (background, foreground) = self.track(decoded)?;
        let decode_ms = elapsed_ms(decode_start);

        let config = self.config.clone();
        let mut result = self.run(background, foreground, &config, decode_ms, total_start)?;

        self.report_stage(ProcessingStage::Encoding);
        let saved = result.save_timed(output.as_ref(), config.output_format, config.jpeg_quality);
        self.track(saved)?;
        debug!(
            "Wrote {} output to {}",
            OutputFormatHandler::format_name(config.output_format),
            output.as_ref().display()
        );

        self.complete(&result);
        Ok(result)
    }

    /// Composite two encoded images held in memory
    ///
    /// # Examples
    /// ```rust
    /// use imgly_composite::{CompositeConfig, CompositeProcessor, OutputFormat};
    /// use image::{Rgba, RgbaImage};
    /// use std::io::Cursor;
    ///
    /// fn png(image: &RgbaImage) -> Vec<u8> {
    ///     let mut bytes = Vec::new();
    ///     image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
    ///     bytes
    /// }
    ///
    /// let background = png(&RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255])));
    /// let foreground = png(&RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
    ///
    /// let mut processor = CompositeProcessor::new(CompositeConfig::default())?;
    /// let result = processor.process_bytes(&background, &foreground)?;
    /// assert_eq!(result.dimensions(), (40, 30));
    /// let encoded = result.to_bytes(OutputFormat::Png, 100)?;
    /// assert!(!encoded.is_empty());
    /// # Ok::<(), imgly_composite::CompositeError>(())
    /// ```
    ///
    /// # Errors
    /// - Image decoding failures
    /// - Segmentation or compositing failures
    #[instrument(skip(self, background_bytes, foreground_bytes), fields(
        background_bytes = background_bytes.len(),
        foreground_bytes = foreground_bytes.len()
    ))]
    pub fn process_bytes(
        &mut self,
        background_bytes: &[u8],
        foreground_bytes: &[u8],
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        self.begin_run();

        let decode_start = Instant::now();
        let decoded = ImageIOService::decode(background_bytes, "background").and_then(|bg| {
            ImageIOService::decode(foreground_bytes, "foreground").map(|fg| (bg, fg))
        });
        let (background, foreground) = self.track(decoded)?;
        let decode_ms = elapsed_ms(decode_start);

        let config = self.config.clone();
        let result = self.run(background, foreground, &config, decode_ms, total_start)?;
        self.complete(&result);
        Ok(result)
    }

    /// Composite already decoded images with the processor configuration
    ///
    /// # Errors
    /// - Segmentation or compositing failures
    pub fn process_images(
        &mut self,
        background: &RgbaImage,
        foreground: &RgbaImage,
    ) -> Result<CompositeResult> {
        let ready = CompositeRequest::new(self.config.clone())
            .with_background(background.clone())
            .with_foreground(foreground.clone())
            .into_ready()?;
        self.process_request(ready)
    }

    /// Composite a ready request using the configuration it carries
    ///
    /// # Errors
    /// - Segmentation or compositing failures
    #[instrument(skip(self, request), fields(
        background = %format!("{}x{}", request.background().width(), request.background().height()),
        foreground = %format!("{}x{}", request.foreground().width(), request.foreground().height())
    ))]
    pub fn process_request(&mut self, request: ReadyRequest) -> Result<CompositeResult> {
        let total_start = Instant::now();
        self.begin_run();

        let (background, foreground, config) = request.into_parts();
        let result = self.run(background, foreground, &config, 0, total_start)?;
        self.complete(&result);
        Ok(result)
    }

    fn run(
        &mut self,
        background: RgbaImage,
        foreground: RgbaImage,
        config: &CompositeConfig,
        decode_ms: u64,
        total_start: Instant,
    ) -> Result<CompositeResult> {
        let mut timings = ProcessingTimings {
            decode_ms,
            ..ProcessingTimings::default()
        };

        trace_info!(
            segmenter = self.segmenter.name(),
            background = %format!("{}x{}", background.width(), background.height()),
            foreground = %format!("{}x{}", foreground.width(), foreground.height()),
            shadow = config.shadow.enabled,
            "Starting composite"
        );

        let segmented = {
            let _span = span!(
                Level::INFO,
                "segmentation",
                segmenter = self.segmenter.name()
            )
            .entered();
            self.report_stage(ProcessingStage::Segmentation);
            let start = Instant::now();
            let segmented = segment_checked(self.segmenter.as_ref(), &foreground);
            timings.segmentation_ms = elapsed_ms(start);
            self.track(segmented)?
        };

        let outcome = {
            let _span = span!(
                Level::INFO,
                "compositing",
                scale = config.placement.scale,
                anchor = %config.placement.anchor
            )
            .entered();
            self.report_stage(ProcessingStage::Compositing);
            let start = Instant::now();
            let outcome = composite_detailed(
                &background,
                &segmented,
                &config.placement,
                config.active_shadow(),
            );
            timings.compositing_ms = elapsed_ms(start);
            self.track(outcome)?
        };

        timings.total_ms = elapsed_ms(total_start);

        let mut metadata = CompositeMetadata::new(self.segmenter.name());
        metadata.background_dimensions = background.dimensions();
        metadata.foreground_dimensions = outcome.foreground_dimensions;
        metadata.foreground_position = outcome.foreground_position;
        metadata.shadow_drawn = outcome.shadow_drawn;
        metadata.timings = timings;

        info!(
            "Composite finished in {}ms (foreground {}x{} at {},{})",
            metadata.timings.total_ms,
            outcome.foreground_dimensions.0,
            outcome.foreground_dimensions.1,
            outcome.foreground_position.x,
            outcome.foreground_position.y
        );

        Ok(CompositeResult::new(outcome.image, metadata).with_cutout(segmented))
    }

    fn complete(&mut self, result: &CompositeResult) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(result.timings());
        }
    }

    fn begin_run(&mut self) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.restart();
            tracker.report_stage(ProcessingStage::ImageLoading);
        }
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    /// Forward failures to the progress tracker before propagating them
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let (Err(e), Some(tracker)) = (&result, &self.progress_tracker) {
            tracker.report_error(&e.to_string());
        }
        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
