//! Core types for compositing results

use crate::{
    compositor::Position,
    config::OutputFormat,
    error::{CompositeError, Result},
    services::{ImageIOService, OutputFormatHandler},
};
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of a compositing operation
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// The flattened composite, same dimensions as the background
    pub image: RgbaImage,

    /// Processing metadata
    pub metadata: CompositeMetadata,

    /// Segmented foreground before fit and scale, when the processor kept it
    pub cutout: Option<RgbaImage>,
}

impl CompositeResult {
    /// Create a new composite result
    #[must_use]
    pub fn new(image: RgbaImage, metadata: CompositeMetadata) -> Self {
        Self {
            image,
            metadata,
            cutout: None,
        }
    }

    /// Attach the segmented foreground
    #[must_use]
    pub fn with_cutout(mut self, cutout: RgbaImage) -> Self {
        self.cutout = Some(cutout);
        self
    }

    /// Write the segmented foreground as PNG so the cut-out can be inspected
    ///
    /// # Errors
    /// - No cut-out was kept
    /// - Encoding or writing failed
    pub fn save_cutout<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let cutout = self.cutout.as_ref().ok_or_else(|| {
            CompositeError::MissingInput("no segmented foreground was kept".to_string())
        })?;
        let bytes = OutputFormatHandler::encode(cutout, OutputFormat::Png, 100)?;
        ImageIOService::write_bytes(path, &bytes)
    }

    /// Encode as PNG (lossless, alpha preserving)
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes(OutputFormat::Png, 100)
    }

    /// Get the image as encoded bytes in the specified format
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&self.image, format, quality)
    }

    /// Encode and record the encode time in the metadata
    pub fn to_bytes_timed(&mut self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let encode_start = instant::Instant::now();
        let bytes = self.to_bytes(format, quality)?;
        self.metadata.timings.record_encode(encode_start.elapsed().as_millis() as u64);
        Ok(bytes)
    }

    /// Save the result as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save(path, OutputFormat::Png, 100)
    }

    /// Save in the specified format
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        let bytes = self.to_bytes(format, quality)?;
        ImageIOService::write_bytes(path, &bytes)
    }

    /// Save and record the encode time in the metadata
    pub fn save_timed<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let bytes = self.to_bytes_timed(format, quality)?;
        ImageIOService::write_bytes(path, &bytes)
    }

    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let breakdown = t.breakdown_percentages();

        let mut summary = format!(
            "Total: {}ms | Decode: {}ms ({:.1}%) | Segmentation: {}ms ({:.1}%) | Compositing: {}ms ({:.1}%)",
            t.total_ms,
            t.decode_ms, breakdown.decode_pct,
            t.segmentation_ms, breakdown.segmentation_pct,
            t.compositing_ms, breakdown.compositing_pct,
        );

        if let Some(encode_ms) = t.encode_ms {
            summary.push_str(&format!(
                " | Encode: {}ms ({:.1}%)",
                encode_ms, breakdown.encode_pct
            ));
        }

        summary
    }
}

/// Detailed timing breakdown for one compositing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Decoding both input images
    pub decode_ms: u64,

    /// Running the segmenter on the foreground
    pub segmentation_ms: u64,

    /// Resize, shadow synthesis and blending
    pub compositing_ms: u64,

    /// Final image encoding (if encoded)
    pub encode_ms: Option<u64>,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add encode time, extending the total accordingly
    pub fn record_encode(&mut self, encode_ms: u64) {
        self.encode_ms = Some(encode_ms);
        self.total_ms += encode_ms;
    }

    /// Get breakdown percentages
    #[must_use]
    pub fn breakdown_percentages(&self) -> TimingBreakdown {
        if self.total_ms == 0 {
            return TimingBreakdown::default();
        }

        let total = self.total_ms as f64;
        let pct = |ms: u64| (ms as f64 / total) * 100.0;

        TimingBreakdown {
            decode_pct: pct(self.decode_ms),
            segmentation_pct: pct(self.segmentation_ms),
            compositing_pct: pct(self.compositing_ms),
            encode_pct: pct(self.encode_ms.unwrap_or(0)),
            other_pct: pct(self.other_overhead_ms()),
        }
    }

    /// Get the "other" overhead time (unaccounted time)
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured_time = self.decode_ms
            + self.segmentation_ms
            + self.compositing_ms
            + self.encode_ms.unwrap_or(0);

        self.total_ms.saturating_sub(measured_time)
    }
}

/// Percentage breakdown of timing phases
#[derive(Debug, Clone, Default)]
pub struct TimingBreakdown {
    pub decode_pct: f64,
    pub segmentation_pct: f64,
    pub compositing_pct: f64,
    pub encode_pct: f64,
    pub other_pct: f64,
}

/// Metadata about the compositing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeMetadata {
    /// Detailed timing breakdown
    pub timings: ProcessingTimings,

    /// Segmenter used on the foreground
    pub segmenter: String,

    /// Background (and output) dimensions
    pub background_dimensions: (u32, u32),

    /// Foreground dimensions after fit and scale
    pub foreground_dimensions: (u32, u32),

    /// Resolved top-left foreground position
    pub foreground_position: Position,

    /// Whether a shadow layer was drawn
    pub shadow_drawn: bool,

    /// When the composite was produced
    pub created_at: DateTime<Utc>,
}

impl CompositeMetadata {
    /// Create new metadata for the named segmenter
    #[must_use]
    pub fn new(segmenter: impl Into<String>) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            segmenter: segmenter.into(),
            background_dimensions: (0, 0),
            foreground_dimensions: (0, 0),
            foreground_position: Position::default(),
            shadow_drawn: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_breakdown_percentages() {
        let timings = ProcessingTimings {
            decode_ms: 10,
            segmentation_ms: 50,
            compositing_ms: 30,
            encode_ms: None,
            total_ms: 100,
        };
        let breakdown = timings.breakdown_percentages();
        assert!((breakdown.segmentation_pct - 50.0).abs() < f64::EPSILON);
        assert!((breakdown.other_pct - 10.0).abs() < f64::EPSILON);
        assert_eq!(timings.other_overhead_ms(), 10);
    }

    #[test]
    fn test_zero_total_breakdown() {
        let breakdown = ProcessingTimings::new().breakdown_percentages();
        assert_eq!(breakdown.decode_pct, 0.0);
    }

    #[test]
    fn test_record_encode_extends_total() {
        let mut timings = ProcessingTimings {
            total_ms: 40,
            ..ProcessingTimings::default()
        };
        timings.record_encode(5);
        assert_eq!(timings.encode_ms, Some(5));
        assert_eq!(timings.total_ms, 45);
    }

    #[test]
    fn test_result_png_bytes_decode() {
        let image = RgbaImage::from_pixel(4, 3, Rgba([9, 8, 7, 255]));
        let result = CompositeResult::new(image.clone(), CompositeMetadata::new("passthrough"));

        let bytes = result.to_png_bytes().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
        assert!(result.timing_summary().starts_with("Total: 0ms"));
    }

    #[test]
    fn test_save_cutout() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("cutout.png");
        let metadata = CompositeMetadata::new("mask");

        let without = CompositeResult::new(RgbaImage::new(2, 2), metadata.clone());
        assert!(matches!(
            without.save_cutout(&path),
            Err(CompositeError::MissingInput(_))
        ));

        let cutout = RgbaImage::from_pixel(3, 2, Rgba([200, 10, 10, 0]));
        let with = without.with_cutout(cutout.clone());
        with.save_cutout(&path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgba8(), cutout);
    }
}
