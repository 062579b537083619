//! Segmentation collaborators
//!
//! Background removal itself is delegated to an implementation of
//! [`Segmenter`]. The compositor only relies on the returned alpha channel.

use crate::error::{CompositeError, Result};
use image::{imageops::FilterType, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Produces a foreground with background pixels made (near-)transparent
pub trait Segmenter: Send + Sync {
    /// Short name used in logs and metadata
    fn name(&self) -> &str;

    /// Segment an RGBA image, returning an image of identical dimensions
    ///
    /// # Errors
    /// - Implementation-specific failures
    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage>;
}

/// Run a segmenter and check its output contract
///
/// Any error from the segmenter, and any output whose dimensions differ from
/// the input, is reported as a segmentation failure.
///
/// # Errors
/// - Segmenter failed
/// - Output dimensions do not match the input
pub fn segment_checked(segmenter: &dyn Segmenter, image: &RgbaImage) -> Result<RgbaImage> {
    let output = segmenter.segment(image).map_err(|e| match e {
        CompositeError::SegmentationFailure(_) => e,
        other => CompositeError::segmentation_error_with_segmenter(
            segmenter.name(),
            &other.to_string(),
        ),
    })?;

    if output.dimensions() != image.dimensions() {
        return Err(CompositeError::segmentation_error_with_segmenter(
            segmenter.name(),
            &format!(
                "output is {}x{} but input is {}x{}",
                output.width(),
                output.height(),
                image.width(),
                image.height()
            ),
        ));
    }

    Ok(output)
}

/// Segmenter for foregrounds that already carry a cut-out alpha channel
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSegmenter;

impl Segmenter for PassthroughSegmenter {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(image.clone())
    }
}

/// Segmenter that applies a precomputed grayscale mask as alpha
#[derive(Debug, Clone)]
pub struct MaskSegmenter {
    mask: SegmentationMask,
}

impl MaskSegmenter {
    #[must_use]
    pub fn new(mask: SegmentationMask) -> Self {
        Self { mask }
    }

    /// Decode a mask from encoded image bytes (any format, converted to luma)
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SegmentationMask::from_bytes(bytes).map(Self::new)
    }

    #[must_use]
    pub fn mask(&self) -> &SegmentationMask {
        &self.mask
    }
}

impl Segmenter for MaskSegmenter {
    fn name(&self) -> &str {
        "mask"
    }

    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let mask = if self.mask.dimensions == image.dimensions() {
            std::borrow::Cow::Borrowed(&self.mask)
        } else {
            tracing::debug!(
                mask = %format!("{}x{}", self.mask.dimensions.0, self.mask.dimensions.1),
                image = %format!("{}x{}", image.width(), image.height()),
                "Resizing mask to image dimensions"
            );
            std::borrow::Cow::Owned(self.mask.resize(image.width(), image.height())?)
        };

        let mut output = image.clone();
        mask.apply_to_image(&mut output)?;
        Ok(output)
    }
}

/// Grayscale segmentation mask (0 = background, 255 = foreground)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    /// Decode a mask from encoded image bytes
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| CompositeError::image_load_error("mask", &e))?;
        Ok(Self::from_image(&image.to_luma8()))
    }

    /// Extract the alpha channel of an RGBA image as a mask
    #[must_use]
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let data = image.pixels().map(|p| p[3]).collect();
        Self::new(data, image.dimensions())
    }

    /// Convert mask to a grayscale image
    ///
    /// # Errors
    /// - Data length does not match the dimensions
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone()).ok_or_else(|| {
            CompositeError::segmentation(format!(
                "Mask data ({} bytes) does not match dimensions {}x{}",
                self.data.len(),
                width,
                height
            ))
        })
    }

    /// Apply the mask to the alpha channel of an RGBA image
    ///
    /// # Errors
    /// - Image and mask dimensions do not match
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(CompositeError::segmentation(format!(
                "Image ({}x{}) and mask ({}x{}) dimensions do not match",
                image.width(),
                image.height(),
                self.dimensions.0,
                self.dimensions.1
            )));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(self.data.iter()) {
            pixel[3] = alpha;
        }

        Ok(())
    }

    /// Resize the mask to new dimensions
    ///
    /// # Errors
    /// - Mask data does not match its dimensions
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        let current_image = self.to_image()?;
        let resized =
            image::imageops::resize(&current_image, new_width, new_height, FilterType::Lanczos3);

        Ok(SegmentationMask::from_image(&resized))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}
