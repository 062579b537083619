//! Conversion between RGBA images and NCHW model tensors

use crate::{
    compositor::ensure_non_empty,
    error::{CompositeError, Result},
    segmentation::SegmentationMask,
};
use image::{imageops, imageops::FilterType, GrayImage, Luma, RgbaImage};
use ndarray::{Array4, Axis};
use serde::{Deserialize, Serialize};

/// Input geometry and normalization expected by a salient-object model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPreprocessing {
    /// Square input edge in pixels
    pub target_size: u32,
    /// Per-channel mean subtracted after scaling to 0-1
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation divided after mean subtraction
    pub normalization_std: [f32; 3],
}

impl Default for ModelPreprocessing {
    /// U²-Net geometry with ImageNet statistics
    fn default() -> Self {
        Self {
            target_size: 320,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

impl ModelPreprocessing {
    /// Same normalization with a different input edge
    #[must_use]
    pub fn with_target_size(target_size: u32) -> Self {
        Self {
            target_size,
            ..Self::default()
        }
    }

    /// # Errors
    /// - Target size of zero or above 4096
    /// - Non-positive or non-finite standard deviation
    pub fn validate(&self) -> Result<()> {
        if self.target_size == 0 || self.target_size > 4096 {
            return Err(CompositeError::config_value_error(
                "model input size",
                self.target_size,
                "1-4096",
                Some(320),
            ));
        }
        if self
            .normalization_std
            .iter()
            .any(|std| !std.is_finite() || *std <= 0.0)
        {
            return Err(CompositeError::invalid_parameter(format!(
                "normalization std must be positive, got {:?}",
                self.normalization_std
            )));
        }
        Ok(())
    }
}

/// Stretch the image to the model input and normalize it into a (1, 3, N, N) tensor
///
/// Alpha is ignored.
///
/// # Errors
/// - Zero-area image
/// - Invalid preprocessing parameters
pub fn image_to_tensor(image: &RgbaImage, preprocessing: &ModelPreprocessing) -> Result<Array4<f32>> {
    ensure_non_empty(image, "foreground")?;
    preprocessing.validate()?;

    let size = preprocessing.target_size;
    let resized = imageops::resize(image, size, size, FilterType::Lanczos3);

    let edge = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, edge, edge));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let channels = pixel
            .0
            .iter()
            .zip(preprocessing.normalization_mean)
            .zip(preprocessing.normalization_std)
            .enumerate();
        for (channel, ((&value, mean), std)) in channels {
            tensor[[0, channel, y as usize, x as usize]] = (f32::from(value) / 255.0 - mean) / std;
        }
    }

    Ok(tensor)
}

/// Turn the first channel of a model output into a mask of `width x height`
///
/// Predictions are min-max normalized before quantizing to 0-255, then
/// resized with Lanczos3. A constant prediction is clamped to 0-1 instead.
///
/// # Errors
/// - Output tensor is empty
/// - Output contains non-finite values
pub fn tensor_to_mask(output: &Array4<f32>, width: u32, height: u32) -> Result<SegmentationMask> {
    let (batch, channels, rows, cols) = output.dim();
    if batch == 0 || channels == 0 || rows == 0 || cols == 0 {
        return Err(CompositeError::segmentation(format!(
            "model output has an empty shape {:?}",
            output.dim()
        )));
    }

    let plane = output.index_axis(Axis(0), 0);
    let plane = plane.index_axis(Axis(0), 0);

    if plane.iter().any(|value| !value.is_finite()) {
        return Err(CompositeError::segmentation(
            "model output contains non-finite values",
        ));
    }

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    let normalize = |value: f32| {
        if range > f32::EPSILON {
            (value - min) / range
        } else {
            value.clamp(0.0, 1.0)
        }
    };

    let to_u32 = |dimension: usize| {
        u32::try_from(dimension).map_err(|_| {
            CompositeError::segmentation(format!("model output dimension {} is too large", dimension))
        })
    };
    let mut mask = GrayImage::new(to_u32(cols)?, to_u32(rows)?);
    for ((row, col), &value) in plane.indexed_iter() {
        let level = (normalize(value) * 255.0).round().clamp(0.0, 255.0) as u8;
        mask.put_pixel(col as u32, row as u32, Luma([level]));
    }

    let mask = SegmentationMask::from_image(&mask);
    if mask.dimensions == (width, height) {
        Ok(mask)
    } else {
        mask.resize(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_tensor_shape_and_normalization() {
        let image = RgbaImage::from_pixel(10, 6, Rgba([255, 0, 128, 0]));
        let preprocessing = ModelPreprocessing::with_target_size(8);

        let tensor = image_to_tensor(&image, &preprocessing).unwrap();
        assert_eq!(tensor.dim(), (1, 3, 8, 8));

        let red = tensor[[0, 0, 4, 4]];
        let green = tensor[[0, 1, 4, 4]];
        assert!((red - (1.0 - 0.485) / 0.229).abs() < 1e-3);
        assert!((green - (0.0 - 0.456) / 0.224).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_preprocessing() {
        let image = RgbaImage::new(4, 4);
        assert!(image_to_tensor(&image, &ModelPreprocessing::with_target_size(0)).is_err());

        let bad_std = ModelPreprocessing {
            normalization_std: [0.2, 0.0, 0.2],
            ..ModelPreprocessing::default()
        };
        assert!(matches!(
            bad_std.validate(),
            Err(CompositeError::InvalidParameter(_))
        ));
        assert!(image_to_tensor(&RgbaImage::new(0, 4), &ModelPreprocessing::default()).is_err());
    }

    #[test]
    fn test_mask_is_min_max_normalized() {
        // Left column low, right column high
        let output = Array4::from_shape_fn((1, 1, 2, 2), |(_, _, _, col)| {
            if col == 0 {
                -3.0
            } else {
                5.0
            }
        });
        let mask = tensor_to_mask(&output, 2, 2).unwrap();
        assert_eq!(mask.data, vec![0, 255, 0, 255]);
    }

    #[test]
    fn test_mask_is_resized_to_image() {
        let output = Array4::from_elem((1, 1, 4, 4), 1.0);
        let mask = tensor_to_mask(&output, 9, 7).unwrap();
        assert_eq!(mask.dimensions, (9, 7));
        assert!(mask.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_malformed_outputs() {
        let empty = Array4::<f32>::zeros((1, 0, 4, 4));
        assert!(matches!(
            tensor_to_mask(&empty, 4, 4),
            Err(CompositeError::SegmentationFailure(_))
        ));

        let nan = Array4::from_elem((1, 1, 2, 2), f32::NAN);
        assert!(tensor_to_mask(&nan, 2, 2).is_err());
    }
}
