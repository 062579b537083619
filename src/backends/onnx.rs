//! ONNX Runtime segmenter for pretrained salient-object models (U²-Net, ISNet)

use super::preprocessing::{image_to_tensor, tensor_to_mask, ModelPreprocessing};
use crate::{
    error::{CompositeError, Result},
    segmentation::Segmenter,
};
use image::RgbaImage;
use instant::Instant;
use ndarray::{Array4, Ix4};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

/// Removes backgrounds by running an ONNX model whose first output is a
/// single-channel saliency map
pub struct OnnxSegmenter {
    session: Mutex<Session>,
    preprocessing: ModelPreprocessing,
}

impl OnnxSegmenter {
    /// Load a model from disk
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - ONNX Runtime could not build a session from it
    pub fn from_file<P: AsRef<Path>>(path: P, preprocessing: ModelPreprocessing) -> Result<Self> {
        let path = path.as_ref();
        preprocessing.validate()?;
        std::fs::metadata(path).map_err(|e| CompositeError::file_io_error("open model", path, &e))?;

        let load_start = Instant::now();
        let threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);

        let session = Session::builder()
            .map_err(|e| model_error("create session builder", &e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_error("set optimization level", &e))?
            .with_intra_threads(threads)
            .map_err(|e| model_error("set intra threads", &e))?
            .commit_from_file(path)
            .map_err(|e| model_error("load model", &e))?;

        log::info!(
            "Loaded segmentation model {} in {}ms ({} threads, input {}x{})",
            path.display(),
            load_start.elapsed().as_millis(),
            threads,
            preprocessing.target_size,
            preprocessing.target_size
        );

        Ok(Self {
            session: Mutex::new(session),
            preprocessing,
        })
    }

    #[must_use]
    pub fn preprocessing(&self) -> &ModelPreprocessing {
        &self.preprocessing
    }

    /// Run the model on a prepared NCHW tensor, returning its first output
    ///
    /// # Errors
    /// - Inference failed
    /// - First output is missing or not four-dimensional
    pub fn infer(&self, input: Array4<f32>) -> Result<Array4<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| CompositeError::segmentation("ONNX session lock poisoned"))?;

        let inference_start = Instant::now();
        log::debug!("Running ONNX inference on input {:?}", input.dim());

        let input_value =
            Value::from_array(input).map_err(|e| model_error("convert input tensor", &e))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| model_error("run inference", &e))?;

        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| CompositeError::segmentation("model produced no outputs"))?;
        let output = outputs
            .get(first_key)
            .ok_or_else(|| CompositeError::segmentation("first output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| model_error("extract output tensor", &e))?
            .to_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|e| {
                CompositeError::segmentation(format!("expected a 4D output tensor: {}", e))
            })?;

        log::debug!(
            "ONNX inference finished in {}ms, output {:?}",
            inference_start.elapsed().as_millis(),
            output.dim()
        );
        Ok(output)
    }
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &str {
        "onnx"
    }

    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let input = image_to_tensor(image, &self.preprocessing)?;
        let output = self.infer(input)?;
        let mask = tensor_to_mask(&output, image.width(), image.height())?;

        let stats = mask.statistics();
        log::debug!(
            "Model mask keeps {:.1}% of the foreground",
            stats.foreground_ratio * 100.0
        );

        let mut cutout = image.clone();
        mask.apply_to_image(&mut cutout)?;
        Ok(cutout)
    }
}

fn model_error(operation: &str, error: &impl std::fmt::Display) -> CompositeError {
    CompositeError::segmentation(format!("Failed to {}: {}", operation, error))
}
