//! Model-backed segmenters
//!
//! Tensor conversion lives in [`preprocessing`] and is always available.
//! Runtime backends are feature-gated.

#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocessing;

#[cfg(feature = "onnx")]
pub use onnx::OnnxSegmenter;
pub use preprocessing::{image_to_tensor, tensor_to_mask, ModelPreprocessing};
