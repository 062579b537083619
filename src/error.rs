//! Error types for compositing operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error taxonomy for decode, segmentation, compositing and encode failures
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Input bytes are not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Non-positive scale, zero-area inputs or other rejected parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The segmenter failed or returned malformed output
    #[error("Segmentation failure: {0}")]
    SegmentationFailure(String),

    /// The result could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// A required image was not supplied
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompositeError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new segmentation failure
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationFailure(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new missing input error
    pub fn missing_input<S: Into<String>>(msg: S) -> Self {
        Self::MissingInput(msg.into())
    }

    // Enhanced contextual error creators

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create image decoding error with source context
    pub fn image_load_error(source: &str, error: &image::ImageError) -> Self {
        Self::Decode(format!(
            "Failed to decode {}: {}. Supported formats: PNG, JPEG, TIFF",
            source, error
        ))
    }

    /// Create parameter error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidParameter(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create segmentation error naming the segmenter
    pub fn segmentation_error_with_segmenter(segmenter: &str, details: &str) -> Self {
        Self::SegmentationFailure(format!("Segmenter '{}' failed: {}", segmenter, details))
    }
}

impl From<image::ImageError> for CompositeError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Encoding(e) => Self::Encode(e.to_string()),
            image::ImageError::IoError(e) => Self::Io(e),
            other => Self::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = CompositeError::invalid_parameter("scale must be positive");
        assert!(matches!(err, CompositeError::InvalidParameter(_)));

        let err = CompositeError::missing_input("background");
        assert!(matches!(err, CompositeError::MissingInput(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CompositeError::invalid_parameter("scale must be positive");
        assert_eq!(err.to_string(), "Invalid parameter: scale must be positive");
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CompositeError::file_io_error("read background", Path::new("/tmp/bg.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("read background"));
        assert!(error_string.contains("/tmp/bg.png"));

        let err = CompositeError::config_value_error("scale", -1.0, "> 0", Some(1.0));
        let error_string = err.to_string();
        assert!(error_string.contains("scale"));
        assert!(error_string.contains("-1"));
        assert!(error_string.contains("Recommended: 1"));

        let err = CompositeError::segmentation_error_with_segmenter("mask", "dimension mismatch");
        assert!(err.to_string().contains("'mask'"));
    }

    #[test]
    fn test_image_error_conversion() {
        let decode_err = image::load_from_memory(b"not an image").unwrap_err();
        let err: CompositeError = decode_err.into();
        assert!(matches!(err, CompositeError::Decode(_)));
    }
}
