//! Output format handling service
//!
//! Encoding of the final composite lives here so the compositor never
//! touches codecs.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA image in the requested format
    ///
    /// JPEG drops the alpha channel, `Rgba8` returns the raw pixel buffer.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_composite::{services::OutputFormatHandler, config::OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let image = RgbaImage::new(4, 4);
    /// let bytes = OutputFormatHandler::encode(&image, OutputFormat::Png, 100)?;
    /// assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - The encoder rejects the image
    pub fn encode(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        let result = match format {
            OutputFormat::Png => image.write_to(&mut cursor, ImageFormat::Png),
            OutputFormat::Tiff => image.write_to(&mut cursor, ImageFormat::Tiff),
            OutputFormat::Jpeg => {
                let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
                encoder.encode_image(&rgb_image)
            },
            OutputFormat::Rgba8 => return Ok(image.as_raw().clone()),
        };

        result.map_err(|e| {
            CompositeError::encode(format!(
                "Failed to encode {}x{} composite as {}: {}",
                image.width(),
                image.height(),
                Self::format_name(format),
                e
            ))
        })?;

        Ok(buffer)
    }

    /// Get the appropriate file extension for a given output format
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "raw",
        }
    }

    /// MIME type for downloads
    #[must_use]
    pub fn mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::Rgba8 => "application/octet-stream",
        }
    }

    /// Human-readable format name
    #[must_use]
    pub fn format_name(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Rgba8 => "RGBA8",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::Tiff | OutputFormat::Rgba8 => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Warn when the chosen format discards the alpha channel
    pub fn validate_for_composite(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            log::warn!(
                "Output format {:?} does not support transparency. Transparent background areas will be flattened.",
                format
            );
        }
    }

    /// Infer an output format from a file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<OutputFormat> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "raw" | "rgba" => Some(OutputFormat::Rgba8),
            _ => None,
        }
    }
}
