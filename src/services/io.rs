//! Image I/O operations service
//!
//! Decoding and file access are kept out of the compositor so it stays a
//! pure buffer-to-buffer transformation.

use crate::error::{CompositeError, Result};
use image::RgbaImage;
use std::io::{Read, Write};
use std::path::Path;

/// Marker path for standard input/output
pub const STDIO_PATH: &str = "-";

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Decode encoded image bytes into RGBA8
    ///
    /// # Arguments
    /// * `bytes` - Encoded image data (PNG, JPEG, TIFF)
    /// * `source` - Label used in error messages, e.g. "background"
    ///
    /// # Errors
    /// - Empty input
    /// - Bytes are not a decodable image
    pub fn decode(bytes: &[u8], source: &str) -> Result<RgbaImage> {
        if bytes.is_empty() {
            return Err(CompositeError::decode(format!("{} image data is empty", source)));
        }

        let image = image::load_from_memory(bytes)
            .map_err(|e| CompositeError::image_load_error(source, &e))?;

        log::debug!(
            "Decoded {} image: {}x{} ({} bytes)",
            source,
            image.width(),
            image.height(),
            bytes.len()
        );

        Ok(image.to_rgba8())
    }

    /// Read raw bytes from a file path, or stdin when the path is `-`
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Stdin produced no data
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();

        if path_ref == Path::new(STDIO_PATH) {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|e| CompositeError::file_io_error("read", "stdin", &e))?;
            if buffer.is_empty() {
                return Err(CompositeError::missing_input("no data received from stdin"));
            }
            return Ok(buffer);
        }

        if !path_ref.exists() {
            return Err(CompositeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        std::fs::read(path_ref).map_err(|e| CompositeError::file_io_error("read image file", path_ref, &e))
    }

    /// Read and decode an image file
    ///
    /// # Errors
    /// - File cannot be read
    /// - File contents are not a decodable image
    pub fn load_image<P: AsRef<Path>>(path: P, source: &str) -> Result<RgbaImage> {
        let bytes = Self::read_bytes(&path)?;
        Self::decode(&bytes, source).map_err(|e| match e {
            CompositeError::Decode(msg) => {
                CompositeError::decode(format!("{} (path: {})", msg, path.as_ref().display()))
            },
            other => other,
        })
    }

    /// Write bytes to a file, or stdout when the path is `-`
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    /// - Directory creation or write failure
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();

        if path_ref == Path::new(STDIO_PATH) {
            let mut stdout = std::io::stdout();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| CompositeError::file_io_error("write", "stdout", &e))?;
            return Ok(());
        }

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CompositeError::file_io_error("create output directory", parent, &e))?;
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| CompositeError::file_io_error("write output file", path_ref, &e))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decode_valid_png() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        let decoded = ImageIOService::decode(&png_bytes(&image), "foreground").unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        let err = ImageIOService::decode(b"definitely not an image", "background").unwrap_err();
        assert!(matches!(err, CompositeError::Decode(_)));
        assert!(err.to_string().contains("background"));

        let err = ImageIOService::decode(&[], "foreground").unwrap_err();
        assert!(matches!(err, CompositeError::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ImageIOService::load_image(temp_dir.path().join("missing.png"), "background")
            .unwrap_err();
        assert!(matches!(err, CompositeError::Io(_)));
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.png");
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));

        ImageIOService::write_bytes(&path, &png_bytes(&image)).unwrap();
        let loaded = ImageIOService::load_image(&path, "output").unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_load_corrupt_file_mentions_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.png");
        std::fs::write(&path, b"\x89PNG broken").unwrap();

        let err = ImageIOService::load_image(&path, "foreground").unwrap_err();
        assert!(matches!(err, CompositeError::Decode(_)));
        assert!(err.to_string().contains("corrupt.png"));
    }
}
