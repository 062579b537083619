//! Error handling and edge case testing
//!
//! This module tests error conditions and boundary conditions that can occur
//! while decoding, segmenting, compositing and encoding.

use image::{Rgba, RgbaImage};
use imgly_composite::{
    composite, composite_from_bytes, composite_images, segment_checked, synthesize_shadow,
    CompositeConfig, CompositeError, CompositeProcessor, CompositeRequest, ImageIOService,
    OutputFormat, Placement, Result, SegmentationMask, Segmenter, ShadowOffset, ShadowSpec,
};
use std::io::Cursor;
use tempfile::TempDir;

fn png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

struct FailingSegmenter;

impl Segmenter for FailingSegmenter {
    fn name(&self) -> &str {
        "failing"
    }

    fn segment(&self, _image: &RgbaImage) -> Result<RgbaImage> {
        Err(CompositeError::invalid_parameter("model exploded"))
    }
}

struct CroppingSegmenter;

impl Segmenter for CroppingSegmenter {
    fn name(&self) -> &str {
        "cropping"
    }

    fn segment(&self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(RgbaImage::new(image.width() / 2, image.height()))
    }
}

#[test]
fn test_decode_errors_name_the_input() {
    let valid = png(&RgbaImage::new(4, 4));

    let err = composite_from_bytes(b"not an image", &valid, &CompositeConfig::default()).unwrap_err();
    assert!(matches!(err, CompositeError::Decode(_)));
    assert!(err.to_string().contains("background"));

    let err = composite_from_bytes(&valid, &[], &CompositeConfig::default()).unwrap_err();
    assert!(matches!(err, CompositeError::Decode(_)));
    assert!(err.to_string().contains("foreground"));

    // Truncated PNG
    let truncated = &valid[..valid.len() / 2];
    let err = composite_from_bytes(&valid, truncated, &CompositeConfig::default()).unwrap_err();
    assert!(matches!(err, CompositeError::Decode(_)));
}

#[test]
fn test_zero_area_inputs_rejected() {
    let empty = RgbaImage::new(0, 10);
    let image = RgbaImage::new(10, 10);

    for (background, foreground) in [(&empty, &image), (&image, &empty)] {
        let err = composite(background, foreground, &Placement::default(), None).unwrap_err();
        assert!(matches!(err, CompositeError::InvalidParameter(_)));
    }
}

#[test]
fn test_scale_that_shrinks_to_nothing() {
    let background = RgbaImage::new(10, 10);
    let foreground = RgbaImage::new(3, 3);

    let err = composite(&background, &foreground, &Placement::new(0.2, 0, 0), None).unwrap_err();
    assert!(matches!(err, CompositeError::InvalidParameter(_)));
    assert!(err.to_string().contains("zero area"));
}

#[test]
fn test_shadow_parameter_errors() {
    let foreground = RgbaImage::new(5, 5);

    let err = synthesize_shadow(&foreground, 0, ShadowOffset::default()).unwrap_err();
    assert!(matches!(err, CompositeError::InvalidParameter(_)));
    assert!(err.to_string().contains("blur radius"));

    let spec = ShadowSpec {
        opacity: -0.1,
        ..ShadowSpec::enabled()
    };
    let err = composite(&RgbaImage::new(10, 10), &foreground, &Placement::default(), Some(&spec))
        .unwrap_err();
    assert!(err.to_string().contains("shadow opacity"));
}

#[test]
fn test_large_shadow_offsets_are_clipped() {
    let background = RgbaImage::from_pixel(30, 30, Rgba([255, 255, 255, 255]));
    let foreground = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
    let spec = ShadowSpec {
        offset: ShadowOffset::new(-5000, 5000),
        blur_radius: 1,
        ..ShadowSpec::enabled()
    };

    let result = composite(&background, &foreground, &Placement::default(), Some(&spec)).unwrap();
    let black = result.pixels().filter(|p| p[0] == 0).count();
    assert_eq!(black, 100, "only the foreground itself is visible");
}

#[test]
fn test_segmentation_failures_are_wrapped() {
    let image = RgbaImage::new(8, 8);

    let err = segment_checked(&FailingSegmenter, &image).unwrap_err();
    assert!(matches!(err, CompositeError::SegmentationFailure(_)));
    assert!(err.to_string().contains("failing"));
    assert!(err.to_string().contains("model exploded"));

    let err = segment_checked(&CroppingSegmenter, &image).unwrap_err();
    assert!(matches!(err, CompositeError::SegmentationFailure(_)));
    assert!(err.to_string().contains("4x8"));
}

#[test]
fn test_processor_surfaces_segmentation_failure() {
    let mut processor =
        CompositeProcessor::with_segmenter(CompositeConfig::default(), Box::new(FailingSegmenter))
            .unwrap();
    let err = processor
        .process_images(&RgbaImage::new(10, 10), &RgbaImage::new(4, 4))
        .unwrap_err();
    assert!(matches!(err, CompositeError::SegmentationFailure(_)));
}

#[test]
fn test_missing_inputs() {
    let err = CompositeRequest::default()
        .with_foreground(RgbaImage::new(2, 2))
        .into_ready()
        .unwrap_err();
    assert!(matches!(err, CompositeError::MissingInput(_)));
    assert!(err.to_string().contains("background"));
}

#[test]
fn test_mask_dimension_mismatch() {
    let mask = SegmentationMask::new(vec![255; 4], (2, 2));
    let mut image = RgbaImage::new(3, 3);
    let err = mask.apply_to_image(&mut image).unwrap_err();
    assert!(matches!(err, CompositeError::SegmentationFailure(_)));
}

#[test]
fn test_one_pixel_images() {
    let background = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
    let foreground = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));

    let result = composite_images(&background, &foreground, &CompositeConfig::default()).unwrap();
    let pixel = result.image.get_pixel(0, 0);
    assert_eq!(pixel[3], 255);
    assert!((127..=129).contains(&pixel[0]), "got {pixel:?}");
}

#[test]
fn test_foreground_larger_than_background() {
    let background = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    let foreground = RgbaImage::from_pixel(30, 30, Rgba([0, 0, 255, 255]));

    let result = composite(&background, &foreground, &Placement::default(), None).unwrap();
    assert!(result.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));

    let fitted = Placement {
        fit_to_background: true,
        ..Placement::new(0.5, 0, 0)
    };
    let result = composite(&background, &foreground, &fitted, None).unwrap();
    let blue = result.pixels().filter(|p| p[2] > 250 && p[0] < 5).count();
    assert_eq!(blue, 25);
}

#[test]
fn test_output_write_failures() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    // A regular file cannot act as a parent directory
    let err = ImageIOService::write_bytes(blocker.join("out.png"), b"data").unwrap_err();
    assert!(matches!(err, CompositeError::Io(_)));

    let result = composite_images(
        &RgbaImage::new(2, 2),
        &RgbaImage::new(1, 1),
        &CompositeConfig::default(),
    )
    .unwrap();
    assert!(result.save(blocker.join("x.png"), OutputFormat::Png, 100).is_err());
}

#[test]
fn test_invalid_json_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, r#"{ "shadow": { "enabled": true, "opacity": 3.0 } }"#).unwrap();

    let err = CompositeConfig::from_json_file(&path).unwrap_err();
    assert!(matches!(err, CompositeError::InvalidParameter(_)));

    let err = CompositeConfig::from_json_file(temp_dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, CompositeError::Io(_)));
}
