//! Configuration types for compositing operations

use crate::error::{CompositeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recommended scale range exposed by presentation layers
pub const SCALE_RANGE: (f32, f32) = (0.1, 3.0);

/// Recommended offset range (pixels) exposed by presentation layers
pub const OFFSET_RANGE: (i32, i32) = (-500, 500);

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency, alpha is dropped)
    Jpeg,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

/// Origin that user offsets are measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Offsets adjust the position that centers the unscaled foreground (default)
    Center,
    /// Offsets adjust the position that centers the foreground after scaling
    ScaledCenter,
    /// Offsets are raw coordinates from the background's top-left corner
    TopLeft,
}

impl Default for Anchor {
    fn default() -> Self {
        Self::Center
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::ScaledCenter => write!(f, "scaled-center"),
            Self::TopLeft => write!(f, "top-left"),
        }
    }
}

/// How the foreground is resized and positioned over the background
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Scale factor applied to the foreground, must be finite and positive
    pub scale: f32,
    /// Horizontal adjustment in pixels
    pub offset_x: i32,
    /// Vertical adjustment in pixels
    pub offset_y: i32,
    /// Origin of the offsets
    pub anchor: Anchor,
    /// Downscale the foreground to fit the background before scaling
    pub fit_to_background: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
            anchor: Anchor::Center,
            fit_to_background: false,
        }
    }
}

impl Placement {
    /// Placement with the given scale and offsets, centered anchor
    #[must_use]
    pub fn new(scale: f32, offset_x: i32, offset_y: i32) -> Self {
        Self {
            scale,
            offset_x,
            offset_y,
            ..Self::default()
        }
    }

    /// Validate the scale factor
    ///
    /// # Errors
    /// - Scale is zero, negative, NaN or infinite
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CompositeError::config_value_error(
                "scale",
                self.scale,
                "> 0",
                Some(1.0),
            ));
        }
        Ok(())
    }

    /// Describe values that are valid but outside the interactive ranges
    #[must_use]
    pub fn range_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.scale < SCALE_RANGE.0 || self.scale > SCALE_RANGE.1 {
            warnings.push(format!(
                "scale {} is outside the usual range {}-{}",
                self.scale, SCALE_RANGE.0, SCALE_RANGE.1
            ));
        }
        for (name, value) in [("offset_x", self.offset_x), ("offset_y", self.offset_y)] {
            if value < OFFSET_RANGE.0 || value > OFFSET_RANGE.1 {
                warnings.push(format!(
                    "{} {} is outside the usual range {} to {}",
                    name, value, OFFSET_RANGE.0, OFFSET_RANGE.1
                ));
            }
        }
        warnings
    }
}

/// Displacement of the shadow relative to the foreground
///
/// Positive values move the shadow up and to the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowOffset {
    pub dx: i32,
    pub dy: i32,
}

impl ShadowOffset {
    #[must_use]
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Equal displacement on both axes
    #[must_use]
    pub fn diagonal(distance: i32) -> Self {
        Self::new(distance, distance)
    }
}

impl Default for ShadowOffset {
    fn default() -> Self {
        Self::diagonal(20)
    }
}

/// Drop shadow settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSpec {
    /// Whether a shadow is drawn at all
    pub enabled: bool,
    /// Gaussian blur radius (sigma) in pixels, at least 1
    pub blur_radius: u32,
    /// Shadow displacement relative to the foreground
    pub offset: ShadowOffset,
    /// Multiplier applied to the silhouette alpha (0.0-1.0)
    pub opacity: f32,
}

impl Default for ShadowSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            blur_radius: 10,
            offset: ShadowOffset::default(),
            opacity: 1.0,
        }
    }
}

impl ShadowSpec {
    /// Enabled shadow with default geometry
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Validate blur radius and opacity
    ///
    /// # Errors
    /// - Blur radius of zero
    /// - Opacity outside 0.0-1.0 or non-finite
    pub fn validate(&self) -> Result<()> {
        if self.blur_radius == 0 {
            return Err(CompositeError::config_value_error(
                "shadow blur radius",
                self.blur_radius,
                ">= 1",
                Some(10),
            ));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(CompositeError::config_value_error(
                "shadow opacity",
                self.opacity,
                "0.0-1.0",
                Some(1.0),
            ));
        }
        Ok(())
    }
}

/// Request-scoped configuration for one compositing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Foreground resize and position
    pub placement: Placement,

    /// Drop shadow settings
    pub shadow: ShadowSpec,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            shadow: ShadowSpec::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
        }
    }
}

impl CompositeConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use imgly_composite::{CompositeConfig, ShadowSpec};
    ///
    /// let config = CompositeConfig::builder()
    ///     .scale(0.5)
    ///     .offset(40, -20)
    ///     .shadow(ShadowSpec::enabled())
    ///     .build()
    ///     .unwrap();
    /// assert!(config.shadow.enabled);
    /// ```
    #[must_use]
    pub fn builder() -> CompositeConfigBuilder {
        CompositeConfigBuilder::default()
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    /// - File cannot be read
    /// - JSON is malformed
    /// - Loaded values fail validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| CompositeError::file_io_error("read config file", path_ref, &e))?;
        Self::from_json_str(&content)
    }

    /// Parse a configuration from a JSON string
    ///
    /// # Errors
    /// - JSON is malformed
    /// - Parsed values fail validation
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CompositeError::invalid_parameter(format!("Malformed configuration JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration as pretty-printed JSON
    ///
    /// # Errors
    /// - Serialization failure
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CompositeError::encode(format!("Failed to serialize configuration: {}", e)))
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Invalid scale
    /// - Invalid shadow settings (checked only when the shadow is enabled)
    /// - JPEG quality above 100
    pub fn validate(&self) -> Result<()> {
        self.placement.validate()?;

        if self.shadow.enabled {
            self.shadow.validate()?;
        }

        if self.jpeg_quality > 100 {
            return Err(CompositeError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        Ok(())
    }

    /// Shadow settings if the shadow is enabled
    #[must_use]
    pub fn active_shadow(&self) -> Option<&ShadowSpec> {
        self.shadow.enabled.then_some(&self.shadow)
    }
}

/// Builder for `CompositeConfig`
#[derive(Debug, Default)]
pub struct CompositeConfigBuilder {
    config: CompositeConfig,
}

impl CompositeConfigBuilder {
    #[must_use]
    pub fn placement(mut self, placement: Placement) -> Self {
        self.config.placement = placement;
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.placement.scale = scale;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.config.placement.offset_x = offset_x;
        self.config.placement.offset_y = offset_y;
        self
    }

    #[must_use]
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.config.placement.anchor = anchor;
        self
    }

    #[must_use]
    pub fn fit_to_background(mut self, fit: bool) -> Self {
        self.config.placement.fit_to_background = fit;
        self
    }

    #[must_use]
    pub fn shadow(mut self, shadow: ShadowSpec) -> Self {
        self.config.shadow = shadow;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(0, 100);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any validation failure reported by `CompositeConfig::validate`
    pub fn build(self) -> Result<CompositeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompositeConfig::default();
        assert_eq!(config.placement.scale, 1.0);
        assert_eq!(config.placement.anchor, Anchor::Center);
        assert!(!config.shadow.enabled);
        assert_eq!(config.shadow.offset, ShadowOffset::diagonal(20));
        assert_eq!(config.output_format, OutputFormat::Png);
        assert!(config.validate().is_ok());
        assert!(config.active_shadow().is_none());
    }

    #[test]
    fn test_builder_rejects_non_positive_scale() {
        for scale in [0.0, -0.5, f32::NAN, f32::INFINITY] {
            let result = CompositeConfig::builder().scale(scale).build();
            assert!(
                matches!(result, Err(CompositeError::InvalidParameter(_))),
                "scale {scale} should be rejected"
            );
        }
    }

    #[test]
    fn test_disabled_shadow_is_not_validated() {
        let shadow = ShadowSpec {
            enabled: false,
            blur_radius: 0,
            ..ShadowSpec::default()
        };
        assert!(CompositeConfig::builder().shadow(shadow).build().is_ok());

        let shadow = ShadowSpec {
            enabled: true,
            blur_radius: 0,
            ..ShadowSpec::default()
        };
        assert!(CompositeConfig::builder().shadow(shadow).build().is_err());
    }

    #[test]
    fn test_shadow_opacity_range() {
        let mut shadow = ShadowSpec::enabled();
        shadow.opacity = 1.5;
        let err = shadow.validate().unwrap_err();
        assert!(err.to_string().contains("shadow opacity"));
    }

    #[test]
    fn test_jpeg_quality_validation() {
        let config = CompositeConfig::builder().jpeg_quality(150).build().unwrap();
        assert_eq!(config.jpeg_quality, 100);

        let mut config = CompositeConfig::default();
        config.jpeg_quality = 101;
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("JPEG quality"));
        assert!(error.to_string().contains("0-100"));
    }

    #[test]
    fn test_json_partial_config() {
        let json = r#"{
            "placement": { "scale": 0.5, "offset_x": -40, "anchor": "top-left" },
            "shadow": { "enabled": true, "blur_radius": 4 }
        }"#;
        let config = CompositeConfig::from_json_str(json).unwrap();
        assert_eq!(config.placement.scale, 0.5);
        assert_eq!(config.placement.offset_x, -40);
        assert_eq!(config.placement.offset_y, 0);
        assert_eq!(config.placement.anchor, Anchor::TopLeft);
        assert!(config.shadow.enabled);
        assert_eq!(config.shadow.blur_radius, 4);
        assert_eq!(config.shadow.offset, ShadowOffset::diagonal(20));
    }

    #[test]
    fn test_json_round_trip_and_rejection() {
        let config = CompositeConfig::builder()
            .scale(2.0)
            .output_format(OutputFormat::Tiff)
            .build()
            .unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"tiff\""));
        assert_eq!(CompositeConfig::from_json_str(&json).unwrap(), config);

        let invalid = r#"{ "placement": { "scale": 0.0 } }"#;
        assert!(CompositeConfig::from_json_str(invalid).is_err());
        assert!(CompositeConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_range_warnings() {
        assert!(Placement::default().range_warnings().is_empty());

        let placement = Placement::new(5.0, 600, 0);
        let warnings = placement.range_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("scale"));
        assert!(warnings[1].contains("offset_x"));
        assert!(placement.validate().is_ok());
    }

    #[test]
    fn test_anchor_names() {
        let config =
            CompositeConfig::from_json_str(r#"{ "placement": { "anchor": "scaled-center" } }"#)
                .unwrap();
        assert_eq!(config.placement.anchor, Anchor::ScaledCenter);
        assert_eq!(Anchor::ScaledCenter.to_string(), "scaled-center");
        assert_eq!(Anchor::default(), Anchor::Center);
    }
}
