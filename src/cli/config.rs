//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliAnchor, CliOutputFormat};
use crate::{
    config::{Anchor, CompositeConfig, OutputFormat, ShadowOffset},
    services::{OutputFormatHandler, STDIO_PATH},
};
use anyhow::{Context, Result};
use std::path::Path;

/// Convert CLI arguments to a `CompositeConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: JSON file (if any) first, then flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositeConfig> {
        let mut config = match &cli.config {
            Some(path) => CompositeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => CompositeConfig::default(),
        };

        let placement = &mut config.placement;
        if let Some(scale) = cli.scale {
            placement.scale = scale;
        }
        if let Some(offset_x) = cli.offset_x {
            placement.offset_x = offset_x;
        }
        if let Some(offset_y) = cli.offset_y {
            placement.offset_y = offset_y;
        }
        if let Some(anchor) = cli.anchor {
            placement.anchor = match anchor {
                CliAnchor::Center => Anchor::Center,
                CliAnchor::ScaledCenter => Anchor::ScaledCenter,
                CliAnchor::TopLeft => Anchor::TopLeft,
            };
        }
        if cli.fit {
            placement.fit_to_background = true;
        }

        let shadow = &mut config.shadow;
        if cli.shadow {
            shadow.enabled = true;
        }
        if let Some(radius) = cli.shadow_blur {
            shadow.blur_radius = radius;
        }
        if let Some(distance) = cli.shadow_offset {
            shadow.offset = ShadowOffset::diagonal(distance);
        }
        if let Some(opacity) = cli.shadow_opacity {
            shadow.opacity = opacity;
        }

        config.output_format = match cli.format {
            Some(format) => format.into(),
            None if cli.config.is_none() => Self::format_from_output(&cli.output),
            None => config.output_format,
        };
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }

        config.validate().context("Invalid compositing parameters")?;
        Ok(config)
    }

    /// Infer the format from the output extension, PNG when unknown
    fn format_from_output(output: &str) -> OutputFormat {
        if output == STDIO_PATH {
            return OutputFormat::Png;
        }
        Path::new(output)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormatHandler::from_extension)
            .unwrap_or(OutputFormat::Png)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.print_config {
            return Ok(());
        }

        let background = cli
            .background
            .as_deref()
            .context("--background is required")?;
        let foreground = cli
            .foreground
            .as_deref()
            .context("--foreground is required")?;

        let stdin_inputs = [Some(background), Some(foreground), cli.mask_arg()]
            .into_iter()
            .flatten()
            .filter(|input| *input == STDIO_PATH)
            .count();
        if stdin_inputs > 1 {
            anyhow::bail!("At most one input can be read from stdin (-)");
        }

        if cli.output == STDIO_PATH && cli.save_cutout.as_deref() == Some(STDIO_PATH) {
            anyhow::bail!("The composite and the cut-out cannot both be written to stdout (-)");
        }

        if let Some(quality) = cli.jpeg_quality {
            if quality > 100 {
                anyhow::bail!("JPEG quality must be 0-100, got {}", quality);
            }
        }

        Ok(())
    }
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }
}
