//! Compositing CLI tool
//!
//! Command-line interface for placing a foreground over a background using
//! the unified processor.

use super::config::CliConfigBuilder;
use super::progress::SpinnerProgressReporter;
use crate::{
    processor::CompositeProcessor,
    segmentation::{MaskSegmenter, PassthroughSegmenter, Segmenter},
    services::{ImageIOService, OutputFormatHandler, ProgressTracker, STDIO_PATH},
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    types::CompositeResult,
};
#[cfg(feature = "onnx")]
use crate::backends::{ModelPreprocessing, OnnxSegmenter};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Foreground/background compositing tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-composite")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Foreground image (use "-" for stdin)
    #[arg(short, long, value_name = "PATH", required_unless_present = "print_config")]
    pub foreground: Option<String>,

    /// Background image (use "-" for stdin)
    #[arg(short, long, value_name = "PATH", required_unless_present = "print_config")]
    pub background: Option<String>,

    /// Grayscale mask applied as the foreground alpha instead of its own
    #[arg(long, value_name = "PATH", conflicts_with = "model")]
    pub mask: Option<String>,

    /// ONNX salient-object model (e.g. U²-Net) that removes the foreground's background
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Square input size the model expects
    #[arg(long, value_name = "PIXELS", default_value_t = 320)]
    pub model_input_size: u32,

    /// Also write the segmented foreground as PNG
    #[arg(long, value_name = "PATH")]
    pub save_cutout: Option<String>,

    /// Foreground scale factor (0.1-3.0 recommended)
    #[arg(long)]
    pub scale: Option<f32>,

    /// Horizontal offset in pixels (-500 to 500 recommended)
    #[arg(long, allow_negative_numbers = true)]
    pub offset_x: Option<i32>,

    /// Vertical offset in pixels (-500 to 500 recommended)
    #[arg(long, allow_negative_numbers = true)]
    pub offset_y: Option<i32>,

    /// Origin the offsets are measured from
    #[arg(long, value_enum)]
    pub anchor: Option<CliAnchor>,

    /// Downscale the foreground to fit inside the background first
    #[arg(long)]
    pub fit: bool,

    /// Draw a drop shadow under the foreground
    #[arg(long)]
    pub shadow: bool,

    /// Shadow blur radius in pixels
    #[arg(long, value_name = "PIXELS")]
    pub shadow_blur: Option<u32>,

    /// Shadow displacement up-left of the foreground, in pixels
    #[arg(long, value_name = "PIXELS", allow_negative_numbers = true)]
    pub shadow_offset: Option<i32>,

    /// Shadow opacity (0.0-1.0)
    #[arg(long)]
    pub shadow_opacity: Option<f32>,

    /// Output format [default: from output extension, else png]
    #[arg(long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (0-100)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output file. Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT", default_value = "composite.png")]
    pub output: String,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Hide progress spinners
    #[arg(long)]
    pub no_progress: bool,

    /// Log output format on stderr
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub(crate) fn mask_arg(&self) -> Option<&str> {
        self.mask.as_deref()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Tiff,
    Rgba8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliAnchor {
    Center,
    ScaledCenter,
    TopLeft,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    let request_id = uuid::Uuid::new_v4().to_string();

    init_cli_tracing(cli.verbose, tracing_format(cli.log_format)?, &request_id)
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    for warning in config.placement.range_warnings() {
        warn!("{}", warning);
    }
    OutputFormatHandler::validate_for_composite(config.output_format);

    let segmenter = build_segmenter(&cli)?;
    let span = spans::request(&request_id, segmenter.name());
    let _guard = span.enter();

    let show_spinner = !cli.no_progress && std::io::stderr().is_terminal();
    let mut processor = CompositeProcessor::with_segmenter(config, segmenter)
        .context("Failed to create processor")?
        .with_progress(ProgressTracker::new(Box::new(SpinnerProgressReporter::new(
            show_spinner,
            cli.verbose > 0,
        ))));

    let (background, foreground) = match (&cli.background, &cli.foreground) {
        (Some(background), Some(foreground)) => (background, foreground),
        _ => anyhow::bail!("Both --background and --foreground are required"),
    };

    info!("Compositing {} over {}", foreground, background);
    let result = composite_to_output(&mut processor, background, foreground, &cli.output)?;

    if let Some(cutout_path) = &cli.save_cutout {
        result
            .save_cutout(cutout_path)
            .with_context(|| format!("Failed to write cut-out {}", cutout_path))?;
        info!("Wrote segmented foreground to {}", cutout_path);
    }
    Ok(())
}

fn tracing_format(format: CliLogFormat) -> Result<TracingFormat> {
    match format {
        CliLogFormat::Console => Ok(TracingFormat::Console),
        CliLogFormat::Compact => Ok(TracingFormat::Compact),
        #[cfg(feature = "tracing-json")]
        CliLogFormat::Json => Ok(TracingFormat::Json),
        #[cfg(not(feature = "tracing-json"))]
        CliLogFormat::Json => {
            anyhow::bail!("--log-format json requires the `tracing-json` feature")
        },
    }
}

fn build_segmenter(cli: &Cli) -> Result<Box<dyn Segmenter>> {
    if let Some(model_path) = &cli.model {
        return build_model_segmenter(model_path, cli.model_input_size);
    }

    match cli.mask_arg() {
        Some(mask_path) => {
            let bytes = ImageIOService::read_bytes(mask_path)
                .with_context(|| format!("Failed to read mask {}", mask_path))?;
            let segmenter = MaskSegmenter::from_bytes(&bytes).context("Failed to decode mask")?;
            Ok(Box::new(segmenter))
        },
        None => Ok(Box::new(PassthroughSegmenter)),
    }
}

#[cfg(feature = "onnx")]
fn build_model_segmenter(model_path: &Path, input_size: u32) -> Result<Box<dyn Segmenter>> {
    let segmenter =
        OnnxSegmenter::from_file(model_path, ModelPreprocessing::with_target_size(input_size))
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    Ok(Box::new(segmenter))
}

#[cfg(not(feature = "onnx"))]
fn build_model_segmenter(model_path: &Path, _input_size: u32) -> Result<Box<dyn Segmenter>> {
    anyhow::bail!(
        "Cannot load {}: this build has no model support, rebuild with --features onnx",
        model_path.display()
    )
}

fn composite_to_output(
    processor: &mut CompositeProcessor,
    background: &str,
    foreground: &str,
    output: &str,
) -> Result<CompositeResult> {
    let config = processor.config();
    let format_name = OutputFormatHandler::format_name(config.output_format);
    let _span = spans::output(Path::new(output), format_name).entered();

    let result = processor
        .process_files_to_output(background, foreground, output)
        .context("Failed to composite images")?;

    let (width, height) = result.dimensions();
    if output == STDIO_PATH {
        info!("Wrote {}x{} {} to stdout", width, height, format_name);
    } else {
        info!("Wrote {}x{} {} to {}", width, height, format_name, output);
    }
    info!("📊 {}", result.timing_summary());
    Ok(result)
}
