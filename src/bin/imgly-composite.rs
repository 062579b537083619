//! IMG.LY Compositing CLI Tool
//!
//! Command-line interface for placing a cut-out foreground over a background,
//! with optional drop shadow, using the imgly-composite library.

#[cfg(feature = "cli")]
use imgly_composite::cli;

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
