//! Services separating I/O, encoding and progress reporting from compositing

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::{ImageIOService, STDIO_PATH};
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
