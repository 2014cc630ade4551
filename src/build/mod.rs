pub mod config;
pub mod driver;
pub mod file;
pub mod progress;

pub use config::*;
pub use driver::{configure_warnings, format_elapsed, BuildDriver, BuildSummary, ConfigureOutcome};
pub use file::ReleaseFile;
pub use progress::{classify, progress_percent, BuildProgressEvent, EventKind};
