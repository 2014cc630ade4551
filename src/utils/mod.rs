pub mod fs;
pub mod process;

pub use fs::{copy_dir_recursive, copy_file_preserving, CopyFailure, CopyReport};
pub use process::{display_command, CapturedOutput, ProcessManager};
