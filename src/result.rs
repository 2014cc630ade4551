use smol_str::SmolStr;
use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

/** Main Result type alias for release operations
 *
 * # Usage
 * ```no_run
 * use orbit_release::result::Result;
 *
 * fn read_marker(path: &std::path::Path) -> Result<String> {
 *     // io::Error converts into ReleaseError automatically
 *     Ok(std::fs::read_to_string(path)?)
 * }
 * ```
 */
pub type Result<T> = std::result::Result<T, ReleaseError>;

/** Error enumeration for the release pipeline
 *
 * # Fatal Categories
 * - **Configuration**: the external configure step exited non-zero
 * - **TargetBuild**: one target's build step exited non-zero
 * - **MissingExecutable**: the primary artifact is absent at packaging time
 *
 * # Supporting Categories
 * - **Io / Walk**: filesystem access and directory traversal
 * - **Process**: an external program could not be spawned or awaited
 * - **Config**: invalid configuration values or config file contents
 * - **NotFound**: a required path or resource is missing
 * - **Archive**: zip archive writing failures
 * - **Pattern**: an inclusion glob pattern failed to compile
 *
 * Recoverable conditions (inspection tool absent, missing asset directory,
 * single-file copy failure) never surface as errors. They are logged and
 * recorded as [`crate::package::PackageWarning`] values instead.
 */
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process error: {0}")]
    Process(Cow<'static, str>),

    #[error("Config error: {0}")]
    Config(Cow<'static, str>),

    #[error("Not found: {0}")]
    NotFound(Cow<'static, str>),

    #[error("Configuration failed with exit code {exit_code}")]
    Configuration { exit_code: i32, diagnostics: String },

    #[error("Target '{target}' failed to build with exit code {exit_code}")]
    TargetBuild { target: SmolStr, exit_code: i32 },

    #[error("Primary executable not found: {}", .0.display())]
    MissingExecutable(PathBuf),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid library pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ReleaseError {
    pub const BUILD_TOOL_SPAWN_FAILED: &'static str = "Failed to start build tool";
    pub const EMPTY_TARGET_LIST: &'static str = "Target list cannot be empty";
    pub const INVALID_JOB_COUNT: &'static str = "Parallel job count must be greater than zero";

    /** Creates a Process error with flexible message input
     *
     * # Example
     * ```ignore
     * ReleaseError::process("Custom process error");
     * ReleaseError::process(format!("Process {} failed", pid));
     * ```
     */
    pub fn process(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Process(msg.into())
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Captured output of a failed external step, if the variant carries any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Configuration { diagnostics, .. } if !diagnostics.trim().is_empty() => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_build_error_names_target_and_code() {
        let err = ReleaseError::TargetBuild {
            target: "Gravix".into(),
            exit_code: 2,
        };
        assert_eq!(
            err.to_string(),
            "Target 'Gravix' failed to build with exit code 2"
        );
    }

    #[test]
    fn configuration_error_exposes_diagnostics() {
        let err = ReleaseError::Configuration {
            exit_code: 1,
            diagnostics: "CMake Error at CMakeLists.txt:3".to_string(),
        };
        assert_eq!(err.diagnostics(), Some("CMake Error at CMakeLists.txt:3"));
        assert!(ReleaseError::config("bad").diagnostics().is_none());
    }
}
