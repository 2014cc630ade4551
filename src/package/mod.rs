pub mod archive;
pub mod packager;
pub mod version;

pub use archive::{create_archive, ArchiveReport};
pub use packager::{render_readme, PackageReport, Packager, MANIFEST_FILE, README_FILE};
pub use version::{package_name, read_version, DEFAULT_VERSION};

use crate::utils::CopyFailure;
use std::fmt;
use std::path::PathBuf;

/// Naming and locations of one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePackage {
    pub name: String,
    pub version: String,
    pub dir: PathBuf,
    pub archive_path: PathBuf,
}

/// Non-fatal problem met while assembling a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageWarning {
    AssetDirectoryMissing(PathBuf),
    ArtifactMissing(PathBuf),
    CopyFailed(CopyFailure),
}

impl fmt::Display for PackageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageWarning::AssetDirectoryMissing(path) => {
                write!(f, "Asset directory not found: {}", path.display())
            }
            PackageWarning::ArtifactMissing(path) => write!(f, "File not found: {}", path.display()),
            PackageWarning::CopyFailed(failure) => {
                write!(f, "Failed to copy {}: {}", failure.path.display(), failure.reason)
            }
        }
    }
}
