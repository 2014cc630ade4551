use crate::build::BuildConfig;
use crate::deps::DependencyCollector;
use crate::package::version::package_name;
use crate::package::{PackageWarning, ReleasePackage};
use crate::result::{ReleaseError, Result};
use crate::utils::fs::{copy_dir_recursive, copy_file_preserving, CopyFailure};
use chrono::{DateTime, Datelike, Local};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const MANIFEST_FILE: &str = "dependency_manifest.txt";
pub const README_FILE: &str = "README.txt";

#[derive(Debug, Clone)]
pub struct PackageReport {
    pub package: ReleasePackage,
    pub executables: usize,
    pub libraries: usize,
    pub warnings: Vec<PackageWarning>,
}

/** Assembles the release directory
 *
 * The primary executable is the only hard requirement. Everything else
 * (secondary executables, assets, extra artifacts, the UI layout file)
 * is copied when present and reported as a [`PackageWarning`] when not.
 */
pub struct Packager<'a> {
    config: &'a BuildConfig,
    package: ReleasePackage,
    timestamp: DateTime<Local>,
    warnings: Vec<PackageWarning>,
}

impl<'a> Packager<'a> {
    pub fn new(config: &'a BuildConfig, version: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        let version = version.into();
        let name = package_name(config.product_name(), &version, &timestamp);
        let package = ReleasePackage {
            dir: config.output_dir().join(&name),
            archive_path: config.output_dir().join(format!("{}.zip", name)),
            name,
            version,
        };

        Self {
            config,
            package,
            timestamp,
            warnings: Vec::new(),
        }
    }

    pub fn package(&self) -> &ReleasePackage {
        &self.package
    }

    pub async fn assemble(mut self, collector: &DependencyCollector<'_>) -> Result<PackageReport> {
        let primary = self.config.primary_executable();
        if !primary.is_file() {
            println!("  [ERROR] Executable not found: {}", primary.display());
            return Err(ReleaseError::MissingExecutable(primary));
        }

        println!("\n[Packager] Creating package: {}", self.package.name);
        println!("[Packager] Version: {}", self.package.version);

        let dir = self.package.dir.clone();
        if dir.exists() {
            log::info!("Replacing existing package directory {}", dir.display());
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;

        let executables = self.copy_executables(&dir)?;

        let copy_report = collector.copy(&dir).await?;
        self.warnings
            .extend(copy_report.failures.into_iter().map(PackageWarning::CopyFailed));

        self.copy_assets(&dir)?;
        self.copy_optional_files(&dir);

        collector.generate_manifest(&dir.join(MANIFEST_FILE)).await?;

        fs::write(dir.join(README_FILE), render_readme(self.config, &self.package.version, &self.timestamp)).await?;
        println!("[Packager] Created {}", README_FILE);

        for warning in &self.warnings {
            log::warn!("{}", warning);
        }

        Ok(PackageReport {
            package: self.package,
            executables,
            libraries: copy_report.copied,
            warnings: self.warnings,
        })
    }

    fn copy_executables(&mut self, dir: &Path) -> Result<usize> {
        let bin_dir = self.config.binary_dir();
        println!("\n[Packager] Copying executables from: {}", bin_dir.display());

        let mut copied = 0;
        for (index, name) in self.config.executables().iter().enumerate() {
            let src = bin_dir.join(name.as_str());
            if !src.is_file() {
                if index == 0 {
                    return Err(ReleaseError::MissingExecutable(src));
                }
                println!("  [WARNING] Executable not found: {}", src.display());
                self.warnings.push(PackageWarning::ArtifactMissing(src));
                continue;
            }

            match copy_file_preserving(&src, &dir.join(name.as_str())) {
                Ok(()) => {
                    println!("  Copied: {}", name);
                    copied += 1;
                }
                Err(e) if index == 0 => return Err(e.into()),
                Err(e) => self.warnings.push(PackageWarning::CopyFailed(CopyFailure {
                    path: src,
                    reason: e.to_string(),
                })),
            }
        }

        Ok(copied)
    }

    fn copy_assets(&mut self, dir: &Path) -> Result<()> {
        println!("\n[Packager] Copying assets");

        for asset_dir in self.config.asset_dirs() {
            if !asset_dir.is_dir() {
                println!("  [WARNING] Asset directory not found: {}", asset_dir.display());
                self.warnings
                    .push(PackageWarning::AssetDirectoryMissing(asset_dir));
                continue;
            }

            let Some(name) = asset_dir.file_name() else {
                continue;
            };
            let report = copy_dir_recursive(&asset_dir, &dir.join(name))?;
            println!("  Copied: {}/ ({} files)", name.to_string_lossy(), report.copied);
            self.warnings
                .extend(report.failures.into_iter().map(PackageWarning::CopyFailed));
        }

        Ok(())
    }

    /// Extra build artifacts and the UI layout file, both optional.
    fn copy_optional_files(&mut self, dir: &Path) {
        let files: Vec<PathBuf> = self
            .config
            .extra_artifacts()
            .into_iter()
            .chain(self.config.ui_config())
            .collect();

        for src in files {
            let Some(name) = src.file_name() else {
                continue;
            };
            if !src.is_file() {
                println!("  [WARNING] {} not found at: {}", name.to_string_lossy(), src.display());
                self.warnings.push(PackageWarning::ArtifactMissing(src));
                continue;
            }

            match copy_file_preserving(&src, &dir.join(name)) {
                Ok(()) => println!("  Copied: {}", name.to_string_lossy()),
                Err(e) => self.warnings.push(PackageWarning::CopyFailed(CopyFailure {
                    path: src.clone(),
                    reason: e.to_string(),
                })),
            }
        }
    }
}

/// Plain-text notes shipped at the package root.
pub fn render_readme(config: &BuildConfig, version: &str, timestamp: &DateTime<Local>) -> String {
    let library_kind = if cfg!(windows) {
        "*.dll"
    } else if cfg!(target_os = "macos") {
        "*.dylib"
    } else {
        "*.so"
    };
    let executable = config
        .executables()
        .first()
        .map(|e| e.as_str())
        .unwrap_or_default();

    let mut readme = String::new();
    readme.push_str(&format!("{} {}\n", config.product_name(), version));
    readme.push_str(&format!("{}\n\n", "=".repeat(40)));
    readme.push_str(&format!("Build Date:    {}\n", timestamp.format("%Y-%m-%d %H:%M:%S")));
    readme.push_str(&format!("Platform:      {}\n", std::env::consts::OS));
    readme.push_str(&format!("Configuration: {}\n\n", config.build_type()));
    readme.push_str("Contents\n--------\n");
    readme.push_str(&format!("{:<24}main executable\n", executable));
    for asset_dir in config.asset_dirs() {
        if let Some(name) = asset_dir.file_name() {
            readme.push_str(&format!("{:<24}assets\n", format!("{}/", name.to_string_lossy())));
        }
    }
    readme.push_str(&format!("{:<24}runtime libraries\n", library_kind));
    readme.push_str(&format!("{:<24}library sources\n\n", MANIFEST_FILE));
    readme.push_str(&format!("(c) {} Gravix Engine\n", timestamp.year()));
    readme
}
