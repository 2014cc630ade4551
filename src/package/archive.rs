use crate::result::{ReleaseError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub entries: usize,
    pub size_bytes: u64,
}

impl ArchiveReport {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/** Writes every regular file under `source_dir` into a deflate zip
 *
 * Entry names are relative to `source_dir` and always use `/`
 * separators. Entries are written in sorted path order, and on Unix they
 * keep the permission bits of their source file.
 *
 * # Errors
 * - `ReleaseError::NotFound` if `source_dir` is not a directory
 * - `ReleaseError::Walk` / `ReleaseError::Io` for unreadable files
 * - `ReleaseError::Archive` if the zip cannot be written
 */
pub fn create_archive(source_dir: &Path, zip_path: &Path) -> Result<ArchiveReport> {
    if !source_dir.is_dir() {
        return Err(ReleaseError::not_found(format!(
            "Package directory not found: {}",
            source_dir.display()
        )));
    }

    println!("\n[Packager] Creating ZIP archive");

    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut entries = 0;

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| ReleaseError::process(format!("Invalid archive path: {}", e)))?;
        let name = archive_name(relative);

        zip.start_file(name, entry_options(entry.path())?)?;
        let mut source = File::open(entry.path())?;
        std::io::copy(&mut source, &mut zip)?;
        entries += 1;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    let size_bytes = std::fs::metadata(zip_path)?.len();
    let report = ArchiveReport {
        path: zip_path.to_path_buf(),
        entries,
        size_bytes,
    };

    println!("  Archive size: {:.2} MB", report.size_mb());
    log::info!(
        "Created {} with {} entries ({} bytes)",
        zip_path.display(),
        entries,
        size_bytes
    );

    Ok(report)
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn entry_options(path: &Path) -> Result<SimpleFileOptions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(mode & 0o777))
}

#[cfg(not(unix))]
fn entry_options(_path: &Path) -> Result<SimpleFileOptions> {
    Ok(SimpleFileOptions::default().compression_method(CompressionMethod::Deflated))
}
