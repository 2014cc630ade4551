use crate::result::Result;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a copy that tolerates individual failures.
#[derive(Debug, Clone, Default)]
pub struct CopyReport {
    pub copied: usize,
    pub failures: Vec<CopyFailure>,
}

impl CopyReport {
    pub fn record(&mut self, path: &Path, result: std::io::Result<()>) {
        match result {
            Ok(()) => self.copied += 1,
            Err(e) => {
                log::warn!("Failed to copy {}: {}", path.display(), e);
                self.failures.push(CopyFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Copies a file keeping its permissions and modification time.
///
/// Permissions are applied last so read-only sources still get their
/// timestamp carried over.
pub fn copy_file_preserving(src: &Path, dst: &Path) -> std::io::Result<()> {
    let metadata = std::fs::metadata(src)?;
    let mut source = File::open(src)?;
    let mut target = File::create(dst)?;

    std::io::copy(&mut source, &mut target)?;
    target.set_modified(metadata.modified()?)?;
    drop(target);

    std::fs::set_permissions(dst, metadata.permissions())
}

/** Recursively copies `src` into `dst`
 *
 * Directories are created as needed. A file that fails to copy is
 * recorded in the report and skipped; only a failure to read the source
 * tree itself is returned as an error.
 */
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<CopyReport> {
    let mut report = CopyReport::default();
    std::fs::create_dir_all(dst)?;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            report.record(entry.path(), copy_file_preserving(entry.path(), &target));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn preserves_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        std::fs::write(&src, "data").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        copy_file_preserving(&src, &dst).unwrap();
        let copied = std::fs::metadata(&dst).unwrap().modified().unwrap();
        let original = std::fs::metadata(&src).unwrap().modified().unwrap();
        assert_eq!(copied, original);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_source_keeps_mode_and_time() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Orbit");
        let dst = dir.path().join("package-Orbit");
        std::fs::write(&src, "elf").unwrap();
        let past = SystemTime::now() - Duration::from_secs(7200);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o555)).unwrap();

        copy_file_preserving(&src, &dst).unwrap();

        let copied = std::fs::metadata(&dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"elf");
        assert_eq!(copied.permissions().mode() & 0o777, 0o555);
        assert_eq!(
            copied.modified().unwrap(),
            std::fs::metadata(&src).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn copies_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Assets");
        std::fs::create_dir_all(src.join("Shaders/Common")).unwrap();
        std::fs::write(src.join("icon.png"), [1u8, 2, 3]).unwrap();
        std::fs::write(src.join("Shaders/Common/lighting.slang"), "x").unwrap();

        let dst = dir.path().join("out/Assets");
        let report = copy_dir_recursive(&src, &dst).unwrap();

        assert_eq!(report.copied, 2);
        assert!(report.failures.is_empty());
        assert!(dst.join("Shaders/Common/lighting.slang").is_file());
        assert_eq!(std::fs::read(dst.join("icon.png")).unwrap(), [1, 2, 3]);
    }
}
