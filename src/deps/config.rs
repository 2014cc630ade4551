use std::path::Path;

/** Where shared libraries are searched for and which ones are left out
 *
 * Defaults are per platform: the Windows lists mirror the libraries every
 * Windows installation ships, the Unix lists cover the C runtime and the
 * system library directories.
 */
#[derive(Debug, Clone)]
pub struct DependencyConfig {
    /// Searched in order, relative to the project root.
    pub search_dirs: Vec<String>,
    /// File name globs picked up regardless of the executable's imports.
    pub include_patterns: Vec<String>,
    /// Library file names never shipped (compared case-insensitively).
    pub exclude: Vec<String>,
    /// Path prefixes of system library directories.
    pub system_dirs: Vec<String>,
    /// Inspection tool to use instead of the platform default.
    pub inspector: Option<String>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            search_dirs: vec![
                "ThirdParties/mono/bin/Release".to_string(),
                "ThirdParties/mono/lib".to_string(),
                "build/OrbitRelease/bin".to_string(),
            ],
            include_patterns: default_include_patterns(),
            exclude: default_exclude(),
            system_dirs: default_system_dirs(),
            inspector: None,
        }
    }
}

impl DependencyConfig {
    /// Whether `file_name` matches an exclusion entry.
    pub fn is_excluded_name(&self, file_name: &str) -> bool {
        self.exclude
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(file_name))
    }

    /// Whether `path` lives under one of the system directories.
    pub fn is_system_path(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.system_dirs
            .iter()
            .any(|prefix| starts_with_path_prefix(&path, prefix))
    }
}

/// Filesystems on Windows and macOS compare names case-insensitively.
pub const fn case_insensitive_fs() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

fn starts_with_path_prefix(path: &str, prefix: &str) -> bool {
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let head = &path[..prefix.len()];
    if case_insensitive_fs() {
        head.eq_ignore_ascii_case(prefix)
    } else {
        head == prefix
    }
}

fn default_include_patterns() -> Vec<String> {
    let patterns: &[&str] = if cfg!(windows) {
        &["mono-2.0-sgen.dll"]
    } else if cfg!(target_os = "macos") {
        &["libmonosgen-2.0*.dylib"]
    } else {
        &["libmonosgen-2.0.so*"]
    };
    patterns.iter().map(|p| p.to_string()).collect()
}

fn default_exclude() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &[
            "kernel32.dll",
            "user32.dll",
            "gdi32.dll",
            "winspool.drv",
            "comdlg32.dll",
            "advapi32.dll",
            "shell32.dll",
            "ole32.dll",
            "oleaut32.dll",
            "uuid.dll",
            "odbc32.dll",
            "odbccp32.dll",
            "vcruntime140.dll",
            "vcruntime140_1.dll",
            "msvcp140.dll",
            "ucrtbase.dll",
        ]
    } else if cfg!(target_os = "macos") {
        &["libSystem.B.dylib", "libc++.1.dylib", "libobjc.A.dylib"]
    } else {
        &[
            "linux-vdso.so.1",
            "ld-linux-x86-64.so.2",
            "ld-linux-aarch64.so.1",
            "libc.so.6",
            "libm.so.6",
            "libdl.so.2",
            "librt.so.1",
            "libpthread.so.0",
            "libstdc++.so.6",
            "libgcc_s.so.1",
        ]
    };
    names.iter().map(|n| n.to_string()).collect()
}

fn default_system_dirs() -> Vec<String> {
    let dirs: &[&str] = if cfg!(windows) {
        &[r"C:\Windows", r"C:\Program Files", r"C:\Program Files (x86)"]
    } else if cfg!(target_os = "macos") {
        &["/usr/lib/", "/System/Library/"]
    } else {
        &["/lib/", "/lib64/", "/usr/lib/", "/usr/lib64/"]
    };
    dirs.iter().map(|d| d.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_ignores_case() {
        let config = DependencyConfig {
            exclude: vec!["KERNEL32.dll".to_string()],
            ..DependencyConfig::default()
        };
        assert!(config.is_excluded_name("kernel32.DLL"));
        assert!(!config.is_excluded_name("kernel33.dll"));
    }

    #[test]
    fn system_prefix_matches_start_only() {
        let config = DependencyConfig {
            system_dirs: vec!["/usr/lib/".to_string()],
            ..DependencyConfig::default()
        };
        assert!(config.is_system_path(Path::new("/usr/lib/libfoo.so")));
        assert!(!config.is_system_path(Path::new("/opt/usr/lib/libfoo.so")));
        assert!(!config.is_system_path(Path::new("/usr")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn system_prefix_case_sensitive_on_linux() {
        let config = DependencyConfig {
            system_dirs: vec!["/usr/lib/".to_string()],
            ..DependencyConfig::default()
        };
        assert!(!config.is_system_path(Path::new("/USR/LIB/libfoo.so")));
    }
}
