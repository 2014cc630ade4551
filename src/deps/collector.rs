use crate::build::BuildConfig;
use crate::deps::config::case_insensitive_fs;
use crate::deps::inspector::{InspectionTool, ToolAvailability};
use crate::deps::DependencyConfig;
use crate::result::Result;
use crate::utils::fs::{copy_file_preserving, CopyFailure, CopyReport};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

/** Collects the shared libraries a release has to ship
 *
 * # Discovery
 * 1. Import table: the inspection tool lists the libraries the executable
 *    links against, each located in the search directories (first match
 *    wins). Skipped when no tool is installed.
 * 2. Directory search: files matching the inclusion patterns, whether or
 *    not the executable imports them. This is what picks up libraries
 *    loaded at runtime, such as the Mono runtime.
 *
 * Both passes are unioned, then system libraries are filtered out.
 *
 * # Example
 * ```no_run
 * use orbit_release::build::BuildConfig;
 * use orbit_release::deps::{DependencyCollector, DependencyConfig};
 *
 * # async fn run() -> orbit_release::result::Result<()> {
 * let config = BuildConfig::create_default()?;
 * let deps = DependencyConfig::default();
 * let mut collector = DependencyCollector::new(&config, &deps);
 * collector.collect(&config.primary_executable()).await?;
 * collector.copy(&config.output_dir().join("package")).await?;
 * # Ok(())
 * # }
 * ```
 */
pub struct DependencyCollector<'a> {
    build_config: &'a BuildConfig,
    config: &'a DependencyConfig,
    collected: BTreeSet<PathBuf>,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(build_config: &'a BuildConfig, config: &'a DependencyConfig) -> Self {
        Self {
            build_config,
            config,
            collected: BTreeSet::new(),
        }
    }

    /// Absolute search directories in order, followed by the build's binary directory.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .config
            .search_dirs
            .iter()
            .map(|dir| self.build_config.project_root().join(dir))
            .collect();

        let binary_dir = self.build_config.binary_dir();
        if !roots.contains(&binary_dir) {
            roots.push(binary_dir);
        }
        roots
    }

    /// Runs both discovery passes with whatever inspection tool is installed.
    pub async fn collect(&mut self, executable: &Path) -> Result<Vec<PathBuf>> {
        let availability = ToolAvailability::detect(self.config);
        self.collect_with(executable, &availability).await
    }

    /// Returns the libraries this call added to the collected set.
    pub async fn collect_with(
        &mut self,
        executable: &Path,
        availability: &ToolAvailability,
    ) -> Result<Vec<PathBuf>> {
        println!(
            "\n[Dependencies] Analyzing dependencies for: {}",
            executable.display()
        );

        let mut discovered = BTreeSet::new();

        match availability {
            ToolAvailability::Available(tool) if executable.is_file() => {
                discovered.extend(self.find_imported(tool, executable).await);
            }
            ToolAvailability::Available(_) => {
                log::warn!(
                    "Executable {} not found, skipping import inspection",
                    executable.display()
                );
            }
            ToolAvailability::Unavailable => {
                println!("[Dependencies] No inspection tool found, using directory search only");
                log::info!("Dependency inspection tool unavailable, falling back to directory search");
            }
        }

        discovered.extend(self.search_known_directories().await?);

        let added: Vec<PathBuf> = filter_libraries(discovered, self.config)
            .into_iter()
            .filter(|library| self.collected.insert(library.clone()))
            .collect();

        println!(
            "[Dependencies] Found {} required libraries",
            self.collected.len()
        );
        Ok(added)
    }

    async fn find_imported(&self, tool: &InspectionTool, executable: &Path) -> BTreeSet<PathBuf> {
        let names = match tool.imported_libraries(executable).await {
            Ok(names) => names,
            Err(e) => {
                println!("[Dependencies] Warning: {}, using directory search only", e);
                log::warn!("Dependency inspection failed: {}", e);
                return BTreeSet::new();
            }
        };

        let mut found = BTreeSet::new();
        for name in names {
            match self.locate(&name) {
                Some(path) => {
                    log::debug!("Resolved import {} -> {}", name, path.display());
                    found.insert(path);
                }
                None => log::debug!("Import {} not found in search directories", name),
            }
        }
        found
    }

    /// First search directory containing `name`.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.search_roots()
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    async fn search_known_directories(&self) -> Result<BTreeSet<PathBuf>> {
        let patterns = self
            .config
            .include_patterns
            .iter()
            .map(|pattern| LibraryPattern::new(pattern))
            .collect::<Result<Vec<_>>>()?;

        let mut found = BTreeSet::new();

        for dir in self.search_roots() {
            if !dir.is_dir() {
                continue;
            }
            println!("[Dependencies] Searching: {}", dir.display());

            for pattern in &patterns {
                for library in pattern.find_in(&dir).await? {
                    println!("  Found: {}", file_name(&library));
                    found.insert(library);
                }
            }
        }

        Ok(found)
    }

    pub fn collected(&self) -> &BTreeSet<PathBuf> {
        &self.collected
    }

    /** Copies every collected library into `destination`
     *
     * Files keep their names, permissions and modification times. A
     * library that fails to copy is logged and skipped; the remaining
     * ones are still copied. When two collected libraries share a file
     * name, the first in path order is kept.
     */
    pub async fn copy(&self, destination: &Path) -> Result<CopyReport> {
        fs::create_dir_all(destination).await?;
        println!(
            "\n[Dependencies] Copying libraries to: {}",
            destination.display()
        );

        let mut report = CopyReport::default();
        let mut copied_names: HashMap<String, &PathBuf> = HashMap::new();

        for library in &self.collected {
            let name = file_name(library);
            if let Some(first) = copied_names.get(&name) {
                log::warn!(
                    "Skipping {}: {} already copied from {}",
                    library.display(),
                    name,
                    first.display()
                );
                report.failures.push(CopyFailure {
                    path: library.clone(),
                    reason: format!("duplicate file name, already copied from {}", first.display()),
                });
                continue;
            }

            let result = copy_file_preserving(library, &destination.join(&name));
            if result.is_ok() {
                println!("  Copied: {}", name);
                copied_names.insert(name, library);
            } else if let Err(e) = &result {
                println!("  Error copying {}: {}", name, e);
            }
            report.record(library, result);
        }

        println!("[Dependencies] Copied {} libraries", report.copied);
        Ok(report)
    }

    /// `<file name> <- <source path>` per library, ordered by file name.
    pub fn render_manifest(&self) -> String {
        let mut entries: Vec<(String, &PathBuf)> = self
            .collected
            .iter()
            .map(|library| (file_name(library), library))
            .collect();
        entries.sort();

        entries
            .into_iter()
            .map(|(name, path)| format!("{} <- {}\n", name, path.display()))
            .collect()
    }

    pub async fn generate_manifest(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render_manifest()).await?;
        println!("[Dependencies] Generated manifest: {}", path.display());
        Ok(())
    }
}

/** Removes system libraries from a discovered set
 *
 * A library is dropped when its file name matches an exclusion entry
 * (ignoring case) or its path starts with a system directory prefix.
 */
pub fn filter_libraries(discovered: BTreeSet<PathBuf>, config: &DependencyConfig) -> BTreeSet<PathBuf> {
    discovered
        .into_iter()
        .filter(|library| {
            let excluded = config.is_excluded_name(&file_name(library));
            let system = config.is_system_path(library);
            if excluded || system {
                log::debug!("Filtered system library {}", library.display());
            }
            !excluded && !system
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether a wildcard match looks like a loadable shared library.
fn is_shared_library(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.ends_with(".dll") || name.ends_with(".dylib") || name.ends_with(".so") || name.contains(".so.")
}

enum LibraryPattern {
    Exact(String),
    Glob(GlobMatcher),
}

impl LibraryPattern {
    fn new(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?', '[', '{']) {
            return Ok(LibraryPattern::Exact(pattern.to_string()));
        }

        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(case_insensitive_fs())
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(LibraryPattern::Glob(matcher))
    }

    async fn find_in(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        match self {
            LibraryPattern::Exact(name) => {
                let candidate = dir.join(name);
                Ok(candidate.is_file().then_some(candidate).into_iter().collect())
            }
            LibraryPattern::Glob(matcher) => {
                let mut matches = Vec::new();
                let mut entries = fs::read_dir(dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let path = entry.path();
                    if matcher.is_match(&name) && is_shared_library(&name) && path.is_file() {
                        matches.push(path);
                    }
                }
                Ok(matches)
            }
        }
    }
}
