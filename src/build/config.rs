use crate::result::{ReleaseError, Result};
use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// File the configure step leaves behind in a configured build directory.
pub const CONFIGURE_MARKER: &str = "CMakeCache.txt";

/// File identifying the project root when searching upward.
pub const PROJECT_MARKER: &str = "CMakeLists.txt";

pub const VERSION_FILE: &str = "VERSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum BuildType {
    #[value(name = "Debug")]
    Debug,
    #[default]
    #[value(name = "Release")]
    Release,
    #[value(name = "RelWithDebInfo")]
    RelWithDebInfo,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/** Output detail level for the build driver
 *
 * - `Quiet` (0): progress line only, diagnostics always shown
 * - `Normal` (1): progress line with the current action and file
 * - `Verbose` (2): every line of build tool output echoed verbatim
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Verbosity::Quiet),
            1 => Ok(Verbosity::Normal),
            2 => Ok(Verbosity::Verbose),
            other => Err(ReleaseError::config(format!(
                "Verbosity must be 0, 1 or 2 (got {})",
                other
            ))),
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Verbose => 2,
        }
    }
}

/** Settings for one release run
 *
 * Built once from defaults, an optional config file and command line
 * overrides, then shared read-only with the build driver, dependency
 * collector and packager.
 *
 * # Invariants
 * - every path is absolute
 * - the target and executable lists are non-empty
 * - the parallel job count is greater than zero
 *
 * # Example
 * ```no_run
 * use orbit_release::build::{BuildConfig, Verbosity};
 *
 * let config = BuildConfig::for_project("/work/Gravix")?
 *     .with_parallel_jobs(8)?
 *     .with_verbosity(Verbosity::Verbose);
 * assert_eq!(config.targets().len(), 3);
 * # Ok::<(), orbit_release::result::ReleaseError>(())
 * ```
 */
#[derive(Debug, Clone)]
pub struct BuildConfig {
    project_root: PathBuf,
    build_dir: PathBuf,
    output_dir: PathBuf,
    build_type: BuildType,
    generator: SmolStr,
    targets: Vec<SmolStr>,
    options: IndexMap<SmolStr, SmolStr>,
    verbosity: Verbosity,
    parallel_jobs: usize,
    program: PathBuf,
    env: IndexMap<SmolStr, String>,
    product_name: SmolStr,
    executables: Vec<SmolStr>,
    binary_subdir: PathBuf,
    extra_artifacts: Vec<PathBuf>,
    asset_dirs: Vec<PathBuf>,
    ui_config: Option<PathBuf>,
}

impl BuildConfig {
    /// Default configuration rooted at the project containing this tool.
    pub fn create_default() -> Result<Self> {
        let root = locate_project_root()?;
        Self::for_project(root)
    }

    /// Default configuration for an explicit project root.
    pub fn for_project(project_root: impl AsRef<Path>) -> Result<Self> {
        let project_root = absolutize(project_root)?;
        let build_type = BuildType::default();

        let mut options = IndexMap::new();
        options.insert("CMAKE_BUILD_TYPE".into(), build_type.as_str().into());
        options.insert("GRAVIX_USE_VULKAN".into(), "ON".into());
        options.insert("GRAVIX_BUILD_EDITOR".into(), "ON".into());
        options.insert("GRAVIX_BUILD_SCRIPTING".into(), "ON".into());

        Ok(Self {
            build_dir: project_root.join("build").join("OrbitRelease"),
            output_dir: project_root.join("dist"),
            build_type,
            generator: "Ninja".into(),
            targets: vec!["Gravix-ScriptCore".into(), "Gravix".into(), "Orbit".into()],
            options,
            verbosity: Verbosity::default(),
            parallel_jobs: default_parallel_jobs(),
            program: PathBuf::from("cmake"),
            env: IndexMap::new(),
            product_name: "Orbit".into(),
            executables: vec![format!("Orbit{}", std::env::consts::EXE_SUFFIX).into()],
            binary_subdir: PathBuf::from("bin"),
            extra_artifacts: vec![PathBuf::from("Gravix-ScriptCore/Gravix-ScriptCore.dll")],
            asset_dirs: vec![PathBuf::from("Assets")],
            ui_config: Some(PathBuf::from("scripts/OrbitRelease/imgui.ini")),
            project_root,
        })
    }

    pub fn with_build_dir(mut self, build_dir: impl AsRef<Path>) -> Result<Self> {
        self.build_dir = absolutize(build_dir)?;
        Ok(self)
    }

    pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Result<Self> {
        self.output_dir = absolutize(output_dir)?;
        Ok(self)
    }

    pub fn with_parallel_jobs(mut self, jobs: usize) -> Result<Self> {
        if jobs == 0 {
            return Err(ReleaseError::config(ReleaseError::INVALID_JOB_COUNT));
        }
        self.parallel_jobs = jobs;
        Ok(self)
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Changes the build type, keeping the `CMAKE_BUILD_TYPE` option in step.
    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self.options
            .insert("CMAKE_BUILD_TYPE".into(), build_type.as_str().into());
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let targets: Vec<SmolStr> = targets.into_iter().map(Into::into).collect();
        if targets.is_empty() {
            return Err(ReleaseError::config(ReleaseError::EMPTY_TARGET_LIST));
        }
        self.targets = targets;
        Ok(self)
    }

    pub fn with_generator(mut self, generator: impl Into<SmolStr>) -> Self {
        self.generator = generator.into();
        self
    }

    /// Sets or replaces one `-D<KEY>=<VALUE>` option.
    pub fn with_option(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Adds an environment variable passed to every build tool invocation.
    pub fn with_env(mut self, key: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.product_name = name.into();
        self
    }

    pub fn with_executables<I, S>(mut self, executables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let executables: Vec<SmolStr> = executables.into_iter().map(Into::into).collect();
        if executables.is_empty() {
            return Err(ReleaseError::config("Executable list cannot be empty"));
        }
        self.executables = executables;
        Ok(self)
    }

    pub fn with_binary_subdir(mut self, subdir: impl Into<PathBuf>) -> Self {
        self.binary_subdir = subdir.into();
        self
    }

    pub fn with_extra_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.extra_artifacts = artifacts;
        self
    }

    pub fn with_asset_dirs(mut self, asset_dirs: Vec<PathBuf>) -> Self {
        self.asset_dirs = asset_dirs;
        self
    }

    pub fn with_ui_config(mut self, ui_config: Option<PathBuf>) -> Self {
        self.ui_config = ui_config;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build_type(&self) -> BuildType {
        self.build_type
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn targets(&self) -> &[SmolStr] {
        &self.targets
    }

    pub fn options(&self) -> &IndexMap<SmolStr, SmolStr> {
        &self.options
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn parallel_jobs(&self) -> usize {
        self.parallel_jobs
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn env(&self) -> &IndexMap<SmolStr, String> {
        &self.env
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn executables(&self) -> &[SmolStr] {
        &self.executables
    }

    /// Directory the build places linked executables in.
    pub fn binary_dir(&self) -> PathBuf {
        self.build_dir.join(&self.binary_subdir)
    }

    pub fn primary_executable(&self) -> PathBuf {
        // executables is never empty
        self.binary_dir().join(self.executables[0].as_str())
    }

    /// Build artifacts copied next to the executable when present.
    pub fn extra_artifacts(&self) -> Vec<PathBuf> {
        self.extra_artifacts
            .iter()
            .map(|artifact| self.build_dir.join(artifact))
            .collect()
    }

    pub fn asset_dirs(&self) -> Vec<PathBuf> {
        self.asset_dirs
            .iter()
            .map(|dir| self.project_root.join(dir))
            .collect()
    }

    pub fn ui_config(&self) -> Option<PathBuf> {
        self.ui_config
            .as_ref()
            .map(|file| self.project_root.join(file))
    }

    pub fn configure_marker(&self) -> PathBuf {
        self.build_dir.join(CONFIGURE_MARKER)
    }

    pub fn version_file(&self) -> PathBuf {
        self.project_root.join(VERSION_FILE)
    }
}

fn absolutize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ReleaseError::config("Path cannot be empty"));
    }
    Ok(std::path::absolute(path)?)
}

fn default_parallel_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Nearest ancestor of the running executable holding a project marker,
/// then the same search from the working directory.
fn locate_project_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    let found = exe_dir
        .iter()
        .chain(std::iter::once(&current_dir))
        .find_map(|start| {
            start
                .ancestors()
                .find(|dir| dir.join(PROJECT_MARKER).is_file())
                .map(Path::to_path_buf)
        });

    if found.is_none() {
        log::warn!(
            "No {} found above the tool or working directory, using {}",
            PROJECT_MARKER,
            current_dir.display()
        );
    }

    Ok(found.unwrap_or(current_dir))
}
