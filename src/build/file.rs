use crate::build::{BuildConfig, BuildType};
use crate::deps::DependencyConfig;
use crate::result::Result;
use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;
use std::path::{Path, PathBuf};
use tokio::fs;

/** Optional `orbit-release.toml` overriding the built-in defaults
 *
 * ```toml
 * [build]
 * generator = "Ninja"
 * targets = ["Gravix-ScriptCore", "Gravix", "Orbit"]
 * jobs = 12
 *
 * [build.options]
 * GRAVIX_USE_VULKAN = "ON"
 *
 * [build.env]
 * VULKAN_SDK = "C:/VulkanSDK/1.3.290.0"
 *
 * [dependencies]
 * exclude = ["vulkan-1.dll"]
 * inspector = "objdump"
 * ```
 *
 * Relative paths are resolved against the project root. Command line
 * flags are applied afterwards and win over the file.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseFile {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub dependencies: DependencySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub build_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub build_type: Option<BuildType>,
    pub generator: Option<SmolStr>,
    pub targets: Option<Vec<SmolStr>>,
    pub jobs: Option<usize>,
    pub program: Option<PathBuf>,
    pub product_name: Option<SmolStr>,
    pub executables: Option<Vec<SmolStr>>,
    pub binary_subdir: Option<PathBuf>,
    pub extra_artifacts: Option<Vec<PathBuf>>,
    pub asset_dirs: Option<Vec<PathBuf>>,
    pub ui_config: Option<PathBuf>,
    #[serde(default)]
    pub options: IndexMap<SmolStr, SmolStr>,
    #[serde(default)]
    pub env: IndexMap<SmolStr, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySection {
    pub search_dirs: Option<Vec<String>>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub system_dirs: Option<Vec<String>>,
    pub inspector: Option<String>,
}

impl ReleaseFile {
    pub const DEFAULT_NAME: &'static str = "orbit-release.toml";

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `explicit` when given, otherwise `<project root>/orbit-release.toml` if it exists.
    pub async fn discover(project_root: &Path, explicit: Option<&Path>) -> Result<Option<Self>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = project_root.join(Self::DEFAULT_NAME);
                if !default.is_file() {
                    return Ok(None);
                }
                default
            }
        };

        log::info!("Loading release config from {}", path.display());
        Self::from_file(&path).await.map(Some)
    }

    pub fn apply(
        self,
        config: BuildConfig,
        deps: DependencyConfig,
    ) -> Result<(BuildConfig, DependencyConfig)> {
        Ok((self.build.apply(config)?, self.dependencies.apply(deps)))
    }
}

impl BuildSection {
    fn apply(self, mut config: BuildConfig) -> Result<BuildConfig> {
        let root = config.project_root().to_path_buf();

        if let Some(dir) = self.build_dir {
            config = config.with_build_dir(root.join(dir))?;
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(root.join(dir))?;
        }
        if let Some(build_type) = self.build_type {
            config = config.with_build_type(build_type);
        }
        if let Some(generator) = self.generator {
            config = config.with_generator(generator);
        }
        if let Some(targets) = self.targets {
            config = config.with_targets(targets)?;
        }
        if let Some(jobs) = self.jobs {
            config = config.with_parallel_jobs(jobs)?;
        }
        if let Some(program) = self.program {
            config = config.with_program(program);
        }
        if let Some(name) = self.product_name {
            config = config.with_product_name(name);
        }
        if let Some(executables) = self.executables {
            config = config.with_executables(executables)?;
        }
        if let Some(subdir) = self.binary_subdir {
            config = config.with_binary_subdir(subdir);
        }
        if let Some(artifacts) = self.extra_artifacts {
            config = config.with_extra_artifacts(artifacts);
        }
        if let Some(asset_dirs) = self.asset_dirs {
            config = config.with_asset_dirs(asset_dirs);
        }
        if let Some(ui_config) = self.ui_config {
            config = config.with_ui_config(Some(ui_config));
        }
        for (key, value) in self.options {
            config = config.with_option(key, value);
        }
        for (key, value) in self.env {
            config = config.with_env(key, value);
        }

        Ok(config)
    }
}

impl DependencySection {
    fn apply(self, mut deps: DependencyConfig) -> DependencyConfig {
        if let Some(search_dirs) = self.search_dirs {
            deps.search_dirs = search_dirs;
        }
        if let Some(patterns) = self.include_patterns {
            deps.include_patterns = patterns;
        }
        if let Some(exclude) = self.exclude {
            deps.exclude = exclude;
        }
        if let Some(system_dirs) = self.system_dirs {
            deps.system_dirs = system_dirs;
        }
        if self.inspector.is_some() {
            deps.inspector = self.inspector;
        }
        deps
    }
}
