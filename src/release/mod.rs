use crate::build::{BuildConfig, BuildDriver, BuildSummary, ConfigureOutcome};
use crate::deps::{DependencyCollector, DependencyConfig, ToolAvailability};
use crate::package::{create_archive, read_version, ArchiveReport, PackageReport, Packager};
use crate::result::{ReleaseError, Result};
use chrono::Local;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Idle,
    Configuring,
    Building,
    CollectingDependencies,
    Packaging,
    Archiving,
    Done,
    Failed,
}

impl ReleaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReleaseState::Done | ReleaseState::Failed)
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseState::Idle => "Idle",
            ReleaseState::Configuring => "Configuring",
            ReleaseState::Building => "Building",
            ReleaseState::CollectingDependencies => "CollectingDependencies",
            ReleaseState::Packaging => "Packaging",
            ReleaseState::Archiving => "Archiving",
            ReleaseState::Done => "Done",
            ReleaseState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions {
    pub skip_configure: bool,
    pub skip_build: bool,
    pub clean: bool,
}

#[derive(Debug)]
pub struct ReleaseReport {
    pub configure: Option<ConfigureOutcome>,
    pub build: Option<BuildSummary>,
    pub package: PackageReport,
    pub archive: ArchiveReport,
}

#[derive(Debug)]
pub enum ReleaseOutcome {
    Completed(Box<ReleaseReport>),
    Failed {
        phase: ReleaseState,
        error: ReleaseError,
    },
}

impl ReleaseOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseOutcome::Completed(_) => 0,
            ReleaseOutcome::Failed { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReleaseOutcome::Completed(_))
    }
}

/** Sequences one release from configuration to archive
 *
 * `Idle → Configuring → Building → CollectingDependencies → Packaging →
 * Archiving → Done`. The first failing phase moves the run to `Failed`
 * and nothing after it runs. Skipped phases are still entered so the
 * recorded history always has the same shape.
 */
pub struct ReleaseOrchestrator<'a> {
    config: &'a BuildConfig,
    deps: &'a DependencyConfig,
    options: ReleaseOptions,
    tool: Option<ToolAvailability>,
    state: ReleaseState,
    history: Vec<ReleaseState>,
}

impl<'a> ReleaseOrchestrator<'a> {
    pub fn new(config: &'a BuildConfig, deps: &'a DependencyConfig, options: ReleaseOptions) -> Self {
        Self {
            config,
            deps,
            options,
            tool: None,
            state: ReleaseState::Idle,
            history: vec![ReleaseState::Idle],
        }
    }

    /// Uses `tool` instead of detecting an inspection tool on the host.
    pub fn with_tool_availability(mut self, tool: ToolAvailability) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    pub fn history(&self) -> &[ReleaseState] {
        &self.history
    }

    pub async fn run(&mut self) -> ReleaseOutcome {
        match self.run_phases().await {
            Ok(report) => {
                self.enter(ReleaseState::Done);
                ReleaseOutcome::Completed(Box::new(report))
            }
            Err(error) => {
                let phase = self.state;
                log::error!("Release failed during {}: {}", phase, error);
                self.enter(ReleaseState::Failed);
                ReleaseOutcome::Failed { phase, error }
            }
        }
    }

    async fn run_phases(&mut self) -> Result<ReleaseReport> {
        let driver = BuildDriver::new(self.config);

        self.enter(ReleaseState::Configuring);
        let configure = if self.options.skip_configure {
            println!("\n[Release] Skipping configuration");
            None
        } else {
            Some(driver.configure(self.options.clean).await?)
        };

        self.enter(ReleaseState::Building);
        let build = if self.options.skip_build {
            println!("\n[Release] Skipping build");
            None
        } else {
            Some(driver.build().await?)
        };

        self.enter(ReleaseState::CollectingDependencies);
        let executable = self.config.primary_executable();
        let mut collector = DependencyCollector::new(self.config, self.deps);
        match &self.tool {
            Some(tool) => collector.collect_with(&executable, tool).await?,
            None => collector.collect(&executable).await?,
        };

        self.enter(ReleaseState::Packaging);
        let version = read_version(&self.config.version_file()).await?;
        let package = Packager::new(self.config, version, Local::now())
            .assemble(&collector)
            .await?;

        self.enter(ReleaseState::Archiving);
        let archive = create_archive(&package.package.dir, &package.package.archive_path)?;

        Ok(ReleaseReport {
            configure,
            build,
            package,
            archive,
        })
    }

    fn enter(&mut self, state: ReleaseState) {
        if self.state.is_terminal() {
            return;
        }
        log::info!("Release phase: {} -> {}", self.state, state);
        self.state = state;
        self.history.push(state);
    }
}
