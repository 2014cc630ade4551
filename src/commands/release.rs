use crate::build::{format_elapsed, BuildConfig, BuildType, ReleaseFile, Verbosity};
use crate::deps::DependencyConfig;
use crate::release::{ReleaseOptions, ReleaseOrchestrator, ReleaseOutcome};
use crate::result::Result;
use std::path::PathBuf;

/// Command line input of one release run, already validated.
#[derive(Debug, Clone, Default)]
pub struct ReleaseArgs {
    pub skip_configure: bool,
    pub skip_build: bool,
    pub clean: bool,
    pub build_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub build_type: Option<BuildType>,
    pub verbosity: u8,
    pub config: Option<PathBuf>,
}

impl ReleaseArgs {
    fn options(&self) -> ReleaseOptions {
        ReleaseOptions {
            skip_configure: self.skip_configure,
            skip_build: self.skip_build,
            clean: self.clean,
        }
    }
}

pub async fn execute(args: ReleaseArgs) -> Result<i32> {
    let mut cmd = ReleaseCommand::new();
    cmd.execute(args).await
}

#[derive(Default)]
pub struct ReleaseCommand;

impl ReleaseCommand {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&mut self, args: ReleaseArgs) -> Result<i32> {
        let (config, deps) = Self::load_config(&args).await?;

        print_header(&config);
        log::info!(
            "Starting release of {} from {}",
            config.product_name(),
            config.project_root().display()
        );

        let mut orchestrator = ReleaseOrchestrator::new(&config, &deps, args.options());
        let outcome = orchestrator.run().await;
        print_outcome(&outcome);

        Ok(outcome.exit_code())
    }

    /** Built-in defaults, then the release file, then command line flags
     *
     * # Errors
     * - `ReleaseError::Config` for a zero job count or an empty target list
     * - `ReleaseError::TomlParse` for a malformed release file
     * - `ReleaseError::Io` when an explicit release file cannot be read
     */
    pub async fn load_config(args: &ReleaseArgs) -> Result<(BuildConfig, DependencyConfig)> {
        let config = match &args.project_root {
            Some(root) => BuildConfig::for_project(root)?,
            None => BuildConfig::create_default()?,
        };
        let deps = DependencyConfig::default();

        let file = ReleaseFile::discover(config.project_root(), args.config.as_deref()).await?;
        let (mut config, deps) = match file {
            Some(file) => file.apply(config, deps)?,
            None => (config, deps),
        };

        if let Some(dir) = &args.build_dir {
            config = config.with_build_dir(dir)?;
        }
        if let Some(dir) = &args.output_dir {
            config = config.with_output_dir(dir)?;
        }
        if let Some(jobs) = args.jobs {
            config = config.with_parallel_jobs(jobs)?;
        }
        if let Some(build_type) = args.build_type {
            config = config.with_build_type(build_type);
        }
        let config = config.with_verbosity(Verbosity::from_level(args.verbosity)?);

        Ok((config, deps))
    }
}

fn print_header(config: &BuildConfig) {
    println!("{}", "=".repeat(80));
    println!("{} Release Build", config.product_name());
    println!("{}", "=".repeat(80));
    println!("  Project Root:   {}", config.project_root().display());
    println!("  Build Dir:      {}", config.build_dir().display());
    println!("  Output Dir:     {}", config.output_dir().display());
    println!("  Build Type:     {}", config.build_type());
    println!("  Parallel Jobs:  {}", config.parallel_jobs());
}

fn print_outcome(outcome: &ReleaseOutcome) {
    println!("\n{}", "=".repeat(80));
    match outcome {
        ReleaseOutcome::Completed(report) => {
            println!("Release completed successfully");
            println!("{}", "=".repeat(80));
            println!("  Package:        {}", report.package.package.name);
            println!("  Directory:      {}", report.package.package.dir.display());
            println!("  Archive:        {}", report.archive.path.display());
            println!("  Archive Size:   {:.2} MB", report.archive.size_mb());
            println!("  Libraries:      {}", report.package.libraries);
            if let Some(build) = &report.build {
                let targets: Vec<&str> = build.targets.iter().map(|t| t.as_str()).collect();
                println!("  Targets Built:  {}", targets.join(", "));
                println!("  Build Time:     {}", format_elapsed(build.elapsed));
                println!("  Diagnostics:    {}", build.diagnostics);
            }
            if !report.package.warnings.is_empty() {
                println!("  Warnings:");
                for warning in &report.package.warnings {
                    println!("    - {}", warning);
                }
            }
        }
        ReleaseOutcome::Failed { phase, error } => {
            println!("Release failed during {}", phase);
            println!("{}", "=".repeat(80));
            println!("  [ERROR] {}", error);
            if let Some(diagnostics) = error.diagnostics() {
                println!("\n{}", diagnostics.trim_end());
            }
        }
    }
}
