use crate::build::progress::ProgressDisplay;
use crate::build::{BuildConfig, Verbosity};
use crate::result::{ReleaseError, Result};
use crate::utils::process::{display_command, CapturedOutput, ProcessManager};
use smol_str::SmolStr;
use std::ffi::OsString;
use std::time::{Duration, Instant};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The configuration marker was present, nothing was run.
    AlreadyConfigured,
    Configured,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub targets: Vec<SmolStr>,
    pub elapsed: Duration,
    pub diagnostics: usize,
}

/** Drives the external build tool through configure and build
 *
 * Targets are built one after another in configured order; parallelism
 * only exists inside each invocation through the tool's own job count.
 * The first failing target stops the build.
 */
pub struct BuildDriver<'a> {
    config: &'a BuildConfig,
    process: ProcessManager,
}

impl<'a> BuildDriver<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            process: ProcessManager::with_env(config.env()),
        }
    }

    /// `-S <root> -B <build> -G <generator>` followed by every option as `-D<KEY>=<VALUE>`.
    pub fn configure_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-S".into(),
            self.config.project_root().into(),
            "-B".into(),
            self.config.build_dir().into(),
            "-G".into(),
            self.config.generator().into(),
        ];

        for (key, value) in self.config.options() {
            args.push(format!("-D{}={}", key, value).into());
        }

        args
    }

    pub fn build_args(&self, target: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--build".into(),
            self.config.build_dir().into(),
            "--target".into(),
            target.into(),
            "--config".into(),
            self.config.build_type().as_str().into(),
            "--parallel".into(),
            self.config.parallel_jobs().to_string().into(),
        ];

        // full compiler command lines, passed through to ninja as well
        if self.config.verbosity() >= Verbosity::Verbose {
            args.push("--verbose".into());
            args.push("--".into());
            args.push("-v".into());
        }

        args
    }

    /** Configures the build directory
     *
     * # Behavior
     * - `clean` removes the build directory first
     * - an existing configuration marker short-circuits with
     *   [`ConfigureOutcome::AlreadyConfigured`]
     * - a build directory without the marker is a leftover from an
     *   interrupted configure and is removed
     *
     * # Errors
     * - `ReleaseError::Configuration` with the captured output when the
     *   configure command exits non-zero
     */
    pub async fn configure(&self, clean: bool) -> Result<ConfigureOutcome> {
        let build_dir = self.config.build_dir();

        if clean && build_dir.exists() {
            println!("[CMake] Removing build directory: {}", build_dir.display());
            log::info!("Clean requested, removing {}", build_dir.display());
            fs::remove_dir_all(build_dir).await?;
        }

        if self.config.configure_marker().exists() {
            println!(
                "[CMake] Build directory already configured: {}",
                build_dir.display()
            );
            println!("[CMake] Skipping configuration (use --clean to reconfigure)");
            log::info!("Configuration marker present, skipping configure");
            return Ok(ConfigureOutcome::AlreadyConfigured);
        }

        if build_dir.exists() {
            println!(
                "[CMake] Cleaning incomplete build directory: {}",
                build_dir.display()
            );
            fs::remove_dir_all(build_dir).await?;
        }
        fs::create_dir_all(build_dir).await?;

        let args = self.configure_args();
        let command_line = display_command(self.config.program(), &args);
        println!("[CMake] Configuration command:");
        println!("  {}", command_line);
        log::info!("Configuring: {}", command_line);

        let output = self
            .process
            .run_captured(self.config.program(), &args, build_dir)
            .await?;

        if self.config.verbosity() >= Verbosity::Verbose {
            print!("{}", output.diagnostics());
        }

        if !output.success {
            log::error!(
                "Configuration failed with exit code {}: {}",
                output.exit_code,
                output.stderr
            );
            return Err(ReleaseError::Configuration {
                exit_code: output.exit_code,
                diagnostics: output.diagnostics(),
            });
        }

        if let Some(warnings) = configure_warnings(&output) {
            log::warn!("Configure reported:\n{}", warnings);
        }

        println!("[CMake] Configuration completed successfully");
        Ok(ConfigureOutcome::Configured)
    }

    /// Builds every target in order, reporting elapsed time whether or not it succeeds.
    pub async fn build(&self) -> Result<BuildSummary> {
        let start = Instant::now();
        let mut diagnostics = 0;

        let result = self.build_targets(&mut diagnostics).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => self.print_summary(elapsed),
            Err(e) => {
                println!("  Build Time:     {}", format_elapsed(elapsed));
                log::error!("Build failed after {}: {}", format_elapsed(elapsed), e);
            }
        }

        result.map(|()| BuildSummary {
            targets: self.config.targets().to_vec(),
            elapsed,
            diagnostics,
        })
    }

    async fn build_targets(&self, diagnostics: &mut usize) -> Result<()> {
        for target in self.config.targets() {
            *diagnostics += self.build_target(target).await?;
        }
        Ok(())
    }

    async fn build_target(&self, target: &SmolStr) -> Result<usize> {
        println!("\n[Ninja] Building target: {}", target);
        println!("{}", "-".repeat(80));
        log::info!("Building target {}", target);

        let args = self.build_args(target);
        let mut display = ProgressDisplay::new(self.config.verbosity());

        let status = self
            .process
            .run_streaming(self.config.program(), &args, self.config.build_dir(), |line| {
                display.handle_line(line)
            })
            .await;
        display.finish();
        let status = status?;

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            println!(
                "\n[Ninja] Build failed for {} with exit code {}",
                target, exit_code
            );
            return Err(ReleaseError::TargetBuild {
                target: target.clone(),
                exit_code,
            });
        }

        println!("[Ninja] Successfully built {}", target);
        Ok(display.diagnostics())
    }

    fn print_summary(&self, elapsed: Duration) {
        let targets: Vec<&str> = self.config.targets().iter().map(|t| t.as_str()).collect();

        println!("\n{}", "=".repeat(80));
        println!("Build Summary");
        println!("{}", "=".repeat(80));
        println!("  Build Type:     {}", self.config.build_type());
        println!("  Generator:      {}", self.config.generator());
        println!("  Parallel Jobs:  {}", self.config.parallel_jobs());
        println!("  Targets Built:  {}", targets.join(", "));
        println!("  Build Time:     {}", format_elapsed(elapsed));
        println!("{}", "=".repeat(80));

        log::info!(
            "Built {} in {}",
            targets.join(", "),
            format_elapsed(elapsed)
        );
    }
}

/// Text a successful configure wrote to stderr, such as `CMake Warning` blocks.
pub fn configure_warnings(output: &CapturedOutput) -> Option<&str> {
    let stderr = output.stderr.trim();
    (!stderr.is_empty()).then_some(stderr)
}

/// Formats a duration as whole minutes and seconds, e.g. `3m 07s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {:02}s", secs / 60, secs % 60)
}
