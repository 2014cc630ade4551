pub mod parser;

use crate::build::BuildType;
use crate::commands::{CommandExecutor, ReleaseArgs};
use crate::result::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orbit-release")]
#[command(about = "Build, collect and package an Orbit editor release")]
#[command(version = "0.1.0")]
#[command(
    help_template = "{before-help}{name} v{version}\n\n{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
pub struct Cli {
    #[arg(long, help = "Reuse the existing build configuration")]
    skip_configure: bool,

    #[arg(long, help = "Package the binaries already in the build directory")]
    skip_build: bool,

    #[arg(long, help = "Remove the build directory before configuring")]
    clean: bool,

    #[arg(long, help = "Build directory (default: <root>/build/OrbitRelease)")]
    build_dir: Option<PathBuf>,

    #[arg(long, help = "Directory receiving the package and archive (default: <root>/dist)")]
    output_dir: Option<PathBuf>,

    #[arg(long, help = "Project root containing CMakeLists.txt")]
    project_root: Option<PathBuf>,

    #[arg(short, long, help = "Parallel build jobs (default: host core count)")]
    jobs: Option<usize>,

    #[arg(long, value_enum, help = "Build configuration")]
    build_type: Option<BuildType>,

    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=2),
        help = "Output detail: 0 quiet, 1 normal, 2 verbose"
    )]
    verbosity: u8,

    #[arg(short, long, help = "Release configuration file (default: <root>/orbit-release.toml)")]
    config: Option<String>,
}

impl Cli {
    /// Runs the release and returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        let config = match self.config {
            Some(path) => Some(parser::CliParser::validate_config_path(&path)?),
            None => None,
        };
        let jobs = self.jobs.map(parser::CliParser::validate_jobs).transpose()?;

        let args = ReleaseArgs {
            skip_configure: self.skip_configure,
            skip_build: self.skip_build,
            clean: self.clean,
            build_dir: self.build_dir,
            output_dir: self.output_dir,
            project_root: self.project_root,
            jobs,
            build_type: self.build_type,
            verbosity: self.verbosity,
            config,
        };

        CommandExecutor::new().release(args).await
    }
}
