use clap::Parser;
use dirs::config_dir;
use env_logger::Builder;
use log::LevelFilter;
use orbit_release::cli::Cli;
use std::fs::OpenOptions;

/** Entry point of the release tool
 *
 * # Process Flow
 * 1. Initialize file logging
 * 2. Parse command line arguments
 * 3. Run the release and exit with its code (0 success, 1 failure)
 *
 * # Example
 * ```bash
 * orbit-release --clean --jobs 12
 * orbit-release --skip-configure --skip-build --verbosity 0
 * ```
 */
#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(e.exit_code());
        }
    };

    let code = match cli.execute().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            log::error!("{}", e);
            1
        }
    };

    log::info!("orbit-release finished with exit code {}", code);
    std::process::exit(code);
}

/** Logs to `orbit-release.log` in the platform config directory
 *
 * - Linux: `~/.config/orbit-release/orbit-release.log`
 * - macOS: `~/Library/Application Support/orbit-release/orbit-release.log`
 * - Windows: `%APPDATA%\orbit-release\orbit-release.log`
 *
 * Level defaults to Info; `RUST_LOG` overrides it. When the file cannot be
 * opened the tool runs without a log file.
 */
fn init_logging() {
    let log_file = get_log_file_path();

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let file = match OpenOptions::new().create(true).append(true).open(&log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("[WARNING] Cannot open log file {}: {}", log_file.display(), e);
            return;
        }
    };

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();

    log::info!("orbit-release started");
}

fn get_log_file_path() -> std::path::PathBuf {
    if let Some(config_dir) = config_dir() {
        config_dir.join("orbit-release").join("orbit-release.log")
    } else {
        std::env::current_dir()
            .map(|p| p.join("orbit-release.log"))
            .unwrap_or_else(|_| "orbit-release.log".into())
    }
}
