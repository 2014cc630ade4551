use crate::deps::DependencyConfig;
use crate::result::{ReleaseError, Result};
use crate::utils::process::ProcessManager;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const INSPECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Output format of a supported dependency inspection tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFlavor {
    /// `dumpbin /dependents` from the MSVC toolchain.
    Dumpbin,
    /// `objdump -p`, for both ELF and PE images.
    Objdump,
    /// `otool -L` on macOS.
    Otool,
}

impl ToolFlavor {
    /// Recognizes prefixed variants such as `llvm-objdump` or `x86_64-w64-mingw32-objdump`.
    pub fn from_program(program: &str) -> Option<Self> {
        let stem = Path::new(program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())?;

        if stem.ends_with("dumpbin") {
            Some(ToolFlavor::Dumpbin)
        } else if stem.ends_with("objdump") {
            Some(ToolFlavor::Objdump)
        } else if stem.ends_with("otool") {
            Some(ToolFlavor::Otool)
        } else {
            None
        }
    }

    fn args(&self, executable: &Path) -> Vec<OsString> {
        let flag = match self {
            ToolFlavor::Dumpbin => "/dependents",
            ToolFlavor::Objdump => "-p",
            ToolFlavor::Otool => "-L",
        };
        vec![flag.into(), executable.into()]
    }

    pub fn parse(&self, output: &str) -> Vec<String> {
        match self {
            ToolFlavor::Dumpbin => parse_dumpbin(output),
            ToolFlavor::Objdump => parse_objdump(output),
            ToolFlavor::Otool => parse_otool(output),
        }
    }
}

fn platform_candidates() -> &'static [&'static str] {
    if cfg!(windows) {
        &["dumpbin", "objdump"]
    } else if cfg!(target_os = "macos") {
        &["otool"]
    } else {
        &["objdump"]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionTool {
    pub program: PathBuf,
    pub flavor: ToolFlavor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAvailability {
    Available(InspectionTool),
    Unavailable,
}

impl ToolAvailability {
    /// Finds the configured inspection tool, or the first platform default on `PATH`.
    pub fn detect(config: &DependencyConfig) -> Self {
        let candidates: Vec<&str> = match &config.inspector {
            Some(program) => vec![program.as_str()],
            None => platform_candidates().to_vec(),
        };

        let process = ProcessManager::new();
        for candidate in candidates {
            let Some(flavor) = ToolFlavor::from_program(candidate) else {
                log::warn!("Unsupported dependency inspection tool: {}", candidate);
                continue;
            };
            if let Ok(program) = process.find_executable(candidate) {
                log::info!("Using {} for dependency inspection", program.display());
                return ToolAvailability::Available(InspectionTool { program, flavor });
            }
        }

        ToolAvailability::Unavailable
    }
}

impl InspectionTool {
    /// Library names the executable imports, as reported by the tool.
    pub async fn imported_libraries(&self, executable: &Path) -> Result<Vec<String>> {
        let cwd = executable.parent().unwrap_or_else(|| Path::new("."));
        let args = self.flavor.args(executable);
        let process = ProcessManager::new();
        let run = process.run_captured(&self.program, &args, cwd);

        let output = tokio::time::timeout(INSPECTION_TIMEOUT, run)
            .await
            .map_err(|_| {
                ReleaseError::process(format!(
                    "{} timed out after {} seconds",
                    self.program.display(),
                    INSPECTION_TIMEOUT.as_secs()
                ))
            })??;

        if !output.success {
            return Err(ReleaseError::process(format!(
                "{} exited with code {}: {}",
                self.program.display(),
                output.exit_code,
                output.stderr.trim()
            )));
        }

        Ok(self.flavor.parse(&output.stdout))
    }
}

pub fn parse_dumpbin(output: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_dependencies = false;

    for line in output.lines().map(str::trim) {
        if line.starts_with("Image has the following") && line.contains("dependencies") {
            in_dependencies = true;
            continue;
        }
        if line.starts_with("Summary") {
            break;
        }
        if in_dependencies && line.to_ascii_lowercase().ends_with(".dll") {
            names.push(line.to_string());
        }
    }

    names
}

pub fn parse_objdump(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("DLL Name:")
                .or_else(|| line.strip_prefix("NEEDED"))
                .map(|name| name.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn parse_otool(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let path = line.trim().split(" (").next()?;
            Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .collect()
}
