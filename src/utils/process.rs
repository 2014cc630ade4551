use crate::result::{ReleaseError, Result};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use which::which;

/// Lines in flight between the output readers and the consumer.
const LINE_BUFFER: usize = 256;

/// Output of a process run to completion with captured streams.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit_code: i32,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// stderr followed by stdout, the way a terminal would have shown them.
    pub fn diagnostics(&self) -> String {
        let mut text = self.stderr.clone();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stdout);
        text
    }
}

/** Launches external tools with an explicit environment
 *
 * Environment variables and working directories are applied to each
 * spawned `Command` only; the tool's own process state is never touched.
 */
#[derive(Debug, Default, Clone)]
pub struct ProcessManager {
    env: IndexMap<SmolStr, String>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(env: &IndexMap<SmolStr, String>) -> Self {
        Self { env: env.clone() }
    }

    pub fn find_executable(&self, name: &str) -> Result<PathBuf> {
        which(name).map_err(|_| ReleaseError::not_found(format!("Executable not found: {}", name)))
    }

    fn command(&self, program: &Path, args: &[OsString], cwd: &Path) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        command.current_dir(cwd);
        command.stdin(Stdio::null());
        command.kill_on_drop(true);
        for (key, value) in &self.env {
            command.env(key.as_str(), value);
        }
        command
    }

    /// Runs `program` to completion, capturing stdout and stderr.
    pub async fn run_captured(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
    ) -> Result<CapturedOutput> {
        let output = self
            .command(program, args, cwd)
            .output()
            .await
            .map_err(|e| {
                ReleaseError::process(format!("Failed to execute {}: {}", program.display(), e))
            })?;

        Ok(CapturedOutput {
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /** Runs `program`, handing each line of its combined output to `on_line`
     *
     * stdout and stderr are read concurrently and merged through a bounded
     * channel, so a line is handled before much more output is read and
     * the full output is never held in memory. Invalid UTF-8 is replaced
     * rather than aborting the read.
     */
    pub async fn run_streaming<F>(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
        mut on_line: F,
    ) -> Result<ExitStatus>
    where
        F: FnMut(&str),
    {
        let mut child = self
            .command(program, args, cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReleaseError::process(format!(
                    "{} {}: {}",
                    ReleaseError::BUILD_TOOL_SPAWN_FAILED,
                    program.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReleaseError::process("Child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReleaseError::process("Child stderr was not captured"))?;

        let (tx, mut rx) = mpsc::channel::<String>(LINE_BUFFER);
        let consume = async {
            while let Some(line) = rx.recv().await {
                on_line(&line);
            }
        };

        let (out, err, ()) = tokio::join!(
            forward_lines(stdout, tx.clone()),
            forward_lines(stderr, tx),
            consume
        );
        out?;
        err?;

        let status = child.wait().await.map_err(|e| {
            ReleaseError::process(format!("Failed to wait for {}: {}", program.display(), e))
        })?;

        Ok(status)
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        if tx
            .send(line.trim_end_matches('\r').to_string())
            .await
            .is_err()
        {
            break;
        }
    }
    Ok(())
}

/// Renders a command line for display.
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh_args(script: &str) -> Vec<OsString> {
        vec!["-c".into(), script.into()]
    }

    #[tokio::test(flavor = "current_thread")]
    async fn streaming_merges_both_streams() {
        let manager = ProcessManager::new();
        let mut lines = Vec::new();
        let status = manager
            .run_streaming(
                Path::new("sh"),
                &sh_args("echo one; echo two 1>&2; printf 'three\\r\\n'"),
                Path::new("."),
                |line| lines.push(line.to_string()),
            )
            .await
            .unwrap();

        assert!(status.success());
        lines.sort();
        assert_eq!(lines, ["one", "three", "two"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn captured_exit_code_and_env() {
        let mut env = IndexMap::new();
        env.insert(SmolStr::new("ORBIT_RELEASE_TEST"), "42".to_string());
        let manager = ProcessManager::with_env(&env);

        let output = manager
            .run_captured(
                Path::new("sh"),
                &sh_args("echo $ORBIT_RELEASE_TEST; echo bad 1>&2; exit 3"),
                Path::new("."),
            )
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "42");
        assert_eq!(output.diagnostics(), "bad\n42\n");
    }

    #[test]
    fn command_line_display() {
        let args: Vec<OsString> = vec!["--build".into(), "/tmp/b".into()];
        assert_eq!(display_command(Path::new("cmake"), &args), "cmake --build /tmp/b");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test(flavor = "current_thread")]
    async fn abandoned_run_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

        let manager = ProcessManager::new();
        let args = sh_args(&script);
        let run = manager.run_captured(Path::new("sh"), &args, Path::new("."));
        assert!(tokio::time::timeout(Duration::from_millis(500), run)
            .await
            .is_err());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let stat = Path::new("/proc").join(pid.trim()).join("stat");
        let mut alive = true;
        for _ in 0..50 {
            alive = std::fs::read_to_string(&stat)
                .map(|s| !s.contains(") Z") && !s.contains(") X"))
                .unwrap_or(false);
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive);
    }
}
