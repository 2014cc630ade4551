//! Classification of build tool output into a compact progress display.
//!
//! Ninja and the compilers it drives are noisy. Every line passes through
//! [`classify`] and [`render`]: diagnostics are always shown verbatim,
//! progress collapses into a single updating line, and anything else is
//! only echoed at the highest verbosity.

use crate::build::Verbosity;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Compiling,
    Linking,
    Generating,
    Diagnostic,
    Other,
}

impl EventKind {
    fn verb(&self) -> &'static str {
        match self {
            EventKind::Compiling => "Compiling",
            EventKind::Linking => "Linking",
            EventKind::Generating => "Generating",
            EventKind::Diagnostic => "Diagnostic",
            EventKind::Other => "",
        }
    }
}

/// One parsed line of build tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProgressEvent {
    pub progress: Option<(u64, u64)>,
    pub kind: EventKind,
    pub payload: String,
}

impl BuildProgressEvent {
    pub fn percent(&self) -> Option<u64> {
        self.progress
            .map(|(current, total)| progress_percent(current, total))
    }
}

/// `floor(100 * current / total)`, or 0 when the total is unknown.
pub fn progress_percent(current: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    current.saturating_mul(100) / total
}

struct ActionPattern {
    kind: EventKind,
    regex: Regex,
    strip_object_suffix: bool,
}

static PROGRESS_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*(\d+)\s*/\s*(\d+)\s*\]\s*(.*)$").expect("valid regex"));

// Makefile generators print `[ 42%]` instead of a step count.
static PERCENT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*\d+%\]\s*").expect("valid regex"));

// Checked in order, first match wins.
static ACTION_PATTERNS: Lazy<Vec<ActionPattern>> = Lazy::new(|| {
    vec![
        ActionPattern {
            kind: EventKind::Compiling,
            regex: Regex::new(r"^Building \w+ object (\S+)").expect("valid regex"),
            strip_object_suffix: true,
        },
        ActionPattern {
            kind: EventKind::Linking,
            regex: Regex::new(r"^Linking\b.*?(\S+)$").expect("valid regex"),
            strip_object_suffix: false,
        },
        ActionPattern {
            kind: EventKind::Generating,
            regex: Regex::new(r"^Generating\b.*?(\S+)$").expect("valid regex"),
            strip_object_suffix: false,
        },
    ]
});

const DIAGNOSTIC_KEYWORDS: [&str; 3] = ["error", "warning", "failed"];

/** Parses one line of build output
 *
 * Checks, in order:
 * 1. a leading `[current/total]` step counter
 * 2. a `Building X object`, `Linking` or `Generating` phrase, reduced to
 *    the bare artifact file name
 * 3. the words error, warning or failed in any case
 *
 * Lines matching none of these are [`EventKind::Other`].
 */
pub fn classify(line: &str) -> BuildProgressEvent {
    let line = line.trim_end();

    let (progress, rest) = match PROGRESS_PREFIX.captures(line) {
        Some(caps) => {
            let current = caps[1].parse().unwrap_or(0);
            let total = caps[2].parse().unwrap_or(0);
            let rest = caps.get(3).map_or("", |m| m.as_str());
            (Some((current, total)), rest)
        }
        None => (None, PERCENT_PREFIX.find(line).map_or(line, |m| &line[m.end()..])),
    };

    for pattern in ACTION_PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(rest) {
            let mut artifact = bare_file_name(&caps[1]);
            if pattern.strip_object_suffix {
                artifact = strip_object_suffix(artifact);
            }
            return BuildProgressEvent {
                progress,
                kind: pattern.kind,
                payload: artifact.to_string(),
            };
        }
    }

    if is_diagnostic(line) {
        return BuildProgressEvent {
            progress,
            kind: EventKind::Diagnostic,
            payload: line.to_string(),
        };
    }

    BuildProgressEvent {
        progress,
        kind: EventKind::Other,
        payload: rest.to_string(),
    }
}

fn is_diagnostic(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    DIAGNOSTIC_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

fn bare_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn strip_object_suffix(name: &str) -> &str {
    name.strip_suffix(".obj")
        .or_else(|| name.strip_suffix(".o"))
        .unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub position: Option<(u64, u64)>,
    pub label: Option<String>,
}

/// What the display should do with one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendering {
    pub echo: Option<String>,
    pub update: Option<ProgressUpdate>,
}

impl Rendering {
    pub fn is_silent(&self) -> bool {
        self.echo.is_none() && self.update.is_none()
    }
}

pub fn render(line: &str, event: &BuildProgressEvent, verbosity: Verbosity) -> Rendering {
    if verbosity == Verbosity::Verbose {
        return Rendering {
            echo: Some(line.trim_end().to_string()),
            update: None,
        };
    }

    match event.kind {
        EventKind::Diagnostic => Rendering {
            echo: Some(event.payload.clone()),
            update: event.progress.map(|position| ProgressUpdate {
                position: Some(position),
                label: None,
            }),
        },
        EventKind::Compiling | EventKind::Linking | EventKind::Generating => {
            let label = (verbosity == Verbosity::Normal)
                .then(|| format!("{} {}", event.kind.verb(), event.payload));
            Rendering {
                echo: None,
                update: Some(ProgressUpdate {
                    position: event.progress,
                    label,
                }),
            }
        }
        EventKind::Other => Rendering {
            echo: None,
            update: event.progress.map(|position| ProgressUpdate {
                position: Some(position),
                label: None,
            }),
        },
    }
}

/** Single updating progress line for one target
 *
 * Falls back to plain stdout for echoed lines when the bar is hidden
 * (output redirected), so diagnostics reach CI logs.
 */
pub struct ProgressDisplay {
    bar: ProgressBar,
    verbosity: Verbosity,
    diagnostics: usize,
}

impl ProgressDisplay {
    pub fn new(verbosity: Verbosity) -> Self {
        let bar = if verbosity == Verbosity::Verbose {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::with_template("  [{pos}/{len}] {prefix} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            bar,
            verbosity,
            diagnostics: 0,
        }
    }

    pub fn handle_line(&mut self, line: &str) {
        let event = classify(line);
        let rendering = render(line, &event, self.verbosity);

        if event.kind == EventKind::Diagnostic {
            self.diagnostics += 1;
            log::warn!("{}", event.payload);
        }

        if let Some(text) = rendering.echo {
            self.echo(&text);
        }

        if let Some(update) = rendering.update {
            if let Some((current, total)) = update.position {
                self.bar.set_length(total);
                self.bar.set_position(current);
                self.bar
                    .set_prefix(format!("{:>3}%", progress_percent(current, total)));
            }
            if let Some(label) = update.label {
                self.bar.set_message(label);
            }
        }
    }

    pub fn diagnostics(&self) -> usize {
        self.diagnostics
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn echo(&self, text: &str) {
        if self.bar.is_hidden() {
            println!("  {}", text);
        } else {
            self.bar.println(format!("  {}", text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_floor_and_zero_total() {
        assert_eq!(progress_percent(3, 10), 30);
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(10, 10), 100);
        assert_eq!(progress_percent(2, 3), 66);
    }

    #[test]
    fn ninja_compile_line() {
        let event =
            classify("[28/669] Building CXX object Gravix/CMakeFiles/Gravix.dir/Source/Core/Application.cpp.obj");
        assert_eq!(event.progress, Some((28, 669)));
        assert_eq!(event.kind, EventKind::Compiling);
        assert_eq!(event.payload, "Application.cpp");
        assert_eq!(event.percent(), Some(4));
    }

    #[test]
    fn windows_separators_stripped() {
        let event = classify(r"[1/2] Building C object ThirdParties\glfw\src\window.c.o");
        assert_eq!(event.payload, "window.c");
    }

    #[test]
    fn link_and_generate_lines() {
        let link = classify("[669/669] Linking CXX executable bin/Orbit.exe");
        assert_eq!(link.kind, EventKind::Linking);
        assert_eq!(link.payload, "Orbit.exe");

        let generate = classify("Generating Gravix-ScriptCore/Gravix-ScriptCore.dll");
        assert_eq!(generate.kind, EventKind::Generating);
        assert_eq!(generate.progress, None);
        assert_eq!(generate.payload, "Gravix-ScriptCore.dll");
    }

    #[test]
    fn makefile_percent_prefix() {
        let event = classify("[ 42%] Building CXX object src/CMakeFiles/core.dir/main.cpp.o");
        assert_eq!(event.kind, EventKind::Compiling);
        assert_eq!(event.progress, None);
        assert_eq!(event.payload, "main.cpp");
    }

    #[test]
    fn action_takes_priority_over_keywords() {
        let event = classify("[3/9] Building CXX object src/ErrorReporter.cpp.o");
        assert_eq!(event.kind, EventKind::Compiling);
    }

    #[test]
    fn diagnostics_any_case() {
        for line in [
            "Source/Renderer.cpp(42): error C2065: 'x': undeclared identifier",
            "main.cpp:3:5: WARNING: unused variable",
            "FAILED: bin/Orbit.exe",
        ] {
            let event = classify(line);
            assert_eq!(event.kind, EventKind::Diagnostic, "{}", line);
            assert_eq!(event.payload, line);
        }
    }

    #[test]
    fn diagnostics_echoed_at_every_verbosity() {
        let line = "ld: warning: duplicate symbol";
        let event = classify(line);
        for verbosity in [Verbosity::Quiet, Verbosity::Normal, Verbosity::Verbose] {
            assert_eq!(render(line, &event, verbosity).echo.as_deref(), Some(line));
        }
    }

    #[test]
    fn unmatched_lines_only_echoed_when_verbose() {
        for line in [
            "ninja: Entering directory `build/OrbitRelease'",
            "-- Configuring done",
            "cl.exe /nologo /TP -DGRAVIX_USE_VULKAN /O2 /c Source/App.cpp",
        ] {
            let event = classify(line);
            assert_eq!(event.kind, EventKind::Other);
            assert!(render(line, &event, Verbosity::Quiet).is_silent());
            assert!(render(line, &event, Verbosity::Normal).is_silent());
            assert_eq!(
                render(line, &event, Verbosity::Verbose).echo.as_deref(),
                Some(line)
            );
        }
    }

    #[test]
    fn compile_lines_update_without_echo() {
        let line = "[5/10] Building CXX object CMakeFiles/Orbit.dir/Source/App.cpp.o";
        let event = classify(line);

        let normal = render(line, &event, Verbosity::Normal);
        assert!(normal.echo.is_none());
        assert_eq!(
            normal.update,
            Some(ProgressUpdate {
                position: Some((5, 10)),
                label: Some("Compiling App.cpp".to_string()),
            })
        );

        let quiet = render(line, &event, Verbosity::Quiet);
        assert_eq!(quiet.update.and_then(|u| u.label), None);
    }

    #[test]
    fn display_counts_diagnostics() {
        let mut display = ProgressDisplay::new(Verbosity::Quiet);
        display.handle_line("[1/2] Building CXX object a.cpp.o");
        display.handle_line("a.cpp:1:1: error: expected ';'");
        display.handle_line("FAILED: a.cpp.o");
        display.finish();
        assert_eq!(display.diagnostics(), 2);
    }
}
