#![cfg(unix)]

use orbit_release::build::{BuildConfig, BuildDriver, ConfigureOutcome};
use orbit_release::deps::{DependencyConfig, ToolAvailability};
use orbit_release::package::PackageWarning;
use orbit_release::release::{ReleaseOptions, ReleaseOrchestrator, ReleaseOutcome, ReleaseState};
use orbit_release::result::ReleaseError;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for cmake: records its arguments, writes the cache on configure
/// and drops a read-only editor binary when the `Orbit` target is built.
const FAKE_CMAKE: &str = r#"#!/bin/sh
echo "$@" >> "$FAKE_CMAKE_LOG"
case "$1" in
  -S)
    if [ -n "$FAKE_CMAKE_CONFIGURE_FAIL" ]; then
      echo "-- The CXX compiler identification is GNU"
      echo "CMake Error at CMakeLists.txt:42: $FAKE_CMAKE_CONFIGURE_FAIL" 1>&2
      exit 1
    fi
    touch "$4/CMakeCache.txt"
    echo "-- Configuring done"
    ;;
  --build)
    target="$4"
    echo "[1/2] Building CXX object src/CMakeFiles/$target.dir/main.cpp.o"
    echo "[2/2] Linking CXX executable bin/$target"
    if [ "$target" = "$FAKE_CMAKE_FAIL" ]; then
      echo "main.cpp:3: error: expected ';'" 1>&2
      exit 2
    fi
    if [ "$target" = "Orbit" ] && [ -n "$FAKE_CMAKE_PRODUCE" ]; then
      mkdir -p "$2/bin"
      echo "editor" > "$2/bin/Orbit"
      chmod 555 "$2/bin/Orbit"
    fi
    ;;
esac
exit 0
"#;

struct Project {
    dir: TempDir,
    log: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-cmake.sh");
        std::fs::write(&script, FAKE_CMAKE).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("CMakeLists.txt"), "project(Gravix)\n").unwrap();

        let log = dir.path().join("invocations.log");
        Self { dir, log }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> BuildConfig {
        BuildConfig::for_project(self.root())
            .unwrap()
            .with_program(self.root().join("fake-cmake.sh"))
            .with_env("FAKE_CMAKE_LOG", self.log.to_string_lossy())
            .with_parallel_jobs(2)
            .unwrap()
    }

    fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn no_system_deps() -> DependencyConfig {
    DependencyConfig {
        search_dirs: vec!["ThirdParties/mono/lib".to_string()],
        ..DependencyConfig::default()
    }
}

#[tokio::test(flavor = "current_thread")]
async fn configure_runs_once_per_build_directory() {
    let project = Project::new();
    let config = project.config();
    let driver = BuildDriver::new(&config);

    assert_eq!(driver.configure(false).await.unwrap(), ConfigureOutcome::Configured);
    assert_eq!(
        driver.configure(false).await.unwrap(),
        ConfigureOutcome::AlreadyConfigured
    );

    let invocations = project.invocations();
    assert_eq!(invocations.len(), 1);

    let args: Vec<&str> = invocations[0].split_whitespace().collect();
    let root = project.root().to_string_lossy().to_string();
    let build_dir = config.build_dir().to_string_lossy().to_string();
    assert_eq!(
        args,
        [
            "-S",
            root.as_str(),
            "-B",
            build_dir.as_str(),
            "-G",
            "Ninja",
            "-DCMAKE_BUILD_TYPE=Release",
            "-DGRAVIX_USE_VULKAN=ON",
            "-DGRAVIX_BUILD_EDITOR=ON",
            "-DGRAVIX_BUILD_SCRIPTING=ON",
        ]
    );

    // clean forces a fresh configure
    assert_eq!(driver.configure(true).await.unwrap(), ConfigureOutcome::Configured);
    assert_eq!(project.invocations().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn configure_replaces_incomplete_build_directory() {
    let project = Project::new();
    let config = project.config();
    std::fs::create_dir_all(config.build_dir()).unwrap();
    std::fs::write(config.build_dir().join("stale.ninja"), "").unwrap();

    let driver = BuildDriver::new(&config);
    assert_eq!(driver.configure(false).await.unwrap(), ConfigureOutcome::Configured);
    assert!(!config.build_dir().join("stale.ninja").exists());
    assert!(config.configure_marker().exists());
}

#[tokio::test(flavor = "current_thread")]
async fn build_stops_at_first_failing_target() {
    let project = Project::new();
    let config = project.config().with_env("FAKE_CMAKE_FAIL", "Gravix");
    let driver = BuildDriver::new(&config);
    driver.configure(false).await.unwrap();

    let err = driver.build().await.unwrap_err();
    match err {
        ReleaseError::TargetBuild { target, exit_code } => {
            assert_eq!(target, "Gravix");
            assert_eq!(exit_code, 2);
        }
        other => panic!("unexpected error: {}", other),
    }

    let builds: Vec<String> = project
        .invocations()
        .into_iter()
        .filter(|line| line.starts_with("--build"))
        .collect();
    assert_eq!(builds.len(), 2);
    assert!(builds[0].contains("--target Gravix-ScriptCore "));
    assert!(builds[1].contains("--target Gravix "));
    assert!(builds[1].contains("--config Release --parallel 2"));
}

#[tokio::test(flavor = "current_thread")]
async fn missing_executable_fails_packaging_without_archive() {
    let project = Project::new();
    let config = project.config();
    let deps = no_system_deps();

    let mut orchestrator = ReleaseOrchestrator::new(&config, &deps, ReleaseOptions::default())
        .with_tool_availability(ToolAvailability::Unavailable);
    let outcome = orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 1);
    match &outcome {
        ReleaseOutcome::Failed { phase, error } => {
            assert_eq!(*phase, ReleaseState::Packaging);
            assert!(matches!(error, ReleaseError::MissingExecutable(_)));
        }
        ReleaseOutcome::Completed(_) => panic!("release should not complete"),
    }
    assert_eq!(orchestrator.state(), ReleaseState::Failed);

    let archives = std::fs::read_dir(config.output_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "zip"))
                .count()
        })
        .unwrap_or(0);
    assert_eq!(archives, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn release_produces_package_and_archive() {
    let project = Project::new();
    let root = project.root();
    std::fs::write(root.join("VERSION"), "0.7.1\n").unwrap();
    std::fs::create_dir_all(root.join("Assets/Shaders")).unwrap();
    std::fs::write(root.join("Assets/Shaders/grid.glsl"), "void main() {}").unwrap();
    std::fs::create_dir_all(root.join("ThirdParties/mono/lib")).unwrap();
    let mono = root.join("ThirdParties/mono/lib/libmonosgen-2.0.so.1");
    std::fs::write(&mono, "mono").unwrap();
    std::fs::set_permissions(&mono, std::fs::Permissions::from_mode(0o444)).unwrap();

    let config = project
        .config()
        .with_env("FAKE_CMAKE_PRODUCE", "1")
        .with_ui_config(None);
    let deps = no_system_deps();

    let mut orchestrator = ReleaseOrchestrator::new(&config, &deps, ReleaseOptions::default())
        .with_tool_availability(ToolAvailability::Unavailable);
    let outcome = orchestrator.run().await;
    assert_eq!(outcome.exit_code(), 0);

    let report = match outcome {
        ReleaseOutcome::Completed(report) => report,
        ReleaseOutcome::Failed { phase, error } => panic!("failed during {}: {}", phase, error),
    };

    let package = &report.package.package;
    assert!(package.name.starts_with("Orbit_v0.7.1_"));
    assert!(package.dir.join("Orbit").is_file());
    assert_eq!(
        std::fs::metadata(package.dir.join("Orbit")).unwrap().permissions().mode() & 0o777,
        0o555
    );
    assert!(report.package.warnings.iter().all(|w| !matches!(w, PackageWarning::CopyFailed(_))));
    assert!(package.dir.join("libmonosgen-2.0.so.1").is_file());
    assert!(package.dir.join("Assets/Shaders/grid.glsl").is_file());

    let manifest = std::fs::read_to_string(package.dir.join("dependency_manifest.txt")).unwrap();
    assert!(manifest.starts_with("libmonosgen-2.0.so.1 <- "));

    assert_eq!(report.archive.path, config.output_dir().join(format!("{}.zip", package.name)));
    assert!(report.archive.path.is_file());
    assert_eq!(report.archive.entries, 5);

    let build = report.build.as_ref().unwrap();
    assert_eq!(build.targets, config.targets());
    assert_eq!(build.diagnostics, 0);

    assert_eq!(
        orchestrator.history().last().copied(),
        Some(ReleaseState::Done)
    );
}

#[tokio::test(flavor = "current_thread")]
async fn failed_configure_stops_before_build() {
    let project = Project::new();
    let config = project
        .config()
        .with_env("FAKE_CMAKE_CONFIGURE_FAIL", "Could not find Vulkan");
    let deps = no_system_deps();

    let mut orchestrator = ReleaseOrchestrator::new(&config, &deps, ReleaseOptions::default())
        .with_tool_availability(ToolAvailability::Unavailable);
    let outcome = orchestrator.run().await;
    assert_eq!(outcome.exit_code(), 1);

    match &outcome {
        ReleaseOutcome::Failed {
            phase,
            error: error @ ReleaseError::Configuration { exit_code, diagnostics },
        } => {
            assert_eq!(*phase, ReleaseState::Configuring);
            assert_eq!(*exit_code, 1);
            assert!(diagnostics.contains("Could not find Vulkan"));
            assert!(diagnostics.contains("The CXX compiler identification"));
            assert!(error.diagnostics().is_some());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(
        orchestrator.history(),
        &[ReleaseState::Idle, ReleaseState::Configuring, ReleaseState::Failed]
    );
    let invocations = project.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations.iter().all(|line| !line.starts_with("--build")));
    assert!(!config.configure_marker().exists());
}

#[tokio::test(flavor = "current_thread")]
async fn failed_target_stops_release_at_building() {
    let project = Project::new();
    let config = project
        .config()
        .with_env("FAKE_CMAKE_FAIL", "Gravix")
        .with_env("FAKE_CMAKE_PRODUCE", "1");
    let deps = no_system_deps();

    let mut orchestrator = ReleaseOrchestrator::new(&config, &deps, ReleaseOptions::default())
        .with_tool_availability(ToolAvailability::Unavailable);
    let outcome = orchestrator.run().await;
    assert_eq!(outcome.exit_code(), 1);

    match &outcome {
        ReleaseOutcome::Failed {
            phase,
            error: ReleaseError::TargetBuild { target, exit_code },
        } => {
            assert_eq!(*phase, ReleaseState::Building);
            assert_eq!(target, "Gravix");
            assert_eq!(*exit_code, 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(!orchestrator
        .history()
        .contains(&ReleaseState::CollectingDependencies));
    assert_eq!(orchestrator.state(), ReleaseState::Failed);
    assert!(!config.output_dir().exists());
    assert!(project
        .invocations()
        .iter()
        .all(|line| !line.contains("--target Orbit ")));
}
