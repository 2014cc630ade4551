/// orbit-release - release builds for the Orbit editor
///
/// Drives CMake through configuration and per-target builds, collects the
/// shared libraries the editor needs at runtime, assembles a package
/// directory and zips it.
///
/// Main modules:
/// - build: build configuration, build tool driver and output classification
/// - cli: command-line interface parsing
/// - commands: configuration assembly and release command output
/// - deps: shared-library discovery, filtering, copy and manifest
/// - package: package directory assembly and zip archiving
/// - release: phase sequencing of one release run
/// - result: error handling and result types
/// - utils: process execution and filesystem helpers
pub mod build;
pub mod cli;
pub mod commands;
pub mod deps;
pub mod package;
pub mod release;
pub mod result;
pub mod utils;
