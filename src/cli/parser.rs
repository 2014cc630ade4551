use crate::result::{ReleaseError, Result};
use std::path::PathBuf;

pub struct CliParser;

impl CliParser {
    pub fn validate_config_path(path: &str) -> Result<PathBuf> {
        let config_path = PathBuf::from(path);

        if !config_path.exists() {
            return Err(ReleaseError::not_found(format!(
                "Config file not found: {}",
                path
            )));
        }

        if !config_path.is_file() {
            return Err(ReleaseError::config("Config path is not a file"));
        }

        Ok(config_path)
    }

    pub fn validate_jobs(jobs: usize) -> Result<usize> {
        match jobs {
            0 => Err(ReleaseError::config(ReleaseError::INVALID_JOB_COUNT)),
            n => Ok(n),
        }
    }
}
