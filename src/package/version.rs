use crate::result::Result;
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;

pub const DEFAULT_VERSION: &str = "1.0.0";

/// First line of the version marker, or [`DEFAULT_VERSION`] when it is absent or blank.
pub async fn read_version(path: &Path) -> Result<String> {
    if !path.exists() {
        println!("[WARNING] VERSION file not found, using default version");
        log::warn!("{} not found, using version {}", path.display(), DEFAULT_VERSION);
        return Ok(DEFAULT_VERSION.to_string());
    }

    let content = fs::read_to_string(path).await?;
    let version = content.lines().next().unwrap_or("").trim();

    if version.is_empty() {
        log::warn!("{} is empty, using version {}", path.display(), DEFAULT_VERSION);
        return Ok(DEFAULT_VERSION.to_string());
    }

    Ok(version.to_string())
}

/// `<product>_v<version>_<YYYYmmdd_HHMMSS>`
pub fn package_name(product: &str, version: &str, timestamp: &DateTime<Local>) -> String {
    format!(
        "{}_v{}_{}",
        product,
        version,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}
