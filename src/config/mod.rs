//! Configuration loading and schema definitions.
//!
//! Two independent JSON documents are loaded at process start: the container
//! template map (fatal on failure) and the runtime driver's log configuration
//! (non-fatal; falls back to defaults on failure, matching the runtime driver's
//! own degraded-mode tolerance for a missing log config).

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Loads the container template map from a JSON file.
///
/// This is a fatal init error: the caller should abort the process if this fails,
/// since there is no sensible default container template.
pub fn load_containers(path: &Path) -> Result<ContainerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read containers config: {}", path.display()))?;
    load_containers_str(&content)
        .with_context(|| format!("failed to parse containers config: {}", path.display()))
}

/// Parses the container template map from a JSON string.
pub fn load_containers_str(content: &str) -> Result<ContainerConfig> {
    let containers: ContainerConfig = serde_json::from_str(content)?;
    Ok(containers)
}

/// Loads the runtime driver's log configuration from a JSON file.
///
/// Unlike [`load_containers`], failure here is logged and swallowed: the caller
/// gets `LogConfig::default()` and the process continues.
pub fn load_log_config(path: &Path) -> LogConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<LogConfig>(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid log config, using defaults");
                LogConfig::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read log config, using defaults");
            LogConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_container_map() {
        let raw = r#"{
            "maven": {
                "image": "maven:3.9-eclipse-temurin-17",
                "dataDir": "/work",
                "tmpfs": ["/tmp"]
            }
        }"#;
        let cfg = load_containers_str(raw).unwrap();
        let tmpl = cfg.get("maven").unwrap();
        assert_eq!(tmpl.image, "maven:3.9-eclipse-temurin-17");
        assert_eq!(tmpl.data_dir, "/work");
    }

    #[test]
    fn missing_log_config_falls_back_to_default() {
        let cfg = load_log_config(Path::new("/nonexistent/does-not-exist.json"));
        assert_eq!(cfg, LogConfig::default());
    }
}
