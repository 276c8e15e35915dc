//! JSON schema for the two configuration documents this process loads at startup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `type -> container template`, as loaded from the `-conf` JSON file.
pub type ContainerConfig = HashMap<String, ContainerTemplate>;

/// The per-launch-type container recipe: image, mount layout, and file templates.
///
/// Loaded once at startup and never mutated afterwards (this implementation does
/// not support config reload; see `DESIGN.md`).
///
/// # Example
///
/// ```json
/// {
///   "maven": {
///     "image": "maven:3.9-eclipse-temurin-17",
///     "dataDir": "/work",
///     "tmpfs": ["/tmp"],
///     "fileTemplates": { "templates/settings.xml.tmpl": "settings.xml" },
///     "extraVolumes": { "/host/m2-cache": "/root/.m2" }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerTemplate {
    pub image: String,
    pub data_dir: String,
    #[serde(default)]
    pub tmpfs: Vec<String>,
    #[serde(default)]
    pub file_templates: HashMap<String, String>,
    #[serde(default)]
    pub extra_volumes: HashMap<String, String>,
}

/// Logging configuration handed to each container the runtime driver starts.
///
/// Mirrors Docker's own log-driver configuration shape closely enough that it can
/// be passed straight through to the driver. Missing or invalid config is
/// non-fatal — see [`super::load_log_config`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// Docker log driver name, e.g. `"json-file"`. Empty means "use the daemon default".
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// Process-wide settings derived from CLI flags, threaded through the engine.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub listen: String,
    pub data_dir: String,
    pub timeout: std::time::Duration,
    pub shutdown_timeout: std::time::Duration,
}
