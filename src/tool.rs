//! Tool registry: maps a launch's `type` to the adapter that renders one test case
//! into a runnable command line.
//!
//! New adapters are added by registration at process init in [`ToolRegistry::default`].
//! Ingress consults [`ToolRegistry::is_supported`] to reject unknown types with a 400
//! before a launch ever reaches the supervisor.

pub mod maven;

use std::collections::HashMap;

use crate::config::ContainerTemplate;
use crate::model::{Property, TestCase};

/// Renders one test case into the argv the in-container runner will exec.
pub trait ToolAdapter: Send + Sync {
    fn command_line(
        &self,
        template: &ContainerTemplate,
        test_case: &TestCase,
        properties: &[Property],
    ) -> Vec<String>;
}

/// Static `launch-type -> tool adapter` map, built once at startup.
pub struct ToolRegistry {
    adapters: HashMap<String, Box<dyn ToolAdapter>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, launch_type: impl Into<String>, adapter: Box<dyn ToolAdapter>) {
        self.adapters.insert(launch_type.into(), adapter);
    }

    pub fn get(&self, launch_type: &str) -> Option<&dyn ToolAdapter> {
        self.adapters.get(launch_type).map(|b| b.as_ref())
    }

    pub fn is_supported(&self, launch_type: &str) -> bool {
        self.adapters.contains_key(launch_type)
    }
}

impl Default for ToolRegistry {
    /// The bundled registry: `maven` only. Additional adapters can be registered
    /// before the engine is constructed.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("maven", Box::new(maven::MavenTool));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_type_is_unsupported() {
        let registry = ToolRegistry::default();
        assert!(registry.is_supported("maven"));
        assert!(!registry.is_supported("bazel"));
        assert!(registry.get("bazel").is_none());
    }
}
