//! The bundled Maven tool adapter.

use crate::config::ContainerTemplate;
use crate::model::{Property, TestCase};
use crate::tool::ToolAdapter;

/// Produces `mvn -f <data-dir>/pom.xml -Dmaven.repo.local=/root/.m2 -Dtest=<name>
/// -D<k>=<v>... verify` for a single test case.
pub struct MavenTool;

impl ToolAdapter for MavenTool {
    fn command_line(
        &self,
        template: &ContainerTemplate,
        test_case: &TestCase,
        properties: &[Property],
    ) -> Vec<String> {
        let mut cmd = vec![
            "mvn".to_string(),
            "-f".to_string(),
            format!("{}/pom.xml", template.data_dir),
            "-Dmaven.repo.local=/root/.m2".to_string(),
            format!("-Dtest={}", test_case.name),
        ];
        for prop in properties {
            cmd.push(format!("-D{}={}", prop.key, prop.value));
        }
        cmd.push("verify".to_string());
        cmd
    }
}
