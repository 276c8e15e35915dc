//! Build planner: expands a launch into one [`BuildSpec`] per test case.

use crate::config::ContainerTemplate;
use crate::model::{BuildSpec, Launch, RequestId, StandaloneTestCase};
use crate::tool::ToolRegistry;

/// Expands `launch` into `{test-case-id -> BuildSpec}` using `template` and whatever
/// adapter `tool_registry` has registered for `launch.launch_type`.
///
/// Returns an empty vector if the type has no registered adapter. Ingress is
/// expected to have already rejected unsupported types with a 400, so reaching
/// this branch here indicates a protocol bug upstream, not a normal path.
pub fn plan(
    tool_registry: &ToolRegistry,
    template: &ContainerTemplate,
    request_id: RequestId,
    launch: &Launch,
) -> Vec<BuildSpec> {
    let Some(adapter) = tool_registry.get(&launch.launch_type) else {
        tracing::error!(
            launch_type = %launch.launch_type,
            "build planner invoked for a launch type with no registered tool adapter"
        );
        return Vec::new();
    };

    launch
        .test_cases
        .iter()
        .map(|test_case| {
            let command = adapter.command_line(template, test_case, &launch.properties);
            BuildSpec {
                request_id,
                launch_id: launch.id.clone(),
                case_id: test_case.id.clone(),
                image: template.image.clone(),
                command,
                tmpfs: template.tmpfs.clone(),
                data_dir: template.data_dir.clone(),
                file_templates: template.file_templates.clone(),
                extra_volumes: template
                    .extra_volumes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                build_data: StandaloneTestCase {
                    test_case: test_case.clone(),
                    properties: launch.properties.clone(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, Property, TestCase};

    fn template() -> ContainerTemplate {
        ContainerTemplate {
            image: "maven:3.9".into(),
            data_dir: "/work".into(),
            tmpfs: vec!["/tmp".into()],
            file_templates: Default::default(),
            extra_volumes: Default::default(),
        }
    }

    fn launch() -> Launch {
        Launch {
            id: "L1".into(),
            launch_type: "maven".into(),
            test_cases: vec![
                TestCase {
                    id: "T1".into(),
                    name: "pkg.S#a".into(),
                    artifact: Artifact {
                        group_id: "g".into(),
                        id: "a".into(),
                        version: "1.0".into(),
                    },
                    tags: vec![],
                },
                TestCase {
                    id: "T2".into(),
                    name: "pkg.S#b".into(),
                    artifact: Artifact {
                        group_id: "g".into(),
                        id: "a".into(),
                        version: "1.0".into(),
                    },
                    tags: vec![],
                },
            ],
            properties: vec![Property {
                key: "k".into(),
                value: "v".into(),
            }],
        }
    }

    #[test]
    fn plans_one_build_spec_per_test_case() {
        let registry = ToolRegistry::default();
        let specs = plan(&registry, &template(), 1, &launch());

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].case_id, "T1");
        assert_eq!(specs[1].case_id, "T2");
        assert_eq!(specs[0].image, "maven:3.9");
        assert!(specs[0].command.contains(&"-Dtest=pkg.S#a".to_string()));
    }

    #[test]
    fn unsupported_type_plans_nothing() {
        let registry = ToolRegistry::default();
        let mut unsupported = launch();
        unsupported.launch_type = "bazel".into();

        let specs = plan(&registry, &template(), 1, &unsupported);
        assert!(specs.is_empty());
    }
}
