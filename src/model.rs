//! Core data model: the shapes that flow through ingress, the planner, and the event bus.
//!
//! Every type here is plain data — no behavior lives on these structs beyond
//! construction helpers. The state machines in [`crate::supervisor`] own the behavior.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Monotonic per-process counter used only to correlate log lines for one externally
/// originated call. Never persisted, never part of the wire protocol.
pub type RequestId = u64;

/// A built dependency artifact that carries the test classes or files for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub id: String,
    pub version: String,
}

/// A single independently-executed unit within a launch.
///
/// `id` is externally assigned and must be globally unique among currently running
/// test cases; it is how the test-case registry, terminate requests, and events
/// address a specific run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub artifact: Artifact,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A key/value pair injected into every build command for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// A client-submitted bundle of test cases to run together.
///
/// `type` selects both the [tool adapter](crate::tool::ToolAdapter) and the
/// [container template](crate::config::ContainerTemplate) used to build each case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub id: String,
    #[serde(rename = "type")]
    pub launch_type: String,
    #[serde(rename = "testcases")]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// The test case plus the launch-wide properties, serialized into the workload as
/// `BUILD_DATA` (see the in-container runner contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneTestCase {
    #[serde(flatten)]
    pub test_case: TestCase,
    pub properties: Vec<Property>,
}

/// Mapping of template input path to rendered output path, applied by the in-container
/// runner before the command line is exec'd.
pub type FileTemplates = HashMap<String, String>;

/// The fully-resolved recipe handed to the runtime driver for exactly one test case.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    pub request_id: RequestId,
    pub launch_id: String,
    pub case_id: String,
    pub image: String,
    pub command: Vec<String>,
    pub tmpfs: Vec<String>,
    pub data_dir: String,
    pub file_templates: FileTemplates,
    pub extra_volumes: Vec<(String, String)>,
    pub build_data: StandaloneTestCase,
}

/// The on-the-wire lifecycle event. `id` is a launch id or a test-case id depending
/// on `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub id: String,
}

impl Event {
    pub fn new(event_type: EventType, id: impl Into<String>) -> Self {
        Self {
            event_type,
            id: id.into(),
        }
    }
}

/// Lifecycle event kinds.
///
/// The wire string for [`EventType::TestCasePassed`] is `test_case_finished`, not
/// `test_case_passed` — kept for compatibility with the protocol this event model
/// is addressed against, despite being the more surprising of the two names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LaunchStarted,
    LaunchFinished,
    TestCaseStarted,
    TestCaseNotStarted,
    #[serde(rename = "test_case_finished")]
    TestCasePassed,
    TestCaseFailed,
    TestCaseRevoked,
    TestCaseTimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_passed_serializes_to_finished() {
        let json = serde_json::to_string(&EventType::TestCasePassed).unwrap();
        assert_eq!(json, "\"test_case_finished\"");
    }

    #[test]
    fn launch_json_uses_lower_camel_case_except_testcases() {
        let launch = Launch {
            id: "L1".into(),
            launch_type: "maven".into(),
            test_cases: vec![TestCase {
                id: "T1".into(),
                name: "pkg.S#a".into(),
                artifact: Artifact {
                    group_id: "g".into(),
                    id: "a".into(),
                    version: "1.0".into(),
                },
                tags: vec![],
            }],
            properties: vec![Property {
                key: "k".into(),
                value: "v".into(),
            }],
        };
        let json = serde_json::to_value(&launch).unwrap();
        assert_eq!(json["testcases"][0]["id"], "T1");
        assert_eq!(json["type"], "maven");
    }

    #[test]
    fn launch_round_trips_through_json() {
        let raw = r#"{
            "id": "L1",
            "type": "maven",
            "testcases": [{"id":"T1","name":"pkg.S#a","artifact":{"groupId":"g","id":"a","version":"1.0"}}],
            "properties": [{"key":"k","value":"v"}]
        }"#;
        let launch: Launch = serde_json::from_str(raw).unwrap();
        assert_eq!(launch.id, "L1");
        assert_eq!(launch.test_cases[0].id, "T1");
        assert!(launch.test_cases[0].tags.is_empty());
    }
}
