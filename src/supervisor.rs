//! Launch supervisor (§4.G) and test-case supervisor (§4.H) state machines.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::model::{BuildSpec, EventType, RequestId};
use crate::planner;
use crate::registry::RunningTestCase;

/// Drives one launch from acceptance through `launch_finished`.
///
/// Ingress is responsible for having already put the launch into the launch
/// registry and validated its type is at least nominally known; this function
/// resolves it from the registry rather than taking it directly, matching the
/// protocol's "registry entry is created at ingress, not here" rule.
pub async fn run_launch(engine: Arc<Engine>, request_id: RequestId, launch_id: String) {
    let Some(launch) = engine.launches.get(&launch_id).await else {
        warn!(launch_id, "MISSING_LAUNCH");
        return;
    };

    engine.events.fire(EventType::LaunchStarted, launch_id.clone()).await;
    info!(launch_id, request_id, "launch_started");

    let Some(template) = engine.containers.get(&launch.launch_type) else {
        warn!(launch_id, launch_type = %launch.launch_type, "UNSUPPORTED_CONTAINER_TYPE");
        engine.launches.delete(&launch_id).await;
        engine.events.fire(EventType::LaunchFinished, launch_id.clone()).await;
        return;
    };

    let specs = planner::plan(&engine.tool_registry, template, request_id, &launch);

    let mut case_tasks = Vec::with_capacity(specs.len());
    for spec in specs {
        let engine = engine.clone();
        case_tasks.push(tokio::spawn(async move {
            run_test_case(engine, request_id, spec).await;
        }));
    }

    for task in case_tasks {
        if let Err(e) = task.await {
            error!(launch_id, error = %e, "test case supervisor task panicked");
        }
    }

    engine.launches.delete(&launch_id).await;
    engine.events.fire(EventType::LaunchFinished, launch_id.clone()).await;
    info!(launch_id, "launch_finished");
}

/// Drives one test case through its state machine (§4.H).
async fn run_test_case(engine: Arc<Engine>, request_id: RequestId, spec: BuildSpec) {
    let case_id = spec.case_id.clone();
    let launch_id = spec.launch_id.clone();

    if engine.test_cases.get(&case_id).await.is_some() {
        warn!(case_id, "test case id already running, refusing to start a second instance");
        return;
    }

    let started = match engine.driver.start(&spec).await {
        Ok(started) => started,
        Err(e) => {
            warn!(case_id, launch_id, error = %e, "FAILED_TO_LAUNCH");
            engine
                .events
                .fire(EventType::TestCaseNotStarted, case_id.clone())
                .await;
            return;
        }
    };

    let terminated = tokio_util::sync::CancellationToken::new();
    let case = Arc::new(RunningTestCase {
        cancel: started.cancel,
        terminated: terminated.clone(),
    });
    engine.test_cases.put(case_id.clone(), case.clone()).await;
    engine.events.fire(EventType::TestCaseStarted, case_id.clone()).await;
    info!(case_id, launch_id, "test_case_started");

    let mut finished = started.finished;
    let timeout = engine.config.timeout;

    let terminal_event = tokio::select! {
        result = &mut finished => {
            match result {
                Ok(true) => EventType::TestCasePassed,
                Ok(false) => EventType::TestCaseFailed,
                Err(_) => {
                    warn!(case_id, "driver dropped the finished signal without a value");
                    EventType::TestCaseFailed
                }
            }
        }
        _ = terminated.cancelled() => {
            EventType::TestCaseRevoked
        }
        _ = tokio::time::sleep(timeout) => {
            case.cancel.cancel().await;
            terminated.cancel();
            EventType::TestCaseTimedOut
        }
    };

    engine.events.fire(terminal_event, case_id.clone()).await;
    info!(case_id, launch_id, event = ?terminal_event, "test case terminal event");

    engine.test_cases.delete(&case_id).await;
}

/// The terminate protocol (§4.I): resolves `case_id` against the test-case
/// registry and, if present, cancels its workload and closes its terminated
/// signal. Absent ids and repeated calls on the same id are both silent no-ops —
/// `CancellationToken::cancel` is itself idempotent, and the supervisor removes
/// the case from the registry once it reaches TERMINAL.
pub async fn terminate(engine: &Engine, case_id: &str) {
    let Some(case) = engine.test_cases.get(case_id).await else {
        return;
    };
    info!(case_id, "TERMINATING");
    case.cancel.cancel().await;
    case.terminated.cancel();
}
