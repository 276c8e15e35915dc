//! The engine: one explicit value holding every piece of shared state instead of
//! process-wide singletons. Constructed once at startup and passed as an `Arc` to
//! ingress and the supervisor tasks — nothing here lives behind a module-scope
//! global.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ContainerTemplate, ProcessConfig};
use crate::driver::RuntimeDriver;
use crate::events::EventBus;
use crate::model::RequestId;
use crate::registry::{LaunchRegistry, TestCaseRegistry};
use crate::supervisor;
use crate::tool::ToolRegistry;

/// Queues are deliberately small: they backpressure ingress naturally rather than
/// buffering unboundedly, matching the concurrency model's resource constraints.
const QUEUE_CAPACITY: usize = 32;

pub struct Engine {
    pub tool_registry: ToolRegistry,
    pub containers: HashMap<String, ContainerTemplate>,
    pub driver: Arc<dyn RuntimeDriver>,
    pub launches: LaunchRegistry,
    pub test_cases: TestCaseRegistry,
    pub events: Arc<EventBus>,
    pub config: ProcessConfig,
    pub started_at: Instant,
    /// Closed when the process is draining; ingress stops accepting new launches.
    pub shutdown: CancellationToken,
    next_request_id: AtomicU64,
    launch_tx: mpsc::Sender<(RequestId, String)>,
    terminate_tx: mpsc::Sender<String>,
}

impl Engine {
    /// Builds the engine and spawns its two consumer tasks (launch, terminate).
    /// Returns the engine handle; call [`Engine::run_shutdown`] on exit signal.
    pub fn start(
        tool_registry: ToolRegistry,
        containers: HashMap<String, ContainerTemplate>,
        driver: Arc<dyn RuntimeDriver>,
        config: ProcessConfig,
    ) -> Arc<Self> {
        let (launch_tx, launch_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (terminate_tx, terminate_rx) = mpsc::channel(QUEUE_CAPACITY);

        let engine = Arc::new(Self {
            tool_registry,
            containers,
            driver,
            launches: LaunchRegistry::new(),
            test_cases: TestCaseRegistry::new(),
            events: EventBus::new(),
            config,
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
            next_request_id: AtomicU64::new(1),
            launch_tx,
            terminate_tx,
        });

        tokio::spawn(consume_launches(engine.clone(), launch_rx));
        tokio::spawn(consume_terminates(engine.clone(), terminate_rx));

        engine
    }

    pub fn next_request_id(&self) -> RequestId {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Enqueues a launch for processing. The caller (ingress) is responsible for
    /// having already registered the launch in `self.launches` and validated its
    /// type. Backpressures if the queue is full.
    pub async fn enqueue_launch(&self, request_id: RequestId, launch_id: String) {
        if self.launch_tx.send((request_id, launch_id)).await.is_err() {
            warn!("launch queue consumer is gone; dropping launch");
        }
    }

    /// Enqueues a termination request for a case id. Unknown ids are a silent
    /// no-op, resolved inside the terminate consumer.
    pub async fn enqueue_terminate(&self, case_id: String) {
        if self.terminate_tx.send(case_id).await.is_err() {
            warn!("terminate queue consumer is gone; dropping terminate request");
        }
    }

    /// Initiates the shutdown drain: stop accepting new launches, race every
    /// running case's `terminated` signal against `shutdown_timeout`, then return
    /// once every running case has been revoked or timed out on its own.
    pub async fn run_shutdown(&self) {
        self.shutdown.cancel();
        info!("shutdown initiated, draining running test cases");

        let mut running = Vec::new();
        self.test_cases.for_each(|_, case| {
            running.push(case.clone());
        }).await;

        let deadline = self.config.shutdown_timeout;
        let drains = running.into_iter().map(|case| async move {
            tokio::select! {
                _ = case.terminated.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    case.cancel.cancel().await;
                    case.terminated.cancel();
                }
            }
        });
        futures::future::join_all(drains).await;

        info!("shutdown drain complete");
    }
}

/// Stops pulling new launches as soon as shutdown is signalled — a keep-alive
/// connection can still get a request enqueued after axum stops accepting new
/// TCP connections, so the consumer itself must also close the door.
async fn consume_launches(
    engine: Arc<Engine>,
    mut launch_rx: mpsc::Receiver<(RequestId, String)>,
) {
    loop {
        let next = tokio::select! {
            _ = engine.shutdown.cancelled() => break,
            next = launch_rx.recv() => next,
        };
        let Some((request_id, launch_id)) = next else {
            break;
        };
        let engine = engine.clone();
        tokio::spawn(async move {
            supervisor::run_launch(engine, request_id, launch_id).await;
        });
    }
}

async fn consume_terminates(engine: Arc<Engine>, mut terminate_rx: mpsc::Receiver<String>) {
    while let Some(case_id) = terminate_rx.recv().await {
        let engine = engine.clone();
        tokio::spawn(async move {
            supervisor::terminate(&engine, &case_id).await;
        });
    }
}
