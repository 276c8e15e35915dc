//! Runtime driver: starts and stops one isolated workload per build spec.
//!
//! [`docker`] holds the production implementation backed by the Docker daemon via
//! `bollard`. The trait is kept narrow and object-safe so the engine can hold a
//! single `Arc<dyn RuntimeDriver>` regardless of backend, and so tests can swap in
//! [`FakeDriver`] without touching a daemon.

pub mod docker;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::model::BuildSpec;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to create workload: {0}")]
    CreateFailed(String),
    #[error("failed to start workload: {0}")]
    StartFailed(String),
}

/// A handle that can forcibly stop a running workload. Implementations must make
/// `cancel` idempotent: calling it twice, or calling it after the workload has
/// already exited on its own, must not error or panic.
#[async_trait]
pub trait CancelHandle: Send + Sync {
    async fn cancel(&self);
}

/// What [`RuntimeDriver::start`] hands back: a way to kill the workload early, and
/// a one-shot signal that resolves to `true` iff the workload ran to completion
/// with a successful (zero) exit status.
///
/// `finished` is a `oneshot` by design (§9 of the design notes): it is produced
/// exactly once regardless of whether `cancel` was also invoked, and the receiver
/// may be dropped unread without that being an error — this is exactly the
/// single-slot-buffer the design notes call for.
pub struct StartedWorkload {
    pub cancel: Arc<dyn CancelHandle>,
    pub finished: oneshot::Receiver<bool>,
}

#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    async fn start(&self, spec: &BuildSpec) -> Result<StartedWorkload, DriverError>;
}
