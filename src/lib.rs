//! # caserunner
//!
//! A remote test-runner control plane. Clients submit *launches* — named bundles
//! of test cases drawn from some build-tool ecosystem — and the service fans each
//! one out into one isolated container per test case, runs them concurrently,
//! enforces per-case timeouts, honours asynchronous termination requests, streams
//! lifecycle events to subscribers, and drains cleanly on shutdown.
//!
//! ## Architecture
//!
//! Control flow: ingress → launch queue → [`supervisor::run_launch`] → one
//! [test-case supervisor](supervisor) per case → [`driver::RuntimeDriver`]. Data
//! flows back: the driver reports completion to the supervisor, which publishes to
//! the [`events::EventBus`] for any number of subscribed event streams.
//!
//! Everything shared across tasks — the registries, the event bus, the tool
//! registry, the container template map, and the runtime driver — lives in one
//! [`engine::Engine`] value built at startup and passed around as an `Arc`; there
//! is no module-scope global state.
//!
//! ```text
//! ingress ──► launch queue ──► launch supervisor ──┬──► test-case supervisor ──► runtime driver
//!                                                   ├──► test-case supervisor ──► runtime driver
//!                                                   └──► ...
//!                                                          │
//!                                                          ▼
//!                                                     event bus ──► subscribed /events streams
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use caserunner::config::ProcessConfig;
//! use caserunner::driver::docker::DockerDriver;
//! use caserunner::engine::Engine;
//! use caserunner::tool::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = Arc::new(DockerDriver::connect(Default::default(), "/data".into())?);
//!     let engine = Engine::start(
//!         ToolRegistry::default(),
//!         HashMap::new(),
//!         driver,
//!         ProcessConfig {
//!             listen: ":8080".into(),
//!             data_dir: "/data".into(),
//!             timeout: Duration::from_secs(600),
//!             shutdown_timeout: Duration::from_secs(30),
//!         },
//!     );
//!
//!     let app = caserunner::ingress::router(engine);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod engine;
pub mod events;
pub mod ingress;
pub mod model;
pub mod planner;
pub mod registry;
pub mod supervisor;
pub mod tool;

pub use engine::Engine;
pub use model::{Event, EventType, Launch, TestCase};
