//! Docker-backed runtime driver.
//!
//! Each [`BuildSpec`] becomes exactly one container, run to completion and
//! auto-removed on exit — unlike a long-lived sandbox kept alive with `sleep
//! infinity`, this driver's containers are single-shot: they exec the build
//! command directly and the driver waits for the exit status.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::{CancelHandle, DriverError, RuntimeDriver, StartedWorkload};
use crate::config::LogConfig;
use crate::model::BuildSpec;

/// 256 MiB, per the process-wide shared-memory requirement on every workload.
const SHM_SIZE_BYTES: i64 = 256 * 1024 * 1024;

pub struct DockerDriver {
    docker: Docker,
    log_config: LogConfig,
    host_data_dir: PathBuf,
    tz: String,
}

impl DockerDriver {
    pub fn connect(log_config: LogConfig, host_data_dir: PathBuf) -> Result<Self, DriverError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| DriverError::CreateFailed(e.to_string()))?;
        let tz = std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string());
        Ok(Self {
            docker,
            log_config,
            host_data_dir,
            tz,
        })
    }
}

#[async_trait]
impl RuntimeDriver for DockerDriver {
    async fn start(&self, spec: &BuildSpec) -> Result<StartedWorkload, DriverError> {
        let templates_json = serde_json::to_string(&spec.file_templates)
            .map_err(|e| DriverError::CreateFailed(e.to_string()))?;
        let build_data_json = serde_json::to_string(&spec.build_data)
            .map_err(|e| DriverError::CreateFailed(e.to_string()))?;

        let env = vec![
            format!("TZ={}", self.tz),
            format!("DATA_DIR={}", spec.data_dir),
            format!("TEMPLATES={}", templates_json),
            format!("BUILD_DATA={}", build_data_json),
        ];

        let case_data_dir = self.host_data_dir.join(&spec.case_id);
        std::fs::create_dir_all(&case_data_dir).map_err(|e| {
            DriverError::CreateFailed(format!(
                "could not create host data dir {}: {e}",
                case_data_dir.display()
            ))
        })?;

        let mut binds = vec![format!(
            "{}:{}",
            case_data_dir.display(),
            spec.data_dir
        )];
        for (host, container) in &spec.extra_volumes {
            binds.push(format!("{host}:{container}"));
        }

        let tmpfs: HashMap<String, String> = spec
            .tmpfs
            .iter()
            .map(|mount| (mount.clone(), String::new()))
            .collect();

        let log_config = bollard::models::HostConfigLogConfig {
            typ: if self.log_config.driver.is_empty() {
                None
            } else {
                Some(self.log_config.driver.clone())
            },
            config: Some(self.log_config.options.clone()),
        };

        let host_config = HostConfig {
            binds: Some(binds),
            auto_remove: Some(true),
            tmpfs: Some(tmpfs),
            shm_size: Some(SHM_SIZE_BYTES),
            log_config: Some(log_config),
            privileged: Some(true),
            ..Default::default()
        };

        let container_config = ContainerConfig {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            env: Some(env),
            hostname: Some("localhost".to_string()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let container_name = format!("caserunner-{}", spec.case_id);
        let options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        info!(case_id = %spec.case_id, image = %spec.image, "STARTING_CONTAINER");

        let created = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| DriverError::CreateFailed(e.to_string()))?;
        let container_id = created.id;

        if let Err(e) = self
            .docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
        {
            remove_container(&self.docker, &container_id).await;
            return Err(DriverError::StartFailed(e.to_string()));
        }

        info!(case_id = %spec.case_id, container_id = %container_id, "CONTAINER_STARTED");

        let (tx, rx) = oneshot::channel();
        let docker = self.docker.clone();
        let waiter_container_id = container_id.clone();
        let case_id = spec.case_id.clone();
        tokio::spawn(async move {
            let success = wait_for(&docker, &waiter_container_id, &case_id).await;
            let _ = tx.send(success);
        });

        Ok(StartedWorkload {
            cancel: Arc::new(DockerCancelHandle {
                docker: self.docker.clone(),
                container_id,
                case_id: spec.case_id.clone(),
                done: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            }),
            finished: rx,
        })
    }
}

/// Blocks until the container exits and reports success iff it exited cleanly
/// with no driver-side error and a zero status code.
///
/// This is the corrected form of the upstream `waitFor` success check
/// (`err == nil && statusCode == 0`); the inverted `err != nil && statusCode == 0`
/// seen in prior implementations is a known defect and is not reproduced here.
async fn wait_for(docker: &Docker, container_id: &str, case_id: &str) -> bool {
    let options = WaitContainerOptions {
        condition: "not-running",
    };
    let mut stream = docker.wait_container(container_id, Some(options));

    match stream.next().await {
        Some(Ok(response)) => {
            let success = response.status_code == 0;
            if !success {
                warn!(case_id, status_code = response.status_code, "workload exited non-zero");
            }
            success
        }
        Some(Err(e)) => {
            error!(case_id, error = %e, "error waiting for workload");
            false
        }
        None => {
            error!(case_id, "wait stream ended with no result");
            false
        }
    }
}

struct DockerCancelHandle {
    docker: Docker,
    container_id: String,
    case_id: String,
    done: Arc<std::sync::atomic::AtomicBool>,
}

#[async_trait]
impl CancelHandle for DockerCancelHandle {
    async fn cancel(&self) {
        if self.done.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        info!(case_id = %self.case_id, container_id = %self.container_id, "TERMINATING");
        remove_container(&self.docker, &self.container_id).await;
    }
}

/// Force-removes a container and its volumes, tolerating "already gone".
async fn remove_container(docker: &Docker, container_id: &str) {
    info!(container_id, "REMOVING_CONTAINER");
    let options = RemoveContainerOptions {
        force: true,
        v: true,
        ..Default::default()
    };
    match docker.remove_container(container_id, Some(options)).await {
        Ok(()) => info!(container_id, "CONTAINER_REMOVED"),
        Err(e) => warn!(container_id, error = %e, "failed to remove container"),
    }
}
