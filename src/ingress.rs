//! Ingress: the HTTP + WebSocket surface (§6). Parses requests, validates them
//! against the tool registry and launch registry, and hands accepted work to the
//! engine's queues. Runtime outcomes are never reflected in an HTTP response body —
//! clients must consume `/events`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::engine::Engine;
use crate::model::Launch;

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/launch", post(launch))
        .route("/terminate", put(terminate))
        .route("/events", get(events))
        .with_state(engine)
}

#[derive(Serialize)]
struct PingResponse {
    uptime: String,
}

async fn ping(State(engine): State<Arc<Engine>>) -> Json<PingResponse> {
    let uptime = engine.started_at.elapsed();
    Json(PingResponse {
        uptime: format!("{:.3}s", uptime.as_secs_f64()),
    })
}

async fn launch(State(engine): State<Arc<Engine>>, body: Option<Json<Launch>>) -> Response {
    if engine.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down, not accepting new launches")
            .into_response();
    }

    let Some(Json(launch)) = body else {
        return (StatusCode::BAD_REQUEST, "invalid launch JSON").into_response();
    };

    if !engine.tool_registry.is_supported(&launch.launch_type) {
        return (
            StatusCode::BAD_REQUEST,
            format!("unsupported launch type: {}", launch.launch_type),
        )
            .into_response();
    }

    let launch_id = launch.id.clone();
    if engine.launches.put_if_absent(launch).await {
        return (
            StatusCode::BAD_REQUEST,
            format!("launch id already in flight: {launch_id}"),
        )
            .into_response();
    }

    let request_id = engine.next_request_id();
    engine.enqueue_launch(request_id, launch_id).await;
    StatusCode::ACCEPTED.into_response()
}

async fn terminate(State(engine): State<Arc<Engine>>, body: Option<Json<Value>>) -> Response {
    let Some(Json(value)) = body else {
        return (StatusCode::BAD_REQUEST, "invalid terminate JSON").into_response();
    };
    let Some(ids) = value.as_array() else {
        return (StatusCode::BAD_REQUEST, "expected a JSON array of test case ids").into_response();
    };

    for id in ids {
        let Some(id) = id.as_str() else {
            return (StatusCode::BAD_REQUEST, "test case ids must be strings").into_response();
        };
        engine.enqueue_terminate(id.to_string()).await;
    }

    StatusCode::ACCEPTED.into_response()
}

async fn events(ws: WebSocketUpgrade, State(engine): State<Arc<Engine>>) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, engine))
}

async fn stream_events(socket: WebSocket, engine: Arc<Engine>) {
    let mut subscription = engine.events.subscribe().await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            _ = engine.shutdown.cancelled() => {
                break;
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "event stream socket error");
                        break;
                    }
                    _ => {}
                }
            }
            event = subscription.recv() => {
                match event {
                    Some(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(error = %e, "failed to serialize event");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContainerTemplate, ProcessConfig};
    use crate::driver::fake::{FakeBehavior, FakeDriver};
    use crate::tool::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;

    fn engine() -> Arc<Engine> {
        let mut containers = HashMap::new();
        containers.insert(
            "maven".to_string(),
            ContainerTemplate {
                image: "maven:3.9".into(),
                data_dir: "/work".into(),
                tmpfs: vec![],
                file_templates: Default::default(),
                extra_volumes: Default::default(),
            },
        );
        Engine::start(
            ToolRegistry::default(),
            containers,
            Arc::new(FakeDriver::new(FakeBehavior::FinishAfter {
                success: true,
                delay: Duration::from_millis(5),
            })),
            ProcessConfig {
                listen: ":0".into(),
                data_dir: std::env::temp_dir().to_string_lossy().into_owned(),
                timeout: Duration::from_secs(5),
                shutdown_timeout: Duration::from_millis(100),
            },
        )
    }

    #[tokio::test]
    async fn ping_returns_200_with_uptime() {
        let app = router(engine());
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn launch_rejected_once_shutdown_is_signalled() {
        let engine = engine();
        engine.shutdown.cancel();
        let app = router(engine);
        let body = r#"{"id":"L1","type":"maven","testcases":[],"properties":[]}"#;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/launch")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unsupported_launch_type_is_rejected() {
        let app = router(engine());
        let body = r#"{"id":"L1","type":"bazel","testcases":[],"properties":[]}"#;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/launch")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_launch_id_is_rejected() {
        let app = router(engine());
        let body = r#"{"id":"L1","type":"maven","testcases":[],"properties":[]}"#;

        let first = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/launch")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/launch")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn terminate_rejects_non_array_body() {
        let app = router(engine());
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/terminate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"not":"an array"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn terminate_accepts_array_of_ids() {
        let app = router(engine());
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/terminate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"["T1","T2"]"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
