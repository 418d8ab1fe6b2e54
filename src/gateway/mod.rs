//! Function gateway
//!
//! Translates an inbound HTTP request into one call to a dynamically
//! resolved local handler and maps the handler's return value back
//! onto the HTTP response, emulating the contract of a cloud
//! function-as-a-service platform closely enough that the same handler
//! code runs locally and in production.

mod event;
mod native;
mod python;
mod resolver;
mod result;

pub use resolver::FunctionResolver;

use event::{InvocationContext, InvocationEvent};
use result::InvocationResult;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::AppState;
use crate::error::GatewayError;
use crate::logger;
use crate::response;

pub async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            return Ok(response::internal_error("Failed to read request body"));
        }
    };

    Ok(route_request(&parts, &body, peer_addr, &state).await)
}

async fn route_request(
    parts: &Parts,
    body: &Bytes,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let path = parts.uri.path().to_string();

    if state.config.logging.access_log {
        logger::log_request(&parts.method, &parts.uri);
    }

    // Any method is dispatched; the function name is a single path
    // segment after /api/.
    if let Some(name) = path.strip_prefix("/api/") {
        if !name.is_empty() && !name.contains('/') {
            return dispatch_function(name, parts, body, peer_addr, state).await;
        }
    }

    match (&parts.method, path.as_str()) {
        (&Method::GET, "/health") => handle_health(state),
        (&Method::GET, "/") => handle_index(state).await,
        _ => {
            let available = state.resolver.available_functions().await;
            response::not_found(&path, &available)
        }
    }
}

/// The dispatch operation: resolve, build event/context, invoke, map
/// the result. Every failure kind collapses to the uniform 500 body.
async fn dispatch_function(
    name: &str,
    parts: &Parts,
    body: &Bytes,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) -> Response<Full<Bytes>> {
    let started = Instant::now();

    match invoke_function(name, parts, body, peer_addr, state).await {
        Ok(result) => {
            logger::log_dispatch(name, result.status_code.as_u16(), started.elapsed());
            build_handler_response(&result)
        }
        Err(e) => {
            logger::log_dispatch_error(name, &e);
            response::internal_error(&e.to_string())
        }
    }
}

async fn invoke_function(
    name: &str,
    parts: &Parts,
    body: &Bytes,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) -> Result<InvocationResult, GatewayError> {
    let handler = state.resolver.resolve(name).await?;

    let request_id = Uuid::new_v4().to_string();
    let event = InvocationEvent::from_request(name, &request_id, parts, body, peer_addr);
    let context = InvocationContext::new(name, &request_id);

    let value = handler.invoke(&event, &context).await?;
    InvocationResult::from_value(&value)
}

fn build_handler_response(result: &InvocationResult) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(result.status_code);
    for (name, value) in &result.headers {
        builder = builder.header(name, value);
    }

    builder
        .body(Full::new(Bytes::from(result.body.clone())))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build handler response: {e}"));
            response::internal_error("Failed to build handler response")
        })
}

fn handle_health(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
        "memory": rss_bytes().map(|rss| serde_json::json!({ "rss": rss })),
        "env": state.config.gateway.environment,
    });
    response::json_response(StatusCode::OK, &body)
}

async fn handle_index(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "service": "funcgate",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.gateway.environment,
        "availableFunctions": state.resolver.available_functions().await,
    });
    response::json_response(StatusCode::OK, &body)
}

#[cfg(target_os = "linux")]
fn rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(target_os = "linux"))]
fn rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GatewayConfig, LoggingConfig, PerformanceConfig, ServerConfig};
    use serde_json::Value;
    use std::path::{Path, PathBuf};

    fn scratch_root(tag: &str) -> PathBuf {
        let root =
            std::env::temp_dir().join(format!("funcgate-gateway-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn test_state(root: &Path) -> Arc<AppState> {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
            },
            gateway: GatewayConfig {
                functions_root: root.to_string_lossy().into_owned(),
                environment: "test".to_string(),
                python_bin: "python3".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: false,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
        };
        Arc::new(AppState::new(&config))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn request_parts(method: &str, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let root = scratch_root("health");
        let state = test_state(&root);

        let parts = request_parts("GET", "/health");
        let response = route_request(&parts, &Bytes::new(), peer(), &state).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["env"], "test");
        assert!(body["timestamp"].is_string());
        assert!(body["uptime"].is_u64());
        assert!(body.get("memory").is_some());
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_index_lists_functions() {
        let root = scratch_root("index");
        std::fs::create_dir_all(root.join("pay")).unwrap();
        std::fs::write(root.join("pay").join("handler.py"), "# stub\n").unwrap();
        let state = test_state(&root);

        let parts = request_parts("GET", "/");
        let body = body_json(route_request(&parts, &Bytes::new(), peer(), &state).await).await;
        assert_eq!(body["service"], "funcgate");
        assert_eq!(body["availableFunctions"], serde_json::json!(["pay"]));
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_with_functions() {
        let root = scratch_root("notfound");
        std::fs::create_dir_all(root.join("pay")).unwrap();
        let state = test_state(&root);

        let parts = request_parts("GET", "/nope");
        let response = route_request(&parts, &Bytes::new(), peer(), &state).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["path"], "/nope");
        assert!(body["availableFunctions"].is_array());
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_missing_function_is_500_naming_it() {
        let root = scratch_root("missing-fn");
        let state = test_state(&root);

        let parts = request_parts("POST", "/api/ghost");
        let response = route_request(&parts, &Bytes::new(), peer(), &state).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal Server Error");
        assert!(body["message"].as_str().unwrap().contains("ghost"));
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_nested_api_path_falls_through_to_404() {
        let root = scratch_root("nested");
        let state = test_state(&root);

        let parts = request_parts("GET", "/api/a/b");
        let response = route_request(&parts, &Bytes::new(), peer(), &state).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_python_function_dispatch_end_to_end() {
        // Covers the concrete echo scenario; skipped quietly when no
        // python3 is on PATH.
        if tokio::process::Command::new("python3")
            .arg("--version")
            .output()
            .await
            .is_err()
        {
            return;
        }

        let root = scratch_root("echo");
        std::fs::create_dir_all(root.join("echo")).unwrap();
        std::fs::write(
            root.join("echo").join("handler.py"),
            r#"
import json

def handler(event, context):
    return {"statusCode": 200, "body": json.dumps({"got": event["queryStringParameters"]})}
"#,
        )
        .unwrap();
        let state = test_state(&root);

        let parts = request_parts("GET", "/api/echo?x=5");
        let response = route_request(&parts, &Bytes::new(), peer(), &state).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["got"]["x"], "5");
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_handler_response_defaults() {
        let result = InvocationResult::from_value(&serde_json::json!({})).unwrap();
        let response = build_handler_response(&result);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_handler_response_carries_headers() {
        let result = InvocationResult::from_value(&serde_json::json!({
            "statusCode": 201,
            "headers": { "X-Fn": "echo" },
        }))
        .unwrap();
        let response = build_handler_response(&result);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["X-Fn"], "echo");
    }
}
