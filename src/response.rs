use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Build a JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string(body) {
        Ok(j) => j,
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            return fallback_error();
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build response: {e}"));
            fallback_error()
        })
}

/// Uniform 500 used for every dispatch failure kind
pub fn internal_error(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Internal Server Error",
        "message": message,
    });
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &body)
}

/// 404 that lists available functions to aid discovery
pub fn not_found(path: &str, available_functions: &[String]) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "availableFunctions": available_functions,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

fn fallback_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(
        r#"{"error":"Internal Server Error","message":"response build failure"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
