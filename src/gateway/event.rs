//! Invocation event and context records
//!
//! These mirror the shapes a cloud function platform passes to its
//! handlers, so the same handler code runs locally and in production.

use chrono::Utc;
use hyper::http::request::Parts;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;

const FUNCTION_VERSION: &str = "1.0";
const MEMORY_LIMIT_MB: u32 = 256;
const REMAINING_TIME_MS: u64 = 30_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub http_method: String,
    pub headers: HashMap<String, String>,
    pub url: String,
    pub params: HashMap<String, String>,
    pub query_string_parameters: HashMap<String, String>,
    /// Always the raw body text; a JSON request body arrives as its
    /// serialized form, never as a structured value.
    pub body: String,
    pub is_base64_encoded: bool,
    pub request_context: RequestContext,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: String,
    pub identity: Identity,
    pub http_method: String,
    pub request_time: String,
    pub request_time_epoch: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub source_ip: String,
    pub user_agent: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub request_id: String,
    pub function_name: String,
    pub function_version: String,
    #[serde(rename = "memoryLimitInMB")]
    pub memory_limit_in_mb: u32,
    /// Cosmetic time budget; nothing enforces it.
    pub remaining_time_in_millis: u64,
}

impl InvocationEvent {
    pub fn from_request(
        function_name: &str,
        request_id: &str,
        parts: &Parts,
        body: &[u8],
        peer_addr: SocketAddr,
    ) -> Self {
        let now = Utc::now();

        let headers: HashMap<String, String> = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let user_agent = headers.get("user-agent").cloned().unwrap_or_default();

        let mut params = HashMap::new();
        params.insert("functionName".to_string(), function_name.to_string());

        Self {
            http_method: parts.method.to_string(),
            headers,
            url: parts.uri.to_string(),
            params,
            query_string_parameters: parse_query(parts.uri.query()),
            body: String::from_utf8_lossy(body).into_owned(),
            is_base64_encoded: false,
            request_context: RequestContext {
                request_id: request_id.to_string(),
                identity: Identity {
                    source_ip: peer_addr.ip().to_string(),
                    user_agent,
                },
                http_method: parts.method.to_string(),
                request_time: now.to_rfc3339(),
                request_time_epoch: now.timestamp_millis(),
            },
        }
    }
}

impl InvocationContext {
    pub fn new(function_name: &str, request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            function_name: function_name.to_string(),
            function_version: FUNCTION_VERSION.to_string(),
            memory_limit_in_mb: MEMORY_LIMIT_MB,
            remaining_time_in_millis: REMAINING_TIME_MS,
        }
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let Some(query) = query else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Percent-decode one query key or value, passing it through unchanged
/// if the encoding is malformed.
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;

    fn peer() -> SocketAddr {
        "127.0.0.1:54321".parse().unwrap()
    }

    fn parts_for(method: &str, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("User-Agent", "test-agent/1.0")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_body_stays_serialized() {
        let parts = parts_for("POST", "/api/echo");
        let event = InvocationEvent::from_request("echo", "req-1", &parts, br#"{"a":1}"#, peer());
        assert_eq!(event.body, r#"{"a":1}"#);
    }

    #[test]
    fn test_query_string_parameters() {
        let parts = parts_for("GET", "/api/echo?x=5&flag");
        let event = InvocationEvent::from_request("echo", "req-1", &parts, b"", peer());
        assert_eq!(
            event.query_string_parameters.get("x"),
            Some(&"5".to_string())
        );
        assert_eq!(
            event.query_string_parameters.get("flag"),
            Some(&String::new())
        );
    }

    #[test]
    fn test_query_values_are_percent_decoded() {
        let parts = parts_for("GET", "/api/echo?msg=a%20b&user%2Fid=7&bad=%zz");
        let event = InvocationEvent::from_request("echo", "req-1", &parts, b"", peer());
        assert_eq!(
            event.query_string_parameters.get("msg"),
            Some(&"a b".to_string())
        );
        assert_eq!(
            event.query_string_parameters.get("user/id"),
            Some(&"7".to_string())
        );
        // Malformed escapes fall through untouched.
        assert_eq!(
            event.query_string_parameters.get("bad"),
            Some(&"%zz".to_string())
        );
    }

    #[test]
    fn test_event_wire_shape() {
        let parts = parts_for("POST", "/api/echo?x=5");
        let event = InvocationEvent::from_request("echo", "req-1", &parts, b"hi", peer());
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["httpMethod"], "POST");
        assert_eq!(value["isBase64Encoded"], false);
        assert_eq!(value["params"]["functionName"], "echo");
        assert_eq!(value["requestContext"]["requestId"], "req-1");
        assert_eq!(value["requestContext"]["identity"]["sourceIp"], "127.0.0.1");
        assert_eq!(
            value["requestContext"]["identity"]["userAgent"],
            "test-agent/1.0"
        );
        assert!(value["requestContext"]["requestTimeEpoch"].is_i64());
    }

    #[test]
    fn test_context_wire_shape() {
        let context = InvocationContext::new("echo", "req-1");
        let value = serde_json::to_value(&context).unwrap();

        assert_eq!(value["requestId"], "req-1");
        assert_eq!(value["functionName"], "echo");
        assert_eq!(value["functionVersion"], "1.0");
        assert_eq!(value["memoryLimitInMB"], 256);
        assert_eq!(value["remainingTimeInMillis"], 30_000);
    }
}
