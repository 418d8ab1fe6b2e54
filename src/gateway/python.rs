//! Cross-language subprocess strategy
//!
//! A Python function is a `handler.py` in the function's directory
//! defining `handler(event, context)`. Each invocation spawns a fresh
//! interpreter running a small driver: the per-call process isolation
//! means handler edits take effect immediately and a crashing handler
//! cannot poison the gateway, which is the trade this development shim
//! wants. Only the resolution (which strategy, which directory) is
//! cached.
//!
//! Wire contract: the gateway writes `{"event":..., "context":...}` as
//! JSON on the child's stdin; the driver prints the handler's result as
//! JSON on stdout. Non-zero exit is an invocation error; unparseable
//! stdout is a contract violation.

use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::event::{InvocationContext, InvocationEvent};
use crate::error::{GatewayError, Result};

const DRIVER: &str = r#"
import json
import sys

payload = json.load(sys.stdin)
sys.path.insert(0, sys.argv[1])
import handler as module


class Context:
    def __init__(self, fields):
        self.aws_request_id = fields.get("requestId")
        self.function_name = fields.get("functionName")
        self.function_version = fields.get("functionVersion")
        self.memory_limit_in_mb = fields.get("memoryLimitInMB")
        self._remaining = fields.get("remainingTimeInMillis", 30000)

    def get_remaining_time_in_millis(self):
        return self._remaining


result = module.handler(payload["event"], Context(payload["context"]))
json.dump(result, sys.stdout)
"#;

pub struct PythonInvoker {
    python_bin: String,
    function_dir: PathBuf,
}

impl PythonInvoker {
    pub fn new(python_bin: String, function_dir: PathBuf) -> Self {
        Self {
            python_bin,
            function_dir,
        }
    }

    pub async fn invoke(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
    ) -> Result<Value> {
        let mut command = Command::new(&self.python_bin);
        command.arg("-c").arg(DRIVER).arg(&self.function_dir);
        run(command, event, context).await
    }
}

/// Spawn the handler process, feed it the invocation envelope and parse
/// its stdout. Interpreter-agnostic so tests can drive it with a shell
/// stand-in.
pub(super) async fn run(
    mut command: Command,
    event: &InvocationEvent,
    context: &InvocationContext,
) -> Result<Value> {
    let envelope = serde_json::json!({ "event": event, "context": context });
    let payload = serde_json::to_vec(&envelope)
        .map_err(|e| GatewayError::Invocation(format!("failed to encode envelope: {e}")))?;

    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GatewayError::Invocation(format!("failed to spawn handler process: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| GatewayError::Invocation("handler process has no stdin".to_string()))?;
    stdin
        .write_all(&payload)
        .await
        .map_err(|e| GatewayError::Invocation(format!("failed to write envelope: {e}")))?;
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| GatewayError::Invocation(format!("failed to wait for handler: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GatewayError::Invocation(format!(
            "handler process exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| {
        GatewayError::ContractViolation(format!("handler output is not valid JSON: {e}"))
    })
}
