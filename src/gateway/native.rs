//! Same-language dynamic-load strategy
//!
//! A native function is a cdylib named `handler.so` in the function's
//! directory, exporting:
//!
//! ```ignore
//! #[no_mangle]
//! pub fn handler(event: Value, context: Value) -> Result<Value, String> { ... }
//! ```
//!
//! The library is loaded once at resolution time and kept alive in the
//! handler cache; repeat invocations do not reload the module.

use libloading::{Library, Symbol};
use serde_json::Value;
use std::path::Path;

use super::event::{InvocationContext, InvocationEvent};
use crate::error::{GatewayError, Result};

const HANDLER_SYMBOL: &[u8] = b"handler";

type HandlerFn = fn(Value, Value) -> std::result::Result<Value, String>;

pub struct NativeHandler {
    library: Library,
}

impl NativeHandler {
    /// Load the cdylib and verify the handler symbol is present, so a
    /// bad module fails at resolution time rather than on first call.
    pub fn load(path: &Path) -> std::result::Result<Self, libloading::Error> {
        let library = unsafe { Library::new(path) }?;
        unsafe {
            library.get::<HandlerFn>(HANDLER_SYMBOL)?;
        }
        Ok(Self { library })
    }

    pub fn invoke(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
    ) -> Result<Value> {
        let handler: Symbol<HandlerFn> = unsafe { self.library.get(HANDLER_SYMBOL) }
            .map_err(|e| GatewayError::Invocation(format!("handler symbol lookup failed: {e}")))?;

        call_handler(*handler, event, context)
    }
}

/// Encode the records, run the handler, and map a handler-reported
/// error string into an invocation error.
fn call_handler(
    handler: HandlerFn,
    event: &InvocationEvent,
    context: &InvocationContext,
) -> Result<Value> {
    let event = serde_json::to_value(event)
        .map_err(|e| GatewayError::Invocation(format!("failed to encode event: {e}")))?;
    let context = serde_json::to_value(context)
        .map_err(|e| GatewayError::Invocation(format!("failed to encode context: {e}")))?;

    handler(event, context).map_err(GatewayError::Invocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;
    use serde_json::json;

    fn fixture() -> (InvocationEvent, InvocationContext) {
        let (parts, ()) = Request::builder()
            .method("POST")
            .uri("/api/adder?n=2")
            .body(())
            .unwrap()
            .into_parts();
        let event = InvocationEvent::from_request(
            "adder",
            "req-9",
            &parts,
            br#"{"n": 2}"#,
            "127.0.0.1:40000".parse().unwrap(),
        );
        (event, InvocationContext::new("adder", "req-9"))
    }

    #[test]
    fn test_call_handler_receives_encoded_records() {
        fn echo(event: Value, context: Value) -> std::result::Result<Value, String> {
            Ok(json!({
                "method": event["httpMethod"],
                "query": event["queryStringParameters"]["n"],
                "function": context["functionName"],
            }))
        }

        let (event, context) = fixture();
        let result = call_handler(echo, &event, &context).unwrap();
        assert_eq!(result["method"], "POST");
        assert_eq!(result["query"], "2");
        assert_eq!(result["function"], "adder");
    }

    #[test]
    fn test_call_handler_maps_error_string() {
        fn failing(_event: Value, _context: Value) -> std::result::Result<Value, String> {
            Err("handler blew up".to_string())
        }

        let (event, context) = fixture();
        let err = call_handler(failing, &event, &context).unwrap_err();
        assert!(matches!(err, GatewayError::Invocation(msg) if msg == "handler blew up"));
    }
}
