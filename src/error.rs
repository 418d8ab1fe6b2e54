use thiserror::Error;

/// Errors surfaced by the function gateway.
///
/// All variants collapse to the same uniform 500 response at the top of
/// the request path; the distinction matters for logging and tests, not
/// for the caller.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The function's directory does not exist under the functions root.
    #[error("Function directory not found: {0}")]
    FunctionNotFound(String),

    /// The directory exists but contains no recognized entry-point file.
    #[error("No recognized entry point for function: {0}")]
    NoEntryPoint(String),

    /// The discovered entry point could not be loaded.
    #[error("Failed to load handler for {name}: {reason}")]
    Load { name: String, reason: String },

    /// The handler itself failed (threw, or the subprocess exited non-zero).
    #[error("Handler invocation failed: {0}")]
    Invocation(String),

    /// The handler produced output that is not a valid invocation result.
    #[error("Handler returned a malformed result: {0}")]
    ContractViolation(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
