//! Function resolution and the handler cache
//!
//! A function is a directory named after its route segment under the
//! functions root. Entry points are probed in fixed priority order:
//! `handler.py` (Python, subprocess strategy) first, then `handler.so`
//! (native cdylib, dynamic-load strategy). Resolution is deterministic
//! for a fixed filesystem state.
//!
//! The cache is lazy, keyed by function name and never evicted for the
//! process lifetime. Population is single-flight: concurrent first
//! requests for the same uncached name await one load instead of racing
//! duplicate loads. A failed load is not cached; the next request
//! retries.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use serde_json::Value;

use super::event::{InvocationContext, InvocationEvent};
use super::native::NativeHandler;
use super::python::PythonInvoker;
use crate::error::{GatewayError, Result};
use crate::logger;

const PYTHON_ENTRY: &str = "handler.py";
const NATIVE_ENTRY: &str = "handler.so";
/// Dependency directories hidden from function discovery.
const RESERVED_DIRS: &[&str] = &["node_modules", "__pycache__"];

pub enum Handler {
    Python(PythonInvoker),
    Native(NativeHandler),
}

impl Handler {
    pub async fn invoke(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
    ) -> Result<Value> {
        match self {
            Self::Python(invoker) => invoker.invoke(event, context).await,
            Self::Native(handler) => handler.invoke(event, context),
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Python(_) => "python-subprocess",
            Self::Native(_) => "native-dylib",
        }
    }
}

// Library handles carry no useful state to print; the strategy name is
// enough for diagnostics.
impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy())
    }
}

pub struct FunctionResolver {
    root: PathBuf,
    python_bin: String,
    cache: Mutex<HashMap<String, Arc<OnceCell<Arc<Handler>>>>>,
}

impl FunctionResolver {
    pub fn new(root: impl Into<PathBuf>, python_bin: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            python_bin: python_bin.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a function name to its loaded handler, loading and
    /// caching on first request. Only successful loads stay in the
    /// cache; a failed load's cell is dropped so the map holds loaded
    /// handlers and nothing else.
    pub async fn resolve(&self, name: &str) -> Result<Arc<Handler>> {
        if !is_safe_name(name) {
            return Err(GatewayError::FunctionNotFound(name.to_string()));
        }

        let cell = {
            let mut cache = self.cache.lock().expect("handler cache poisoned");
            Arc::clone(cache.entry(name.to_string()).or_default())
        };

        let resolved = cell
            .get_or_try_init(|| async { self.load(name).await.map(Arc::new) })
            .await
            .map(Arc::clone);

        if resolved.is_err() {
            let mut cache = self.cache.lock().expect("handler cache poisoned");
            if cache.get(name).is_some_and(|c| !c.initialized()) {
                cache.remove(name);
            }
        }
        resolved
    }

    async fn load(&self, name: &str) -> Result<Handler> {
        let dir = self.root.join(name);
        if !is_dir(&dir).await {
            return Err(GatewayError::FunctionNotFound(name.to_string()));
        }

        let python_entry = dir.join(PYTHON_ENTRY);
        if is_file(&python_entry).await {
            let handler = Handler::Python(PythonInvoker::new(self.python_bin.clone(), dir));
            logger::log_handler_loaded(name, handler.strategy());
            return Ok(handler);
        }

        let native_entry = dir.join(NATIVE_ENTRY);
        if is_file(&native_entry).await {
            let native = NativeHandler::load(&native_entry).map_err(|e| GatewayError::Load {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            let handler = Handler::Native(native);
            logger::log_handler_loaded(name, handler.strategy());
            return Ok(handler);
        }

        Err(GatewayError::NoEntryPoint(name.to_string()))
    }

    /// Enumerate function names by listing the functions root, skipping
    /// hidden and dependency directories. Sorted for stable output.
    pub async fn available_functions(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return names;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || RESERVED_DIRS.contains(&name.as_str()) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        names
    }
}

/// A function name must be a single normal path component, so joining
/// it onto the root can never escape the functions directory.
fn is_safe_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
