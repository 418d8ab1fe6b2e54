use crate::config::Config;
use crate::error::GatewayError;
use hyper::{Method, Uri};
use std::net::SocketAddr;
use std::time::Duration;

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    println!("======================================");
    println!("Function gateway started successfully");
    println!("Listening on: http://{addr}");
    println!("Functions root: {}", config.gateway.functions_root);
    println!("Environment: {}", config.gateway.environment);
    println!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        println!("Worker threads: {workers}");
    }
    println!("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    println!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

pub fn log_request(method: &Method, uri: &Uri) {
    println!("[Request] {method} {uri}");
}

pub fn log_handler_loaded(function_name: &str, strategy: &str) {
    println!("[Resolver] Loaded handler for {function_name} ({strategy})");
}

pub fn log_dispatch(function_name: &str, status: u16, elapsed: Duration) {
    println!(
        "[Dispatch] {function_name} -> {status} ({} ms)",
        elapsed.as_millis()
    );
}

pub fn log_dispatch_error(function_name: &str, err: &GatewayError) {
    eprintln!("[Dispatch] {function_name} failed: {err}");
}

pub fn log_shutdown() {
    println!("\n[Shutdown] Termination signal received, closing listener");
}
