// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub site: SiteConfig,
    /// User directory served by the `/user/` page (id -> display name)
    #[serde(default)]
    pub users: HashMap<String, String>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `gateway_pages=debug`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound for serving one connection, in seconds
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` header on every response
    pub server_name: String,
    pub max_body_size: u64,
}

/// Site content configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Page templates plus the 404/500 pages
    pub template_dir: String,
    /// Root of everything served under `/static/`
    pub static_dir: String,
    pub index_files: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            template_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
        }
    }
}
