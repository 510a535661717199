// Configuration module entry point
// Loads application configuration from file, environment and defaults

mod types;

use std::net::SocketAddr;

// Re-export public types
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, SiteConfig};

/// Default config file (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Prefix for environment overrides, e.g. `GATEWAY_SERVER__PORT=9000`
const ENV_PREFIX: &str = "GATEWAY";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// The file is optional; missing keys fall back to defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Parse configuration from TOML text layered over the defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    let site = SiteConfig::default();
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive", false)?
        .set_default("performance.read_timeout", 30)?
        .set_default("http.server_name", "GatewayPages")?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("site.template_dir", site.template_dir)?
        .set_default("site.static_dir", site.static_dir)?
        .set_default("site.index_files", site.index_files)
}
