//! Configuration parsing for the sqlrelay binary.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;

/// sqlrelay: relay JSON requests to an in-memory SQLite database.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlrelay")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "SQLRELAY_LOG_JSON")]
    pub log_json: bool,

    /// Size of the router request channel (backpressure control)
    #[arg(long, env = "SQLRELAY_CHANNEL_SIZE", default_value_t = 256)]
    pub channel_size: usize,

    /// Maximum length in bytes of one request line
    #[arg(long, env = "SQLRELAY_MAX_LINE_BYTES", default_value_t = 16 * 1024 * 1024)]
    pub max_line_bytes: usize,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration for testing.
    pub fn test_config() -> Self {
        Self {
            log_level: "debug".into(),
            log_json: false,
            channel_size: 8,
            max_line_bytes: 64 * 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_json: false,
            channel_size: 256,
            max_line_bytes: 16 * 1024 * 1024,
        }
    }
}
