//! Daemon bootstrap configuration from environment variables
//!
//! Covers what the daemon needs before the agent YAML is loaded: which
//! transport to serve on, where the YAML lives and how verbose to log.
//! The listen address itself comes from the agent config, which folds
//! `SVC_AGENT_HOST`/`SVC_AGENT_PORT` in as overrides.

use std::env;

// Default configuration values
const DEFAULT_SOCKET_PATH: &str = "/var/run/svc_agent/agent.sock";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Transport mode: "tcp" or "unix"
    pub transport_mode: TransportMode,

    /// Unix socket path (unix socket mode only)
    pub socket_path: String,

    /// Agent config file path; the search order applies when unset
    pub config_file: Option<String>,

    /// Log level / env-filter directive
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransportMode {
    #[default]
    Tcp,
    Unix,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            transport_mode: Self::parse_transport_mode(),
            socket_path: env::var("SVC_AGENT_SOCKET_PATH")
                .unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string()),
            config_file: env::var("SVC_AGENT_CONFIG").ok(),
            log_level: Self::parse_log_level(),
        }
    }

    fn parse_transport_mode() -> TransportMode {
        env::var("SVC_AGENT_TRANSPORT")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "tcp" => Some(TransportMode::Tcp),
                "unix" => Some(TransportMode::Unix),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn parse_log_level() -> String {
        // Priority: SVC_AGENT_LOG_LEVEL > RUST_LOG > default
        env::var("SVC_AGENT_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.transport_mode == TransportMode::Unix && self.socket_path.is_empty() {
            return Err("SVC_AGENT_SOCKET_PATH cannot be empty in unix mode".to_string());
        }
        Ok(())
    }
}
