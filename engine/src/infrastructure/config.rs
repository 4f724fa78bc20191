//! Agent configuration from YAML
//!
//! Every section is optional and defaulted, so an empty (or absent) file
//! yields a fully working agent. Machine-specific files are found through
//! a fixed search order keyed on the machine identity, and a handful of
//! environment variables override the file for fleet-wide rollouts.

use crate::domain::services::LifecycleConfig;
use crate::domain::value_objects::{Platform, PortBand, PortBands};
use crate::domain::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::machine_identity::MachineIdentity;

const DEFAULT_AGENT_PORT: u16 = 9100;
const DEFAULT_AGENT_HOST: &str = "0.0.0.0";
const DEFAULT_LOG_LEVEL: &str = "info";
/// Directory under the home directory searched after the working directory
const HOME_CONFIG_DIR: &str = ".svc_agent";

/// Top-level agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub machine: MachineSection,

    #[serde(default)]
    pub port_ranges: PortRangesSection,

    #[serde(default)]
    pub resources: ResourcesSection,

    #[serde(default)]
    pub health_check: HealthCheckSection,

    #[serde(default)]
    pub lifecycle: LifecycleSection,

    #[serde(default)]
    pub services: ServicesSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_port")]
    pub port: u16,

    #[serde(default = "default_agent_host")]
    pub host: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineSection {
    /// Stable machine id; defaults to `{hostname}-{short_id}`
    #[serde(default)]
    pub id: Option<String>,

    /// Machine slot name used for port band selection
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRangesSection {
    #[serde(default)]
    pub api_start: Option<u16>,

    #[serde(default)]
    pub api_end: Option<u16>,

    #[serde(default)]
    pub ui_start: Option<u16>,

    #[serde(default)]
    pub ui_end: Option<u16>,

    #[serde(default = "default_true")]
    pub auto_resolve_conflicts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesSection {
    #[serde(default = "default_vram_reserve")]
    pub gpu_vram_reserve_gb: f64,

    #[serde(default = "default_ram_reserve")]
    pub ram_reserve_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_health_interval")]
    pub interval_seconds: u64,

    #[serde(default = "default_health_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSection {
    #[serde(default = "default_readiness_window")]
    pub readiness_window_seconds: u64,

    #[serde(default = "default_startup_poll_interval")]
    pub startup_poll_interval_ms: u64,

    #[serde(default = "default_stop_grace")]
    pub stop_grace_seconds: u64,

    #[serde(default = "default_kill_wait")]
    pub kill_wait_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesSection {
    /// Root folders scanned for service candidates
    #[serde(default)]
    pub folders: Vec<PathBuf>,

    /// Service ids started automatically at daemon boot
    #[serde(default)]
    pub always_running: Vec<String>,
}

fn default_agent_port() -> u16 {
    DEFAULT_AGENT_PORT
}

fn default_agent_host() -> String {
    DEFAULT_AGENT_HOST.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_vram_reserve() -> f64 {
    crate::domain::constants::DEFAULT_GPU_VRAM_RESERVE_GB
}

fn default_ram_reserve() -> f64 {
    crate::domain::constants::DEFAULT_RAM_RESERVE_GB
}

fn default_health_interval() -> u64 {
    crate::domain::constants::DEFAULT_HEALTH_INTERVAL_SEC
}

fn default_health_timeout() -> u64 {
    crate::domain::constants::DEFAULT_HEALTH_TIMEOUT_SEC
}

fn default_readiness_window() -> u64 {
    crate::domain::constants::DEFAULT_READINESS_WINDOW_SEC
}

fn default_startup_poll_interval() -> u64 {
    crate::domain::constants::DEFAULT_STARTUP_POLL_INTERVAL_MS
}

fn default_stop_grace() -> u64 {
    crate::domain::constants::DEFAULT_STOP_GRACE_SEC
}

fn default_kill_wait() -> u64 {
    crate::domain::constants::DEFAULT_KILL_WAIT_SEC
}

impl Default for AgentSection {
    fn default() -> Self {
        AgentSection {
            port: default_agent_port(),
            host: default_agent_host(),
            log_level: default_log_level(),
        }
    }
}

impl Default for PortRangesSection {
    fn default() -> Self {
        PortRangesSection {
            api_start: None,
            api_end: None,
            ui_start: None,
            ui_end: None,
            auto_resolve_conflicts: default_true(),
        }
    }
}

impl Default for ResourcesSection {
    fn default() -> Self {
        ResourcesSection {
            gpu_vram_reserve_gb: default_vram_reserve(),
            ram_reserve_gb: default_ram_reserve(),
        }
    }
}

impl Default for HealthCheckSection {
    fn default() -> Self {
        HealthCheckSection {
            enabled: default_true(),
            interval_seconds: default_health_interval(),
            timeout_seconds: default_health_timeout(),
        }
    }
}

impl Default for LifecycleSection {
    fn default() -> Self {
        LifecycleSection {
            readiness_window_seconds: default_readiness_window(),
            startup_poll_interval_ms: default_startup_poll_interval(),
            stop_grace_seconds: default_stop_grace(),
            kill_wait_seconds: default_kill_wait(),
        }
    }
}

impl AgentConfig {
    /// Parse a single YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&contents).map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "Failed to parse YAML from '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Candidate config paths in precedence order for this machine
    ///
    /// The working directory is searched before the home directory, and
    /// within each the machine-specific file wins over the platform file
    /// which wins over the generic one.
    pub fn search_paths(identity: &MachineIdentity) -> Vec<PathBuf> {
        let names = [
            format!("config.{}.yaml", identity.short_id),
            format!("config-{}.yaml", identity.platform),
            "config.yaml".to_string(),
        ];

        let mut paths: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        if let Some(home) = home_dir() {
            let base = home.join(HOME_CONFIG_DIR);
            paths.extend(names.iter().map(|name| base.join(name)));
        }
        paths
    }

    /// Load configuration for this machine
    ///
    /// An explicit path must exist and parse; otherwise the search order
    /// applies and a miss on every candidate yields the built-in defaults.
    /// Environment overrides are applied last either way.
    pub fn discover(explicit: Option<&Path>, identity: &MachineIdentity) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                let config = Self::load(path)?;
                info!(path = %path.display(), "Loaded agent config");
                config
            }
            None => match Self::search_paths(identity).iter().find(|p| p.is_file()) {
                Some(path) => {
                    let config = Self::load(path)?;
                    info!(path = %path.display(), "Loaded agent config");
                    config
                }
                None => {
                    info!("No agent config file found, using defaults");
                    AgentConfig::default()
                }
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables override the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = env::var("SVC_AGENT_MACHINE_ID") {
            self.machine.id = Some(id);
        }
        if let Ok(name) = env::var("SVC_AGENT_MACHINE_NAME") {
            self.machine.name = Some(name);
        }
        if let Ok(host) = env::var("SVC_AGENT_HOST") {
            self.agent.host = host;
        }
        if let Ok(port) = env::var("SVC_AGENT_PORT") {
            match port.parse() {
                Ok(port) => self.agent.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid SVC_AGENT_PORT"),
            }
        }
        if let Ok(level) = env::var("SVC_AGENT_LOG_LEVEL") {
            self.agent.log_level = level;
        }
    }

    /// Effective machine id, `{hostname}-{short_id}` when unconfigured
    pub fn machine_id(&self, identity: &MachineIdentity) -> String {
        self.machine
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", identity.hostname, identity.short_id))
    }

    /// Effective machine slot name for port band selection
    pub fn machine_name(&self, identity: &MachineIdentity) -> String {
        self.machine
            .name
            .clone()
            .unwrap_or_else(|| identity.platform.default_slot().to_string())
    }

    /// Resolved port bands: explicit ranges win, the platform table fills
    /// whatever the config leaves out
    pub fn port_bands(&self, machine_name: &str, platform: Platform) -> PortBands {
        let defaults = PortBands::for_machine(machine_name, platform);
        let api = match (self.port_ranges.api_start, self.port_ranges.api_end) {
            (Some(start), Some(end)) => PortBand::new(start, end),
            _ => defaults.api,
        };
        let ui = match (self.port_ranges.ui_start, self.port_ranges.ui_end) {
            (Some(start), Some(end)) => PortBand::new(start, end),
            _ => defaults.ui,
        };
        PortBands { api, ui }
    }

    /// Lifecycle timing and admission reserves for the domain layer
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            readiness_window_sec: self.lifecycle.readiness_window_seconds,
            startup_poll_interval_ms: self.lifecycle.startup_poll_interval_ms,
            stop_grace_sec: self.lifecycle.stop_grace_seconds,
            kill_wait_sec: self.lifecycle.kill_wait_seconds,
            health_timeout_sec: self.health_check.timeout_seconds,
            ram_reserve_gb: self.resources.ram_reserve_gb,
            vram_reserve_gb: self.resources.gpu_vram_reserve_gb,
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
