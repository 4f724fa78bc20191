//! Manifest value object
//! Parsed and validated CAPABILITY.yaml describing one service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::constants::{
    DEFAULT_HEALTH_PATH, DEFAULT_SERVICE_PORT, DEFAULT_START_COMMAND, MANIFEST_SCHEMA_VERSION,
};
use crate::domain::error::{DomainError, Result};

/// Identity block of a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
}

/// One named port a service listens on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSpec {
    /// Preferred port when the band has it free
    pub default: u16,
    /// Environment variable the assigned port is handed over in
    pub env_var: Option<String>,
    /// Command line flag alternative to the env var
    pub cli_arg: Option<String>,
    pub description: Option<String>,
}

impl Default for PortSpec {
    fn default() -> Self {
        PortSpec {
            default: DEFAULT_SERVICE_PORT,
            env_var: None,
            cli_arg: None,
            description: None,
        }
    }
}

/// Non-port environment variable a service expects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVarSpec {
    pub name: String,
    pub default: Option<String>,
}

/// How the service is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub start_command: String,
    pub working_directory: String,
    pub ports: BTreeMap<String, PortSpec>,
    pub environment: Vec<EnvVarSpec>,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        RuntimeSection {
            start_command: DEFAULT_START_COMMAND.to_string(),
            working_directory: ".".to_string(),
            ports: BTreeMap::new(),
            environment: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoint {
    pub health_check: Option<String>,
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiEndpoint {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsSection {
    pub api: Option<ApiEndpoint>,
    pub ui: Option<UiEndpoint>,
}

/// What the service can do, for fleet-level routing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesSection {
    pub operations: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Hardware the service declares it needs before admission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceNeeds {
    pub min_vram_gb: f64,
    pub min_ram_gb: f64,
    pub gpu_required: bool,
}

impl ResourceNeeds {
    /// True when the manifest asks for anything at all
    pub fn declares_needs(&self) -> bool {
        self.min_vram_gb > 0.0 || self.min_ram_gb > 0.0 || self.gpu_required
    }
}

/// Serde shape of CAPABILITY.yaml
///
/// Unknown fields are tolerated on parse; the original text is kept
/// alongside so they survive a round trip through the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestDoc {
    pub schema_version: Option<String>,
    pub service: ServiceSection,
    pub runtime: RuntimeSection,
    pub endpoints: EndpointsSection,
    pub capabilities: CapabilitiesSection,
    pub resources: ResourceNeeds,
    pub tags: Vec<String>,
}

/// A parsed manifest together with its original text
#[derive(Debug, Clone)]
pub struct Manifest {
    doc: ManifestDoc,
    raw: String,
}

impl Manifest {
    /// Parse and validate manifest text
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: ManifestDoc = serde_yaml::from_str(raw)
            .map_err(|e| DomainError::ManifestInvalid(format!("YAML parse error: {}", e)))?;

        let manifest = Manifest {
            doc,
            raw: raw.to_string(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref version) = self.doc.schema_version {
            if version != MANIFEST_SCHEMA_VERSION {
                return Err(DomainError::ManifestInvalid(format!(
                    "Unsupported schema_version '{}', expected '{}'",
                    version, MANIFEST_SCHEMA_VERSION
                )));
            }
        }

        if self.doc.runtime.start_command.trim().is_empty() {
            return Err(DomainError::ManifestInvalid(
                "runtime.start_command must not be empty".to_string(),
            ));
        }

        let has_env_var_port = self
            .doc
            .runtime
            .ports
            .values()
            .any(|p| p.env_var.as_deref().is_some_and(|v| !v.is_empty()));
        if !has_env_var_port {
            return Err(DomainError::ManifestInvalid(
                "runtime.ports must declare at least one port with an env_var".to_string(),
            ));
        }

        let health_check = self
            .doc
            .endpoints
            .api
            .as_ref()
            .and_then(|api| api.health_check.as_deref())
            .unwrap_or("");
        if health_check.is_empty() {
            return Err(DomainError::ManifestInvalid(
                "endpoints.api.health_check is required".to_string(),
            ));
        }

        if !self.doc.runtime.ports.contains_key("api") {
            return Err(DomainError::ManifestInvalid(
                "runtime.ports must declare an 'api' port for health checks".to_string(),
            ));
        }

        Ok(())
    }

    // ===== Accessors =====

    pub fn doc(&self) -> &ManifestDoc {
        &self.doc
    }

    /// Original text as found on disk
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Display name, falling back to the registry id
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.doc.service.name.is_empty() {
            fallback
        } else {
            &self.doc.service.name
        }
    }

    pub fn description(&self) -> &str {
        &self.doc.service.description
    }

    pub fn version(&self) -> &str {
        &self.doc.service.version
    }

    pub fn start_command(&self) -> &str {
        &self.doc.runtime.start_command
    }

    pub fn working_directory(&self) -> &str {
        &self.doc.runtime.working_directory
    }

    pub fn ports(&self) -> &BTreeMap<String, PortSpec> {
        &self.doc.runtime.ports
    }

    pub fn environment(&self) -> &[EnvVarSpec] {
        &self.doc.runtime.environment
    }

    pub fn health_check_path(&self) -> &str {
        self.doc
            .endpoints
            .api
            .as_ref()
            .and_then(|api| api.health_check.as_deref())
            .unwrap_or(DEFAULT_HEALTH_PATH)
    }

    pub fn resources(&self) -> &ResourceNeeds {
        &self.doc.resources
    }

    pub fn tags(&self) -> &[String] {
        &self.doc.tags
    }
}
