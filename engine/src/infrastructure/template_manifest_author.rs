//! Template Manifest Author
//! Folder-inspecting implementation of the ManifestAuthor port
//!
//! Drafts a minimal valid manifest from what a service folder reveals
//! about itself. The port stays swappable for richer backends that
//! understand the service's code.

use crate::domain::constants::{
    DEFAULT_HEALTH_PATH, DEFAULT_SERVICE_PORT, DEFAULT_START_COMMAND, MANIFEST_SCHEMA_VERSION,
};
use crate::domain::ports::ManifestAuthor;
use crate::domain::value_objects::ServiceId;
use crate::domain::DomainError;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Drafts manifests from folder contents alone
pub struct TemplateManifestAuthor;

impl TemplateManifestAuthor {
    pub fn new() -> Self {
        Self
    }

    /// Entry script detection, in order of preference
    fn detect_start_command(location: &Path) -> String {
        for script in ["main.py", "app.py"] {
            if location.join(script).is_file() {
                return format!("python {}", script);
            }
        }
        DEFAULT_START_COMMAND.to_string()
    }

    /// First prose line of the README, if the folder has one
    fn extract_description(location: &Path) -> Option<String> {
        let text = std::fs::read_to_string(location.join("README.md")).ok()?;
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))?;
        let mut description: String = line.chars().take(200).collect();
        if description.len() < line.len() {
            description.push_str("...");
        }
        Some(description)
    }

    fn display_name(id: &ServiceId) -> String {
        id.as_str()
            .split(['_', '-'])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn port_env_var(id: &ServiceId) -> String {
        let mut var: String = id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        var.push_str("_PORT");
        var
    }

    fn yaml_quote(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl Default for TemplateManifestAuthor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestAuthor for TemplateManifestAuthor {
    async fn generate(&self, id: &ServiceId, location: &Path) -> Result<String, DomainError> {
        if !location.is_dir() {
            return Err(DomainError::Io(format!(
                "Service folder '{}' does not exist",
                location.display()
            )));
        }

        let start_command = Self::detect_start_command(location);
        let description = Self::extract_description(location)
            .unwrap_or_else(|| format!("{} service", Self::display_name(id)));
        debug!(
            service = %id,
            start_command = %start_command,
            "Drafted manifest from folder contents"
        );

        Ok(format!(
            r#"schema_version: "{schema}"
service:
  id: {id}
  name: {name}
  description: {description}
  version: "0.1.0"
runtime:
  start_command: {start_command}
  working_directory: "."
  ports:
    api:
      default: {port}
      env_var: {env_var}
      description: Primary HTTP port
endpoints:
  api:
    health_check: {health}
capabilities:
  operations: []
tags: []
"#,
            schema = MANIFEST_SCHEMA_VERSION,
            id = id.as_str(),
            name = Self::yaml_quote(&Self::display_name(id)),
            description = Self::yaml_quote(&description),
            start_command = Self::yaml_quote(&start_command),
            port = DEFAULT_SERVICE_PORT,
            env_var = Self::port_env_var(id),
            health = DEFAULT_HEALTH_PATH,
        ))
    }
}
