//! Environment File Service
//!
//! Domain service that reads and writes the per-service .env file.
//! The .env file is the only durable record of port assignments, so a
//! service comes back on the same ports across agent restarts.

use crate::domain::constants::{ENV_EXAMPLE_FILE_NAME, ENV_FILE_NAME, PORT_LINE_MARKER};
use crate::domain::{DomainError, Manifest};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment File Service
///
/// Parses KEY=VALUE files with support for:
/// - Comments (lines starting with #)
/// - Empty lines (ignored)
/// - Quoted values (single or double quotes)
/// - Whitespace trimming
///
/// Writes touch only port lines; everything else in the file is kept
/// verbatim.
pub struct EnvFileService;

impl EnvFileService {
    /// The file reads come from: .env, falling back to .env.example
    fn read_path(dir: &Path) -> Option<PathBuf> {
        let env_path = dir.join(ENV_FILE_NAME);
        if env_path.exists() {
            return Some(env_path);
        }
        let example_path = dir.join(ENV_EXAMPLE_FILE_NAME);
        if example_path.exists() {
            return Some(example_path);
        }
        None
    }

    /// Read the service's persisted environment, empty when no file exists
    pub fn read(dir: &Path) -> Result<HashMap<String, String>, DomainError> {
        match Self::read_path(dir) {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    DomainError::Io(format!(
                        "Failed to read environment file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::parse_content(&path.display().to_string(), &contents)
            }
            None => Ok(HashMap::new()),
        }
    }

    /// Parse environment file content from a string
    ///
    /// Separated from file I/O to enable testing without a filesystem.
    pub fn parse_content(
        path: &str,
        content: &str,
    ) -> Result<HashMap<String, String>, DomainError> {
        let mut env_vars = HashMap::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                if key.is_empty() {
                    return Err(DomainError::EnvFileParse {
                        path: path.to_string(),
                        line: line_num + 1,
                        reason: "key cannot be empty".to_string(),
                    });
                }

                env_vars.insert(key.to_string(), Self::unquote_value(value));
            } else {
                return Err(DomainError::EnvFileParse {
                    path: path.to_string(),
                    line: line_num + 1,
                    reason: format!("expected KEY=VALUE format, got '{}'", line),
                });
            }
        }

        Ok(env_vars)
    }

    /// Persisted port numbers for the manifest's env_var-declared ports
    ///
    /// Values that do not parse as port numbers are skipped with a
    /// warning rather than failing the whole read.
    pub fn read_ports(dir: &Path, manifest: &Manifest) -> Result<BTreeMap<String, u16>, DomainError> {
        let env = Self::read(dir)?;
        let mut ports = BTreeMap::new();

        for (name, spec) in manifest.ports() {
            let var = match spec.env_var.as_deref() {
                Some(var) if !var.is_empty() => var,
                _ => continue,
            };
            if let Some(value) = env.get(var) {
                match value.parse::<u16>() {
                    Ok(port) => {
                        ports.insert(name.clone(), port);
                    }
                    Err(_) => {
                        warn!(
                            dir = %dir.display(),
                            var = var,
                            value = %value,
                            "Ignoring non-numeric port value in environment file"
                        );
                    }
                }
            }
        }

        Ok(ports)
    }

    /// Write assigned ports into .env, preserving unrelated lines
    ///
    /// A missing .env is seeded from .env.example so template variables
    /// survive the first allocation. Only ports with a manifest env_var
    /// are persisted.
    pub fn write_ports(
        dir: &Path,
        manifest: &Manifest,
        assignments: &BTreeMap<String, u16>,
    ) -> Result<(), DomainError> {
        let mut remaining: BTreeMap<String, u16> = BTreeMap::new();
        for (name, port) in assignments {
            if let Some(spec) = manifest.ports().get(name) {
                if let Some(var) = spec.env_var.as_deref() {
                    if !var.is_empty() {
                        remaining.insert(var.to_string(), *port);
                    }
                }
            }
        }
        if remaining.is_empty() {
            return Ok(());
        }

        let base = match Self::read_path(dir) {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                DomainError::Io(format!(
                    "Failed to read environment file '{}': {}",
                    path.display(),
                    e
                ))
            })?,
            None => String::new(),
        };

        let mut written: BTreeSet<String> = BTreeSet::new();
        let mut out_lines: Vec<String> = Vec::new();

        for line in base.lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                if let Some((key, _)) = trimmed.split_once('=') {
                    let key = key.trim();
                    if let Some(port) = remaining.remove(key) {
                        out_lines.push(format!("{}={}", key, port));
                        written.insert(key.to_string());
                        continue;
                    }
                    // Drop stale duplicates of a line we already rewrote
                    if written.contains(key) {
                        continue;
                    }
                }
            }
            out_lines.push(line.to_string());
        }

        if !remaining.is_empty() {
            if !out_lines.is_empty() {
                out_lines.push(String::new());
            }
            out_lines.push(PORT_LINE_MARKER.to_string());
            for (key, port) in &remaining {
                out_lines.push(format!("{}={}", key, port));
            }
        }

        let env_path = dir.join(ENV_FILE_NAME);
        let content = out_lines.join("\n") + "\n";
        std::fs::write(&env_path, content).map_err(|e| {
            DomainError::Io(format!(
                "Failed to write environment file '{}': {}",
                env_path.display(),
                e
            ))
        })
    }

    /// Remove surrounding quotes from a value if present
    fn unquote_value(value: &str) -> String {
        if (value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''))
        {
            if value.len() >= 2 {
                value[1..value.len() - 1].to_string()
            } else {
                String::new()
            }
        } else {
            value.to_string()
        }
    }
}
