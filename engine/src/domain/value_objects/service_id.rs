//! ServiceId value object
//! Normalized identifier derived from a service folder name

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier a service is registered and addressed under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Wrap an identifier as-is (lookups, tests)
    pub fn new(id: impl Into<String>) -> Self {
        ServiceId(id.into())
    }

    /// Normalize a folder name into a service identifier
    ///
    /// Lowercases, maps anything outside [a-z0-9_-] to '_', collapses
    /// runs of '_' and strips leading and trailing separators.
    /// Returns None when nothing survives.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let mut out = String::with_capacity(raw.len());
        let mut last_was_underscore = false;

        for ch in raw.chars() {
            let ch = ch.to_ascii_lowercase();
            let mapped = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            };
            if mapped == '_' {
                if last_was_underscore {
                    continue;
                }
                last_was_underscore = true;
            } else {
                last_was_underscore = false;
            }
            out.push(mapped);
        }

        let trimmed = out.trim_matches(|c| c == '_' || c == '-');
        if trimmed.is_empty() {
            None
        } else {
            Some(ServiceId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
