//! Machine Identity
//! Stable per-machine identity derived from the OS machine id
//!
//! The short id keys machine-specific config files and shows up in the
//! coordinator-facing discovery payload, so it must not change across
//! reboots. The OS machine id is the stable source; the hostname is the
//! fallback for hosts that lack one.

use crate::domain::value_objects::Platform;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Files consulted for the OS machine id, in order
const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Identity of the machine this agent runs on, computed once at startup
#[derive(Debug, Clone, Serialize)]
pub struct MachineIdentity {
    /// First 8 hex chars of the hashed machine id
    pub short_id: String,
    /// Full hash of the machine id source
    pub full_id: String,
    pub hostname: String,
    pub platform: Platform,
    /// Suffix for machine-specific config files, `{platform}-{short_id}`
    pub config_suffix: String,
}

impl MachineIdentity {
    pub fn detect() -> Self {
        let hostname = hostname();
        let source = os_machine_id().unwrap_or_else(|| {
            debug!("No OS machine id found, deriving identity from hostname");
            hostname.clone()
        });
        Self::from_source(&source, hostname, Platform::current())
    }

    fn from_source(source: &str, hostname: String, platform: Platform) -> Self {
        let full_id = hex::encode(Sha256::digest(source.trim().as_bytes()));
        let short_id = full_id[..8].to_string();
        let config_suffix = format!("{}-{}", platform, short_id);
        MachineIdentity {
            short_id,
            full_id,
            hostname,
            platform,
            config_suffix,
        }
    }
}

fn os_machine_id() -> Option<String> {
    for path in MACHINE_ID_PATHS {
        if let Ok(text) = std::fs::read_to_string(path) {
            let id = text.trim().to_string();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }
    None
}

#[cfg(unix)]
fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc == 0 {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        if let Ok(name) = std::str::from_utf8(&buf[..end]) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    fallback_hostname()
}

#[cfg(not(unix))]
fn hostname() -> String {
    fallback_hostname()
}

fn fallback_hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}
