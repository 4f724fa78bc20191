//! Platform value objects
//! Machine platform detection and the per-machine port band table

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::constants::{FALLBACK_BAND_END, FALLBACK_BAND_START};

/// Operating system family the agent runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Macos,
    Linux,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Machine slot this platform maps to when the configured machine
    /// name is not one of the known slots
    pub fn default_slot(&self) -> &'static str {
        match self {
            Platform::Macos => "macos",
            Platform::Windows => "windows-1",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Macos => write!(f, "macos"),
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// Class of a named service port, derived from the port name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortClass {
    Api,
    Ui,
    Other,
}

impl PortClass {
    /// Classify a manifest port name
    pub fn from_port_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "api" => PortClass::Api,
            "ui" => PortClass::Ui,
            _ => PortClass::Other,
        }
    }
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortClass::Api => write!(f, "api"),
            PortClass::Ui => write!(f, "ui"),
            PortClass::Other => write!(f, "other"),
        }
    }
}

/// Inclusive port range allocations of one class are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBand {
    pub start: u16,
    pub end: u16,
}

impl PortBand {
    pub fn new(start: u16, end: u16) -> Self {
        PortBand { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Band assigned to a machine slot for a port class
    ///
    /// Each machine slot owns a disjoint slice of port space so that
    /// services land on distinct ports across the fleet. A machine name
    /// that is not a known slot uses its platform's default slot.
    pub fn for_machine(machine_name: &str, platform: Platform, class: PortClass) -> Self {
        if class == PortClass::Other {
            return PortBand::new(FALLBACK_BAND_START, FALLBACK_BAND_END);
        }

        let slot = match machine_name {
            "macos" | "windows-1" | "windows-2" | "linux" => machine_name,
            _ => platform.default_slot(),
        };

        match (slot, class) {
            ("macos", PortClass::Api) => PortBand::new(8100, 8199),
            ("macos", PortClass::Ui) => PortBand::new(7800, 7849),
            ("windows-1", PortClass::Api) => PortBand::new(8200, 8299),
            ("windows-1", PortClass::Ui) => PortBand::new(7850, 7899),
            ("windows-2", PortClass::Api) => PortBand::new(8300, 8399),
            ("windows-2", PortClass::Ui) => PortBand::new(7900, 7949),
            ("linux", PortClass::Api) => PortBand::new(8400, 8499),
            ("linux", PortClass::Ui) => PortBand::new(7950, 7999),
            _ => PortBand::new(FALLBACK_BAND_START, FALLBACK_BAND_END),
        }
    }
}

impl fmt::Display for PortBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Resolved bands for one machine, one per port class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBands {
    pub api: PortBand,
    pub ui: PortBand,
}

impl PortBands {
    pub fn for_machine(machine_name: &str, platform: Platform) -> Self {
        PortBands {
            api: PortBand::for_machine(machine_name, platform, PortClass::Api),
            ui: PortBand::for_machine(machine_name, platform, PortClass::Ui),
        }
    }

    pub fn band_for(&self, class: PortClass) -> PortBand {
        match class {
            PortClass::Api => self.api,
            PortClass::Ui => self.ui,
            PortClass::Other => PortBand::new(FALLBACK_BAND_START, FALLBACK_BAND_END),
        }
    }
}
