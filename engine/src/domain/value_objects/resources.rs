//! Resource value objects
//! Machine utilization snapshots and the admission check

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::value_objects::manifest::ResourceNeeds;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuInfo {
    pub cores: u32,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskInfo {
    pub total_gb: f64,
    pub free_gb: f64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub vram_total_gb: f64,
    pub vram_free_gb: f64,
    pub vram_used_gb: f64,
    pub utilization_percent: f64,
    pub temperature_c: f64,
}

/// Point-in-time utilization of the whole machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub memory: MemoryInfo,
    pub cpu: CpuInfo,
    pub disk: DiskInfo,
    /// None when no GPU is present or the driver tooling is missing
    pub gpu: Option<GpuInfo>,
    pub sampled_at: u64,
}

impl ResourceSnapshot {
    /// Decide whether declared needs fit on this machine
    ///
    /// Reserves are held back from the available figures so a service
    /// cannot consume the headroom the machine itself depends on.
    pub fn admit(
        &self,
        needs: &ResourceNeeds,
        ram_reserve_gb: f64,
        vram_reserve_gb: f64,
    ) -> Result<()> {
        if needs.min_ram_gb > 0.0 {
            let available = (self.memory.available_gb - ram_reserve_gb).max(0.0);
            if needs.min_ram_gb > available {
                return Err(DomainError::InsufficientResources(format!(
                    "Insufficient RAM: {:.1}GB available, {:.1}GB required",
                    available, needs.min_ram_gb
                )));
            }
        }

        if needs.gpu_required || needs.min_vram_gb > 0.0 {
            let gpu = match self.gpu {
                Some(ref gpu) => gpu,
                None => {
                    return Err(DomainError::InsufficientResources(
                        "GPU required but not available".to_string(),
                    ))
                }
            };

            if needs.min_vram_gb > 0.0 {
                let available = (gpu.vram_free_gb - vram_reserve_gb).max(0.0);
                if needs.min_vram_gb > available {
                    return Err(DomainError::InsufficientResources(format!(
                        "Insufficient VRAM: {:.1}GB available, {:.1}GB required",
                        available, needs.min_vram_gb
                    )));
                }
            }
        }

        Ok(())
    }
}
