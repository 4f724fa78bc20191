//! Proc Resource Sampler
//! Machine utilization snapshots from procfs, statvfs and nvidia-smi
//!
//! Every probe degrades independently: a missing GPU, an unreadable
//! procfs entry or a non-Linux host yields zeroed figures rather than a
//! failed sample, because admission checks only reject on declared
//! needs and the status surface should keep reporting what it can.

use crate::domain::ports::ResourceSampler;
use crate::domain::value_objects::{
    epoch_secs, CpuInfo, DiskInfo, GpuInfo, MemoryInfo, ResourceSnapshot,
};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const KB_PER_GB: f64 = 1024.0 * 1024.0;
const MIB_PER_GB: f64 = 1024.0;
/// Window between the two /proc/stat reads behind the CPU figure
const CPU_SAMPLE_WINDOW_MS: u64 = 200;

/// Samples machine utilization with OS-level tooling
pub struct ProcResourceSampler {
    disk_root: PathBuf,
}

impl ProcResourceSampler {
    pub fn new() -> Self {
        Self {
            disk_root: PathBuf::from("/"),
        }
    }

    #[cfg(test)]
    fn with_disk_root(disk_root: impl Into<PathBuf>) -> Self {
        Self {
            disk_root: disk_root.into(),
        }
    }

    fn sample_memory() -> MemoryInfo {
        let text = match std::fs::read_to_string("/proc/meminfo") {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Could not read /proc/meminfo");
                return MemoryInfo::default();
            }
        };
        Self::parse_meminfo(&text)
    }

    fn parse_meminfo(text: &str) -> MemoryInfo {
        let mut total_kb = 0.0;
        let mut available_kb = 0.0;
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("MemTotal:"), Some(value)) => {
                    total_kb = value.parse().unwrap_or(0.0);
                }
                (Some("MemAvailable:"), Some(value)) => {
                    available_kb = value.parse().unwrap_or(0.0);
                }
                _ => {}
            }
        }
        let total_gb = total_kb / KB_PER_GB;
        let available_gb = available_kb / KB_PER_GB;
        let used_percent = if total_kb > 0.0 {
            (total_kb - available_kb) / total_kb * 100.0
        } else {
            0.0
        };
        MemoryInfo {
            total_gb,
            available_gb,
            used_percent,
        }
    }

    fn sample_cpu() -> CpuInfo {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(0);
        let used_percent = match (Self::read_cpu_times(), {
            std::thread::sleep(Duration::from_millis(CPU_SAMPLE_WINDOW_MS));
            Self::read_cpu_times()
        }) {
            (Some(before), Some(after)) => Self::cpu_usage_between(before, after),
            _ => 0.0,
        };
        CpuInfo {
            cores,
            used_percent,
        }
    }

    /// (idle, total) jiffies from the aggregate cpu line
    fn read_cpu_times() -> Option<(u64, u64)> {
        let text = std::fs::read_to_string("/proc/stat").ok()?;
        let line = text.lines().find(|line| line.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|field| field.parse().ok())
            .collect();
        if fields.len() < 5 {
            return None;
        }
        // idle + iowait count as idle time
        let idle = fields[3] + fields[4];
        let total = fields.iter().sum();
        Some((idle, total))
    }

    fn cpu_usage_between(before: (u64, u64), after: (u64, u64)) -> f64 {
        let idle_delta = after.0.saturating_sub(before.0) as f64;
        let total_delta = after.1.saturating_sub(before.1) as f64;
        if total_delta <= 0.0 {
            return 0.0;
        }
        ((total_delta - idle_delta) / total_delta * 100.0).clamp(0.0, 100.0)
    }

    #[cfg(unix)]
    fn sample_disk(root: &std::path::Path) -> DiskInfo {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let path = match CString::new(root.as_os_str().as_bytes()) {
            Ok(path) => path,
            Err(_) => return DiskInfo::default(),
        };
        let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
        if unsafe { libc::statvfs(path.as_ptr(), &mut stats) } != 0 {
            debug!(
                root = %root.display(),
                error = %std::io::Error::last_os_error(),
                "statvfs failed"
            );
            return DiskInfo::default();
        }

        let block = stats.f_frsize as f64;
        let total_gb = stats.f_blocks as f64 * block / BYTES_PER_GB;
        let free_gb = stats.f_bavail as f64 * block / BYTES_PER_GB;
        let used_percent = if total_gb > 0.0 {
            (total_gb - free_gb) / total_gb * 100.0
        } else {
            0.0
        };
        DiskInfo {
            total_gb,
            free_gb,
            used_percent,
        }
    }

    #[cfg(not(unix))]
    fn sample_disk(_root: &std::path::Path) -> DiskInfo {
        DiskInfo::default()
    }

    fn sample_gpu() -> Option<GpuInfo> {
        let output = std::process::Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,memory.used,memory.free,utilization.gpu,temperature.gpu",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(status = ?output.status.code(), "nvidia-smi exited non-zero");
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Self::parse_nvidia_smi(&text)
    }

    /// Parse the first GPU row of nounits CSV output
    fn parse_nvidia_smi(text: &str) -> Option<GpuInfo> {
        let line = text.lines().find(|line| !line.trim().is_empty())?;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 6 {
            return None;
        }
        let mib = |field: &str| field.parse::<f64>().ok();
        let vram_total_gb = mib(fields[1])? / MIB_PER_GB;
        let vram_used_gb = mib(fields[2])? / MIB_PER_GB;
        let vram_free_gb = mib(fields[3])? / MIB_PER_GB;
        Some(GpuInfo {
            name: fields[0].to_string(),
            vram_total_gb,
            vram_free_gb,
            vram_used_gb,
            utilization_percent: fields[4].parse().unwrap_or(0.0),
            temperature_c: fields[5].parse().unwrap_or(0.0),
        })
    }

    fn sample_blocking(disk_root: &std::path::Path) -> ResourceSnapshot {
        ResourceSnapshot {
            memory: Self::sample_memory(),
            cpu: Self::sample_cpu(),
            disk: Self::sample_disk(disk_root),
            gpu: Self::sample_gpu(),
            sampled_at: epoch_secs(),
        }
    }
}

impl Default for ProcResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceSampler for ProcResourceSampler {
    async fn sample(&self) -> Result<ResourceSnapshot, DomainError> {
        let disk_root = self.disk_root.clone();
        tokio::task::spawn_blocking(move || Self::sample_blocking(&disk_root))
            .await
            .map_err(|e| DomainError::Io(format!("Resource sampling task failed: {}", e)))
    }
}
