//! Service Lifecycle Service
//! Start, stop and restart orchestration with readiness gating

use crate::domain::constants::{
    DEFAULT_GPU_VRAM_RESERVE_GB, DEFAULT_HEALTH_TIMEOUT_SEC, DEFAULT_KILL_WAIT_SEC,
    DEFAULT_RAM_RESERVE_GB, DEFAULT_READINESS_WINDOW_SEC, DEFAULT_STARTUP_POLL_INTERVAL_MS,
    DEFAULT_STOP_GRACE_SEC, RESTART_SETTLE_MS,
};
use crate::domain::entities::ServiceRecord;
use crate::domain::ports::{
    ExitHandle, HealthProber, LaunchSpec, LogBuffer, ProbeOutcome, ProcessLauncher,
    ResourceSampler, ServiceRepository, StopOutcome,
};
use crate::domain::services::{EnvFileService, ExitWatchService, OperationGate, PortAllocatorService};
use crate::domain::value_objects::{HealthVerdict, Manifest, ServiceId, ServiceState};
use crate::domain::{DomainError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timing knobs for lifecycle operations
///
/// All deployment-dependent; the defaults suit interpreter-launched
/// model services that take a while to load weights.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub readiness_window_sec: u64,
    pub startup_poll_interval_ms: u64,
    pub stop_grace_sec: u64,
    pub kill_wait_sec: u64,
    pub health_timeout_sec: u64,
    pub ram_reserve_gb: f64,
    pub vram_reserve_gb: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            readiness_window_sec: DEFAULT_READINESS_WINDOW_SEC,
            startup_poll_interval_ms: DEFAULT_STARTUP_POLL_INTERVAL_MS,
            stop_grace_sec: DEFAULT_STOP_GRACE_SEC,
            kill_wait_sec: DEFAULT_KILL_WAIT_SEC,
            health_timeout_sec: DEFAULT_HEALTH_TIMEOUT_SEC,
            ram_reserve_gb: DEFAULT_RAM_RESERVE_GB,
            vram_reserve_gb: DEFAULT_GPU_VRAM_RESERVE_GB,
        }
    }
}

/// Caller-supplied knobs for one start request
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Explicit ports per logical name, tried before anything persisted
    pub port_overrides: BTreeMap<String, u16>,
    /// Extra environment entries, overriding manifest defaults
    pub env_overrides: Vec<(String, String)>,
    /// Plan in-band ports automatically instead of trusting defaults
    pub auto_ports: bool,
}

/// What the readiness wait observed before the window closed
enum ReadinessSignal {
    Up,
    Exited(i32),
}

/// Orchestrates the full service lifecycle
///
/// Single writer for lifecycle state transitions. Operations on one
/// service are serialized through the gate, operations on different
/// services proceed in parallel. A record is only ever saved in a
/// consistent shape: `starting` always carries a pid, terminal states
/// never carry ports.
pub struct LifecycleService {
    repository: Arc<dyn ServiceRepository>,
    launcher: Arc<dyn ProcessLauncher>,
    prober: Arc<dyn HealthProber>,
    sampler: Arc<dyn ResourceSampler>,
    allocator: Arc<PortAllocatorService>,
    exit_watch: Arc<ExitWatchService>,
    gate: Arc<OperationGate>,
    config: LifecycleConfig,
    /// Retained across stop and crash so operators can read the last
    /// lines of a dead service
    log_buffers: Mutex<HashMap<ServiceId, LogBuffer>>,
}

impl LifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        launcher: Arc<dyn ProcessLauncher>,
        prober: Arc<dyn HealthProber>,
        sampler: Arc<dyn ResourceSampler>,
        allocator: Arc<PortAllocatorService>,
        exit_watch: Arc<ExitWatchService>,
        gate: Arc<OperationGate>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repository,
            launcher,
            prober,
            sampler,
            allocator,
            exit_watch,
            gate,
            config,
            log_buffers: Mutex::new(HashMap::new()),
        }
    }

    // ===== Start =====

    /// Start a service and wait for it to become ready
    ///
    /// Returns the running record, or a structured failure with every
    /// reserved resource already released.
    pub async fn start(&self, id: &ServiceId, options: StartOptions) -> Result<ServiceRecord> {
        let _permit = self.gate.acquire(id)?;
        self.start_locked(id, options).await
    }

    async fn start_locked(&self, id: &ServiceId, options: StartOptions) -> Result<ServiceRecord> {
        let mut record = self.repository.get(id).await?;
        let manifest = match record.manifest() {
            Some(manifest) => manifest.clone(),
            None => return Err(DomainError::ManifestMissing(id.to_string())),
        };
        if !record.state().can_start() {
            return Err(DomainError::InvalidStateTransition {
                from: record.state().to_string(),
                to: "starting".to_string(),
            });
        }

        // Admission control runs only when the manifest declares needs;
        // the engine does not invent capacity limits on its own
        if manifest.resources().declares_needs() {
            let snapshot = self.sampler.sample().await?;
            snapshot.admit(
                manifest.resources(),
                self.config.ram_reserve_gb,
                self.config.vram_reserve_gb,
            )?;
        }

        let persisted = match EnvFileService::read_ports(record.location(), &manifest) {
            Ok(ports) => ports,
            Err(e) => {
                warn!(service = %id, error = %e, "Could not read persisted ports, ignoring them");
                BTreeMap::new()
            }
        };

        let mut overrides = if options.auto_ports {
            self.allocator.plan_auto_ports(&manifest)
        } else {
            BTreeMap::new()
        };
        overrides.extend(options.port_overrides.clone());

        let ports = self.allocator.allocate(id, &manifest, &overrides, &persisted)?;

        // Persist before launch so the assignment survives even if the
        // agent dies mid-start
        if let Err(e) = EnvFileService::write_ports(record.location(), &manifest, &ports) {
            self.allocator.release(id);
            return Err(e);
        }

        let spec = self.build_launch_spec(&record, &manifest, &ports, &options.env_overrides);
        info!(
            service = %id,
            command = %spec.command,
            ports = ?ports,
            "Starting service"
        );

        record.mark_starting(ports)?;
        let launched = match self.launcher.spawn(spec).await {
            Ok(launched) => launched,
            Err(e) => {
                warn!(service = %id, error = %e, "Launch failed");
                record.mark_failed(e.to_string())?;
                self.allocator.release(id);
                self.repository.save(record).await?;
                return Err(e);
            }
        };

        record.record_spawned(launched.pid);
        self.repository.save(record.clone()).await?;
        self.log_buffers
            .lock()
            .unwrap()
            .insert(id.clone(), launched.logs.clone());
        debug!(service = %id, pid = launched.pid, "Process launched, waiting for readiness");

        self.await_readiness(id, record, &manifest, launched.pid, launched.exit)
            .await
    }

    /// Poll the health endpoint until first success, watching for an
    /// early exit the whole time
    async fn wait_until_ready(&self, url: &str, exit: &mut ExitHandle) -> ReadinessSignal {
        let poll = Duration::from_millis(self.config.startup_poll_interval_ms);
        loop {
            tokio::select! {
                code = exit.as_mut() => {
                    return ReadinessSignal::Exited(code.unwrap_or(-1));
                }
                outcome = self.prober.probe(url, poll) => {
                    if matches!(outcome, ProbeOutcome::Up { .. }) {
                        return ReadinessSignal::Up;
                    }
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }

    async fn await_readiness(
        &self,
        id: &ServiceId,
        mut record: ServiceRecord,
        manifest: &Manifest,
        pid: u32,
        mut exit: ExitHandle,
    ) -> Result<ServiceRecord> {
        let window = Duration::from_secs(self.config.readiness_window_sec);
        let url = match record.assigned_ports().get("api") {
            Some(port) => health_url(*port, manifest.health_check_path()),
            None => {
                // Manifest validation guarantees an api port, so this
                // only fires on a logic regression
                return Err(DomainError::InvalidConfiguration(format!(
                    "service '{}' has no assigned api port",
                    id
                )));
            }
        };

        match tokio::time::timeout(window, self.wait_until_ready(&url, &mut exit)).await {
            Ok(ReadinessSignal::Up) => {
                record.mark_running()?;
                self.repository.save(record.clone()).await?;
                self.exit_watch.watch(id.clone(), pid, exit);
                info!(service = %id, pid = pid, "Service is running");
                Ok(record)
            }
            Ok(ReadinessSignal::Exited(code)) => {
                let reason = format!("process exited during startup with code {}", code);
                warn!(service = %id, pid = pid, exit_code = code, "Service died during startup");
                record.mark_failed(reason.clone())?;
                self.allocator.release(id);
                self.repository.save(record).await?;
                Err(DomainError::LaunchFailed(reason))
            }
            Err(_) => {
                warn!(
                    service = %id,
                    pid = pid,
                    window_sec = self.config.readiness_window_sec,
                    "Service did not become ready, killing process"
                );
                if let Err(e) = self.launcher.force_kill(pid).await {
                    warn!(service = %id, pid = pid, error = %e, "Force kill failed");
                }
                // Bounded reap so the next start cannot race the corpse
                let _ = tokio::time::timeout(
                    Duration::from_secs(self.config.kill_wait_sec),
                    exit.as_mut(),
                )
                .await;
                record.mark_failed(format!(
                    "service did not become ready within {}s",
                    self.config.readiness_window_sec
                ))?;
                self.allocator.release(id);
                self.repository.save(record).await?;
                Err(DomainError::ReadinessTimeout(
                    self.config.readiness_window_sec,
                ))
            }
        }
    }

    fn build_launch_spec(
        &self,
        record: &ServiceRecord,
        manifest: &Manifest,
        ports: &BTreeMap<String, u16>,
        env_overrides: &[(String, String)],
    ) -> LaunchSpec {
        let mut env: BTreeMap<String, String> = BTreeMap::new();

        // Manifest-declared variables use their defaults unless the
        // parent environment already provides them
        for var in manifest.environment() {
            if std::env::var(&var.name).is_ok() {
                continue;
            }
            if let Some(default) = &var.default {
                env.insert(var.name.clone(), default.clone());
            }
        }

        // Assigned ports, keyed by their declared variable names
        let mut command = manifest.start_command().to_string();
        for (name, port) in ports {
            if let Some(spec) = manifest.ports().get(name) {
                if let Some(var) = spec.env_var.as_deref() {
                    if !var.is_empty() {
                        env.insert(var.to_string(), port.to_string());
                    }
                }
                if let Some(flag) = spec.cli_arg.as_deref() {
                    if !flag.is_empty() {
                        command.push_str(&format!(" {} {}", flag, port));
                    }
                }
            }
        }

        // Caller overrides win over both
        for (key, value) in env_overrides {
            env.insert(key.clone(), value.clone());
        }

        let wd = manifest.working_directory();
        let working_dir = if wd == "." {
            record.location().to_path_buf()
        } else {
            record.location().join(wd)
        };

        LaunchSpec {
            command,
            working_dir,
            env: env.into_iter().collect(),
        }
    }

    // ===== Stop =====

    /// Stop a running service, escalating to SIGKILL after the grace
    /// period
    ///
    /// Idempotent: stopping a service that is not running reports the
    /// current record with `AlreadyExited` and touches nothing.
    pub async fn stop(&self, id: &ServiceId) -> Result<(ServiceRecord, StopOutcome)> {
        let _permit = self.gate.acquire(id)?;
        self.stop_locked(id).await
    }

    async fn stop_locked(&self, id: &ServiceId) -> Result<(ServiceRecord, StopOutcome)> {
        let mut record = self.repository.get(id).await?;
        if record.state() != ServiceState::Running {
            debug!(service = %id, state = %record.state(), "Stop requested while not running");
            return Ok((record, StopOutcome::AlreadyExited));
        }

        record.mark_stopping()?;
        self.repository.save(record.clone()).await?;

        // A stop must always end in stopped, even when the launcher
        // cannot say what happened to the process
        let outcome = match record.pid() {
            Some(pid) => match self
                .launcher
                .terminate(
                    pid,
                    Duration::from_secs(self.config.stop_grace_sec),
                    Duration::from_secs(self.config.kill_wait_sec),
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(service = %id, pid = pid, error = %e, "Terminate failed, treating process as gone");
                    StopOutcome::AlreadyExited
                }
            },
            None => StopOutcome::AlreadyExited,
        };

        record.mark_stopped()?;
        self.allocator.release(id);
        self.repository.save(record.clone()).await?;
        info!(service = %id, outcome = %outcome, "Service stopped");
        Ok((record, outcome))
    }

    /// Stop every running service, used at agent shutdown
    pub async fn stop_all(&self) -> usize {
        let records = match self.repository.find_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Could not list services for shutdown");
                return 0;
            }
        };

        let mut stopped = 0;
        for record in records {
            if record.state() != ServiceState::Running {
                continue;
            }
            match self.stop(record.id()).await {
                Ok(_) => stopped += 1,
                Err(e) => {
                    warn!(service = %record.id(), error = %e, "Failed to stop service during shutdown")
                }
            }
        }
        stopped
    }

    // ===== Restart =====

    /// Stop-then-start under a single serialization permit
    ///
    /// The restarted service keeps its previous ports unless the caller
    /// overrides them explicitly.
    pub async fn restart(&self, id: &ServiceId, options: StartOptions) -> Result<ServiceRecord> {
        let _permit = self.gate.acquire(id)?;

        let record = self.repository.get(id).await?;
        let previous_ports = record.assigned_ports().clone();

        if record.state() == ServiceState::Running {
            self.stop_locked(id).await?;
            // Let the old listener's socket drain before rebinding
            tokio::time::sleep(Duration::from_millis(RESTART_SETTLE_MS)).await;
        }

        let mut options = options;
        if options.port_overrides.is_empty() && !previous_ports.is_empty() {
            options.port_overrides = previous_ports;
        }
        self.start_locked(id, options).await
    }

    // ===== Health =====

    /// Probe a service's health endpoint and record the verdict
    ///
    /// Never changes lifecycle state; a failing check while running is
    /// information for operators, not a trigger.
    pub async fn check_health(&self, id: &ServiceId) -> Result<HealthVerdict> {
        let record = self.repository.get(id).await?;

        let verdict = match (
            record.state(),
            record.assigned_ports().get("api"),
            record.manifest(),
        ) {
            (ServiceState::Running, Some(port), Some(manifest)) => {
                let url = health_url(*port, manifest.health_check_path());
                let outcome = self
                    .prober
                    .probe(&url, Duration::from_secs(self.config.health_timeout_sec))
                    .await;
                classify(outcome)
            }
            _ => HealthVerdict::unknown("service is not running"),
        };

        self.repository.update_health(id, verdict.clone()).await?;
        Ok(verdict)
    }

    // ===== Logs =====

    /// Last `lines` captured output lines, oldest first
    ///
    /// Empty when the service never launched in this agent's lifetime.
    pub fn log_tail(&self, id: &ServiceId, lines: usize) -> Vec<String> {
        self.log_buffers
            .lock()
            .unwrap()
            .get(id)
            .map(|logs| logs.tail(lines))
            .unwrap_or_default()
    }

    /// Forget a removed service's log buffer
    pub fn drop_logs(&self, id: &ServiceId) {
        self.log_buffers.lock().unwrap().remove(id);
    }
}

fn health_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

fn classify(outcome: ProbeOutcome) -> HealthVerdict {
    match outcome {
        ProbeOutcome::Up { latency_ms } => HealthVerdict::healthy(latency_ms),
        ProbeOutcome::HttpError { status } => HealthVerdict::unhealthy(format!("HTTP {}", status)),
        ProbeOutcome::Timeout => HealthVerdict::unhealthy("timeout"),
        ProbeOutcome::ConnectionRefused => HealthVerdict::unhealthy("connection refused"),
        ProbeOutcome::Failed(reason) => HealthVerdict::unhealthy(reason),
    }
}
