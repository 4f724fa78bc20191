//! Application composition root
//! Central wiring of ports, domain services and use cases (Dependency Injection container)

use crate::domain::ports::{
    HealthProber, ManifestAuthor, PortScanner, ProcessLauncher, ResourceSampler,
    ServiceDiscovery, ServiceRepository,
};
use crate::domain::services::{
    ExitWatchService, HealthWatchService, LifecycleService, ManifestStoreService, OperationGate,
    PortAllocatorService, PortConflictService, ScanService,
};
use crate::domain::use_cases::{
    GetServiceStatus, GetServiceStatusUseCase, ListServices, ListServicesUseCase, RefreshManifest,
    RefreshManifestUseCase, ResolveConflicts, ResolveConflictsUseCase, RestartService,
    RestartServiceUseCase, ScanServices, ScanServicesUseCase, StartService, StartServiceUseCase,
    StopService, StopServiceUseCase,
};
use crate::domain::{epoch_secs, PortBands};
use crate::infrastructure::{
    AgentConfig, FsServiceDiscovery, HttpHealthProber, InMemoryServiceRepository, MachineIdentity,
    ProcResourceSampler, TcpPortScanner, TemplateManifestAuthor, TokioProcessLauncher,
};
use std::sync::Arc;

/// Everything one running agent is made of
///
/// This is the composition root where dependencies are wired together.
/// Adapters hold an `Arc<Application>` and reach use cases and the
/// shared domain services through the getters; nothing outside this
/// struct constructs domain services directly.
pub struct Application {
    // Command use cases (modify state)
    start_service: Arc<dyn StartService>,
    stop_service: Arc<dyn StopService>,
    restart_service: Arc<dyn RestartService>,
    scan_services: Arc<dyn ScanServices>,
    refresh_manifest: Arc<dyn RefreshManifest>,
    resolve_conflicts: Arc<dyn ResolveConflicts>,

    // Query use cases (read state)
    list_services: Arc<dyn ListServices>,
    get_service_status: Arc<dyn GetServiceStatus>,

    // Domain services (exposed for adapters and background loops)
    lifecycle: Arc<LifecycleService>,
    conflicts: Arc<PortConflictService>,
    allocator: Arc<PortAllocatorService>,
    health_watch: Arc<HealthWatchService>,
    repository: Arc<dyn ServiceRepository>,
    sampler: Arc<dyn ResourceSampler>,

    // Agent-level facts reported on the status surface
    config: AgentConfig,
    identity: MachineIdentity,
    machine_id: String,
    machine_name: String,
    run_id: String,
    started_at: u64,
}

impl Application {
    /// Wire the agent from explicit port implementations
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AgentConfig,
        identity: MachineIdentity,
        repository: Arc<dyn ServiceRepository>,
        launcher: Arc<dyn ProcessLauncher>,
        prober: Arc<dyn HealthProber>,
        scanner: Arc<dyn PortScanner>,
        sampler: Arc<dyn ResourceSampler>,
        discovery: Arc<dyn ServiceDiscovery>,
        author: Arc<dyn ManifestAuthor>,
    ) -> Self {
        let machine_id = config.machine_id(&identity);
        let machine_name = config.machine_name(&identity);
        let bands: PortBands = config.port_bands(&machine_name, identity.platform);

        // Wire up domain services
        let allocator = Arc::new(PortAllocatorService::new(scanner, bands));
        let exit_watch = Arc::new(ExitWatchService::new(repository.clone(), allocator.clone()));
        let gate = Arc::new(OperationGate::new());
        let lifecycle = Arc::new(LifecycleService::new(
            repository.clone(),
            launcher,
            prober,
            sampler.clone(),
            allocator.clone(),
            exit_watch,
            gate,
            config.lifecycle_config(),
        ));
        let store = Arc::new(ManifestStoreService::new(repository.clone(), author));
        let scan = Arc::new(ScanService::new(
            repository.clone(),
            discovery,
            lifecycle.clone(),
        ));
        let conflicts = Arc::new(PortConflictService::new(
            repository.clone(),
            allocator.clone(),
        ));
        let health_watch = Arc::new(HealthWatchService::new(
            repository.clone(),
            lifecycle.clone(),
            config.health_check.interval_seconds,
        ));

        // Wire up command use cases
        let start_service = Arc::new(StartServiceUseCase::new(lifecycle.clone()));
        let stop_service = Arc::new(StopServiceUseCase::new(lifecycle.clone()));
        let restart_service = Arc::new(RestartServiceUseCase::new(lifecycle.clone()));
        let scan_services = Arc::new(ScanServicesUseCase::new(scan));
        let refresh_manifest = Arc::new(RefreshManifestUseCase::new(repository.clone(), store));
        let resolve_conflicts = Arc::new(ResolveConflictsUseCase::new(conflicts.clone()));

        // Wire up query use cases
        let list_services = Arc::new(ListServicesUseCase::new(repository.clone()));
        let get_service_status = Arc::new(GetServiceStatusUseCase::new(repository.clone()));

        Self {
            start_service,
            stop_service,
            restart_service,
            scan_services,
            refresh_manifest,
            resolve_conflicts,
            list_services,
            get_service_status,
            lifecycle,
            conflicts,
            allocator,
            health_watch,
            repository,
            sampler,
            config,
            identity,
            machine_id,
            machine_name,
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: epoch_secs(),
        }
    }

    /// Wire the agent with the real OS-backed adapters
    pub fn with_os_adapters(config: AgentConfig, identity: MachineIdentity) -> Self {
        let discovery = Arc::new(FsServiceDiscovery::new(config.services.folders.clone()));
        Self::new(
            config,
            identity,
            Arc::new(InMemoryServiceRepository::new()),
            Arc::new(TokioProcessLauncher::new()),
            Arc::new(HttpHealthProber::new()),
            Arc::new(TcpPortScanner::new()),
            Arc::new(ProcResourceSampler::new()),
            discovery,
            Arc::new(TemplateManifestAuthor::new()),
        )
    }

    // ===== Command Use Cases =====

    pub fn start_service(&self) -> Arc<dyn StartService> {
        self.start_service.clone()
    }

    pub fn stop_service(&self) -> Arc<dyn StopService> {
        self.stop_service.clone()
    }

    pub fn restart_service(&self) -> Arc<dyn RestartService> {
        self.restart_service.clone()
    }

    pub fn scan_services(&self) -> Arc<dyn ScanServices> {
        self.scan_services.clone()
    }

    pub fn refresh_manifest(&self) -> Arc<dyn RefreshManifest> {
        self.refresh_manifest.clone()
    }

    pub fn resolve_conflicts(&self) -> Arc<dyn ResolveConflicts> {
        self.resolve_conflicts.clone()
    }

    // ===== Query Use Cases =====

    pub fn list_services(&self) -> Arc<dyn ListServices> {
        self.list_services.clone()
    }

    pub fn get_service_status(&self) -> Arc<dyn GetServiceStatus> {
        self.get_service_status.clone()
    }

    // ===== Domain Services (exposed for adapters and the daemon) =====

    pub fn lifecycle(&self) -> Arc<LifecycleService> {
        self.lifecycle.clone()
    }

    pub fn port_conflicts(&self) -> Arc<PortConflictService> {
        self.conflicts.clone()
    }

    pub fn allocator(&self) -> Arc<PortAllocatorService> {
        self.allocator.clone()
    }

    pub fn health_watch(&self) -> Arc<HealthWatchService> {
        self.health_watch.clone()
    }

    pub fn repository(&self) -> Arc<dyn ServiceRepository> {
        self.repository.clone()
    }

    pub fn sampler(&self) -> Arc<dyn ResourceSampler> {
        self.sampler.clone()
    }

    // ===== Agent-level facts =====

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn identity(&self) -> &MachineIdentity {
        &self.identity
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Uuid minted at boot, lets a coordinator detect agent restarts
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn uptime_seconds(&self) -> u64 {
        epoch_secs().saturating_sub(self.started_at)
    }
}
