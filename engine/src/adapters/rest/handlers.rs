//! REST API handlers using axum

use crate::application::Application;
use crate::domain::constants::DEFAULT_LOG_TAIL_LINES;
use crate::domain::ports::StopOutcome;
use crate::domain::services::PortConflictService;
use crate::domain::value_objects::{PortBand, PortBands, ResourceNeeds};
use crate::domain::{
    DomainError, GetServiceStatusQuery, HealthVerdict, PortChange, PortConflict,
    RefreshManifestCommand, ResourceSnapshot, RestartServiceCommand, ServiceId, ServiceRecord,
    ServiceState, StartServiceCommand, StopServiceCommand,
};
use crate::infrastructure::{AgentConfig, MachineIdentity};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state
pub type AppState = Arc<Application>;

/// Log lines included inline in the service detail view
const DETAIL_LOG_LINES: usize = 20;

/// Machine slots with dedicated port bands
const MACHINE_SLOTS: [&str; 4] = ["macos", "windows-1", "windows-2", "linux"];

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error onto the HTTP surface
///
/// Unknown ids are 404, anything colliding with current machine state
/// (an operation already in flight, exhausted bands, admission refusal)
/// is 409, validation and state problems are 400 and only plumbing
/// failures surface as 500.
fn api_error(error: DomainError) -> ApiError {
    let status = match &error {
        DomainError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::OperationInFlight(_)
        | DomainError::PortRangeExhausted { .. }
        | DomainError::InsufficientResources(_) => StatusCode::CONFLICT,
        DomainError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// ===== Shared response shapes =====

/// One service as reported by the registry surfaces
#[derive(Serialize)]
pub struct ServiceSummary {
    pub service_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: String,
    pub has_manifest: bool,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub assigned_ports: BTreeMap<String, u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub registered_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<u64>,
}

impl ServiceSummary {
    fn from_record(record: &ServiceRecord) -> Self {
        let description = record
            .manifest()
            .map(|m| m.description().to_string())
            .filter(|d| !d.is_empty());
        ServiceSummary {
            service_id: record.id().to_string(),
            name: record.display_name().to_string(),
            description,
            state: record.state().to_string(),
            has_manifest: record.manifest().is_some(),
            location: record.location().display().to_string(),
            pid: record.pid(),
            assigned_ports: record.assigned_ports().clone(),
            uptime_seconds: record.uptime_secs(),
            health: record.health().cloned(),
            last_error: record.last_error().map(str::to_string),
            registered_at: record.registered_at(),
            started_at: record.started_at(),
            stopped_at: record.stopped_at(),
        }
    }
}

/// Detail view with the log tail folded in
#[derive(Serialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub summary: ServiceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub recent_logs: Vec<String>,
}

/// Outcome of a start or restart
#[derive(Serialize)]
pub struct StartHttpResponse {
    pub success: bool,
    pub service_id: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub assigned_ports: BTreeMap<String, u16>,
    pub message: String,
}

#[derive(Serialize)]
pub struct StopHttpResponse {
    pub success: bool,
    pub service_id: String,
    pub state: String,
    pub message: String,
}

/// Start/restart request body; both sections optional
#[derive(Deserialize, Default)]
pub struct StartRequest {
    #[serde(default)]
    pub port_assignments: BTreeMap<String, u16>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Per-service counts on the status surface
#[derive(Serialize)]
pub struct ServiceCounts {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub failed: usize,
}

impl ServiceCounts {
    fn tally(services: &[ServiceRecord]) -> Self {
        let mut counts = ServiceCounts {
            total: services.len(),
            running: 0,
            stopped: 0,
            failed: 0,
        };
        for record in services {
            match record.state() {
                ServiceState::Failed | ServiceState::Error => counts.failed += 1,
                state if state.is_active() => counts.running += 1,
                _ => counts.stopped += 1,
            }
        }
        counts
    }
}

/// Ports a service answers on right now: live assignment when active,
/// otherwise whatever `.env` or the manifest default says
fn effective_ports(record: &ServiceRecord) -> BTreeMap<String, u16> {
    let mut ports = PortConflictService::configured_ports(record);
    for (name, port) in record.assigned_ports() {
        ports.insert(name.clone(), *port);
    }
    ports
}

// ===== Agent surfaces =====

#[derive(Serialize)]
pub struct AgentStatusResponse {
    pub status: String,
    pub machine_id: String,
    pub machine_name: String,
    pub uptime_seconds: u64,
    pub services: ServiceCounts,
    pub resources: ResourceSnapshot,
}

/// GET /status - Agent summary
pub async fn agent_status(
    State(app): State<AppState>,
) -> Result<Json<AgentStatusResponse>, ApiError> {
    debug!("REST Status request");

    let listing = app.list_services().execute().await.map_err(|e| {
        error!(error = %e, "List services failed");
        api_error(e)
    })?;
    let resources = app.sampler().sample().await.map_err(|e| {
        error!(error = %e, "Resource sampling failed");
        api_error(e)
    })?;

    Ok(Json(AgentStatusResponse {
        status: "running".to_string(),
        machine_id: app.machine_id().to_string(),
        machine_name: app.machine_name().to_string(),
        uptime_seconds: app.uptime_seconds(),
        services: ServiceCounts::tally(&listing.services),
        resources,
    }))
}

#[derive(Serialize)]
pub struct AgentBlock {
    pub machine_id: String,
    pub machine_name: String,
    pub version: String,
    pub run_id: String,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct PortView {
    pub default: u16,
    pub configured: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

#[derive(Serialize)]
pub struct ApiEndpointView {
    pub port: u16,
    pub url: String,
    pub health_check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    pub docs_url: String,
}

#[derive(Serialize)]
pub struct UiEndpointView {
    pub port: u16,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One capability entry of the coordinator-facing dump
#[derive(Serialize)]
pub struct DiscoveredService {
    pub service_id: String,
    pub name: String,
    pub description: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub ports: BTreeMap<String, PortView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiEndpointView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiEndpointView>,
    pub operations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    pub resources: ResourceNeeds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct DiscoverResponse {
    pub agent: AgentBlock,
    pub services: Vec<DiscoveredService>,
}

fn discovered_service(record: &ServiceRecord, hostname: &str) -> Option<DiscoveredService> {
    // Only manifest-bearing services have capabilities to offer
    let manifest = record.manifest()?;
    let effective = effective_ports(record);

    let ports = manifest
        .ports()
        .iter()
        .map(|(name, spec)| {
            let configured = effective.get(name).copied().unwrap_or(spec.default);
            (
                name.clone(),
                PortView {
                    default: spec.default,
                    configured,
                    env_var: spec.env_var.clone(),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    let api = ports.get("api").map(|view| {
        let spec = manifest.doc().endpoints.api.clone().unwrap_or_default();
        ApiEndpointView {
            port: view.configured,
            url: format!("http://{}:{}", hostname, view.configured),
            health_check: manifest.health_check_path().to_string(),
            base_path: spec.base_path,
            docs_url: format!("http://{}:{}/docs", hostname, view.configured),
        }
    });
    let ui = ports.get("ui").map(|view| UiEndpointView {
        port: view.configured,
        url: format!("http://{}:{}", hostname, view.configured),
        path: manifest
            .doc()
            .endpoints
            .ui
            .as_ref()
            .and_then(|ui| ui.path.clone()),
    });

    Some(DiscoveredService {
        service_id: record.id().to_string(),
        name: record.display_name().to_string(),
        description: manifest.description().to_string(),
        state: record.state().to_string(),
        version: Some(manifest.version().to_string()).filter(|v| !v.is_empty()),
        ports,
        api,
        ui,
        operations: manifest.doc().capabilities.operations.clone(),
        inputs: manifest.doc().capabilities.inputs.clone(),
        outputs: manifest.doc().capabilities.outputs.clone(),
        resources: manifest.resources().clone(),
        tags: manifest.tags().to_vec(),
    })
}

/// GET /discover - Capability dump for a fleet coordinator
pub async fn discover(State(app): State<AppState>) -> Result<Json<DiscoverResponse>, ApiError> {
    debug!("REST Discover request");

    let listing = app.list_services().execute().await.map_err(|e| {
        error!(error = %e, "List services failed");
        api_error(e)
    })?;

    let hostname = app.identity().hostname.clone();
    let services = listing
        .services
        .iter()
        .filter_map(|record| discovered_service(record, &hostname))
        .collect();

    Ok(Json(DiscoverResponse {
        agent: AgentBlock {
            machine_id: app.machine_id().to_string(),
            machine_name: app.machine_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: app.run_id().to_string(),
            uptime_seconds: app.uptime_seconds(),
        },
        services,
    }))
}

// ===== Registry surfaces =====

#[derive(Serialize)]
pub struct ListServicesHttpResponse {
    pub services: Vec<ServiceSummary>,
    pub total: usize,
}

/// GET /services - List all registered services
pub async fn list_services(
    State(app): State<AppState>,
) -> Result<Json<ListServicesHttpResponse>, ApiError> {
    info!("REST List request");

    let result = app.list_services().execute().await.map_err(|e| {
        error!(error = %e, "List services failed");
        api_error(e)
    })?;

    let services: Vec<ServiceSummary> = result
        .services
        .iter()
        .map(ServiceSummary::from_record)
        .collect();

    debug!(count = services.len(), "Services listed");

    Ok(Json(ListServicesHttpResponse {
        total: services.len(),
        services,
    }))
}

/// GET /services/:id - Service detail with a short log tail
pub async fn get_service(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceDetail>, ApiError> {
    info!(service = %id, "REST Get service request");

    let result = app
        .get_service_status()
        .execute(GetServiceStatusQuery::new(&id))
        .await
        .map_err(|e| {
            error!(service = %id, error = %e, "Get service failed");
            api_error(e)
        })?;
    let record = result.service;

    let recent_logs = app.lifecycle().log_tail(record.id(), DETAIL_LOG_LINES);
    let version = record
        .manifest()
        .map(|m| m.version().to_string())
        .filter(|v| !v.is_empty());
    let tags = record
        .manifest()
        .map(|m| m.tags().to_vec())
        .unwrap_or_default();

    Ok(Json(ServiceDetail {
        summary: ServiceSummary::from_record(&record),
        version,
        tags,
        recent_logs,
    }))
}

// ===== Lifecycle operations =====

/// POST /services/:id/start - Start a service
pub async fn start_service(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartHttpResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    info!(service = %id, ports = ?req.port_assignments, "REST Start request");

    let command = StartServiceCommand {
        service: id.clone(),
        ports: req.port_assignments,
        env: req.env.into_iter().collect(),
        auto_ports: false,
    };

    let result = app.start_service().execute(command).await.map_err(|e| {
        error!(service = %id, error = %e, "Start failed");
        api_error(e)
    })?;

    debug!(service = %id, pid = ?result.pid, "Service started");

    Ok(Json(StartHttpResponse {
        success: true,
        service_id: result.service.to_string(),
        state: result.state.to_string(),
        pid: result.pid,
        assigned_ports: result.ports,
        message: format!("Service '{}' started", result.service),
    }))
}

/// POST /services/:id/start-auto - Start with automatically planned ports
///
/// Explicit assignments in the body still win; auto-planning only fills
/// the ports the caller left out.
pub async fn start_service_auto(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartHttpResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    info!(service = %id, "REST Start-auto request");

    let command = StartServiceCommand {
        service: id.clone(),
        ports: req.port_assignments,
        env: req.env.into_iter().collect(),
        auto_ports: true,
    };

    let result = app.start_service().execute(command).await.map_err(|e| {
        error!(service = %id, error = %e, "Start-auto failed");
        api_error(e)
    })?;

    Ok(Json(StartHttpResponse {
        success: true,
        service_id: result.service.to_string(),
        state: result.state.to_string(),
        pid: result.pid,
        assigned_ports: result.ports,
        message: format!("Service '{}' started with auto-assigned ports", result.service),
    }))
}

/// POST /services/:id/stop - Stop a service (idempotent)
pub async fn stop_service(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StopHttpResponse>, ApiError> {
    info!(service = %id, "REST Stop request");

    let result = app
        .stop_service()
        .execute(StopServiceCommand::new(&id))
        .await
        .map_err(|e| {
            error!(service = %id, error = %e, "Stop failed");
            api_error(e)
        })?;

    let message = match result.outcome {
        StopOutcome::Stopped => "Service stopped".to_string(),
        StopOutcome::ForcedKill => "Service force-killed after grace period".to_string(),
        StopOutcome::AlreadyExited => "Service was not running".to_string(),
    };

    Ok(Json(StopHttpResponse {
        success: true,
        service_id: result.service.to_string(),
        state: result.state.to_string(),
        message,
    }))
}

/// POST /services/:id/restart - Stop then start, keeping ports
pub async fn restart_service(
    State(app): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartHttpResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    info!(service = %id, "REST Restart request");

    let command = RestartServiceCommand {
        service: id.clone(),
        ports: req.port_assignments,
        env: req.env.into_iter().collect(),
    };

    let result = app.restart_service().execute(command).await.map_err(|e| {
        error!(service = %id, error = %e, "Restart failed");
        api_error(e)
    })?;

    Ok(Json(StartHttpResponse {
        success: true,
        service_id: result.service.to_string(),
        state: result.state.to_string(),
        pid: result.pid,
        assigned_ports: result.ports,
        message: format!("Service '{}' restarted", result.service),
    }))
}

// ===== Observation surfaces =====

#[derive(Serialize)]
pub struct HealthHttpResponse {
    pub service_id: String,
    #[serde(flatten)]
    pub verdict: HealthVerdict,
}

/// GET /services/:id/health - Probe the service right now
pub async fn service_health(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HealthHttpResponse>, ApiError> {
    info!(service = %id, "REST Health request");

    let service_id = ServiceId::new(&id);
    let verdict = app
        .lifecycle()
        .check_health(&service_id)
        .await
        .map_err(|e| {
            error!(service = %id, error = %e, "Health check failed");
            api_error(e)
        })?;

    Ok(Json(HealthHttpResponse {
        service_id: service_id.to_string(),
        verdict,
    }))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub lines: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsHttpResponse {
    pub service_id: String,
    pub lines: usize,
    pub logs: Vec<String>,
}

/// GET /services/:id/logs?lines=N - Tail of the in-memory log ring
pub async fn service_logs(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsHttpResponse>, ApiError> {
    debug!(service = %id, lines = ?params.lines, "REST Logs request");

    let service_id = ServiceId::new(&id);
    // 404 before reading the ring so unknown ids do not yield empty logs
    app.repository().get(&service_id).await.map_err(api_error)?;

    let lines = params.lines.unwrap_or(DEFAULT_LOG_TAIL_LINES);
    let logs = app.lifecycle().log_tail(&service_id, lines);

    Ok(Json(LogsHttpResponse {
        service_id: service_id.to_string(),
        lines: logs.len(),
        logs,
    }))
}

#[derive(Serialize)]
pub struct PortEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    pub default: u16,
    pub configured: u16,
    pub is_default: bool,
}

#[derive(Serialize)]
pub struct ServicePortsResponse {
    pub service_id: String,
    pub ports: BTreeMap<String, PortEntry>,
}

/// GET /services/:id/ports - Declared ports and their configured values
pub async fn service_ports(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServicePortsResponse>, ApiError> {
    debug!(service = %id, "REST Ports request");

    let service_id = ServiceId::new(&id);
    let record = app.repository().get(&service_id).await.map_err(api_error)?;

    let effective = effective_ports(&record);
    let ports = record
        .manifest()
        .map(|manifest| {
            manifest
                .ports()
                .iter()
                .map(|(name, spec)| {
                    let configured = effective.get(name).copied().unwrap_or(spec.default);
                    (
                        name.clone(),
                        PortEntry {
                            env_var: spec.env_var.clone(),
                            default: spec.default,
                            configured,
                            is_default: configured == spec.default,
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(ServicePortsResponse {
        service_id: service_id.to_string(),
        ports,
    }))
}

#[derive(Serialize)]
pub struct RefreshHttpResponse {
    pub accepted: bool,
    pub service_id: String,
}

/// POST /services/:id/refresh-manifest - Fire-and-forget regeneration
pub async fn refresh_manifest(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RefreshHttpResponse>), ApiError> {
    info!(service = %id, "REST Refresh-manifest request");

    let result = app
        .refresh_manifest()
        .execute(RefreshManifestCommand::new(&id))
        .await
        .map_err(|e| {
            error!(service = %id, error = %e, "Refresh-manifest failed");
            api_error(e)
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshHttpResponse {
            accepted: result.scheduled,
            service_id: result.service.to_string(),
        }),
    ))
}

// ===== Fleet operations =====

#[derive(Serialize)]
pub struct ScanHttpResponse {
    pub success: bool,
    pub services_found: usize,
    pub new_services: usize,
}

/// POST /scan - Rescan the configured service folders
pub async fn scan(State(app): State<AppState>) -> Result<Json<ScanHttpResponse>, ApiError> {
    info!("REST Scan request");

    let result = app.scan_services().execute().await.map_err(|e| {
        error!(error = %e, "Scan failed");
        api_error(e)
    })?;

    debug!(
        added = result.added,
        refreshed = result.refreshed,
        removed = result.removed,
        "Scan finished"
    );

    Ok(Json(ScanHttpResponse {
        success: true,
        services_found: result.total,
        new_services: result.added,
    }))
}

#[derive(Serialize)]
pub struct ConflictView {
    pub port: u16,
    pub port_name: String,
    pub services: Vec<String>,
}

impl ConflictView {
    fn from_domain(conflict: &PortConflict) -> Self {
        ConflictView {
            port: conflict.port,
            port_name: conflict.port_name.clone(),
            services: vec![conflict.first.to_string(), conflict.second.to_string()],
        }
    }
}

#[derive(Serialize)]
pub struct ConflictsHttpResponse {
    pub has_conflicts: bool,
    pub conflicts: Vec<ConflictView>,
    pub message: String,
}

/// GET /ports/conflicts - Point-in-time conflict report
pub async fn port_conflicts(
    State(app): State<AppState>,
) -> Result<Json<ConflictsHttpResponse>, ApiError> {
    debug!("REST Conflicts request");

    let conflicts = app.port_conflicts().find_conflicts().await.map_err(|e| {
        error!(error = %e, "Conflict scan failed");
        api_error(e)
    })?;

    let message = if conflicts.is_empty() {
        "No port conflicts".to_string()
    } else {
        format!("{} port conflict(s) found", conflicts.len())
    };

    Ok(Json(ConflictsHttpResponse {
        has_conflicts: !conflicts.is_empty(),
        conflicts: conflicts.iter().map(ConflictView::from_domain).collect(),
        message,
    }))
}

#[derive(Serialize)]
pub struct AssignmentPortView {
    pub default: u16,
    pub assigned: u16,
    pub changed: bool,
}

#[derive(Serialize)]
pub struct AssignmentView {
    pub service_id: String,
    pub name: String,
    pub ports: BTreeMap<String, AssignmentPortView>,
}

#[derive(Serialize)]
pub struct AssignmentsHttpResponse {
    pub assignments: Vec<AssignmentView>,
    pub total_services: usize,
}

/// GET /ports/assignments - Configured ports across the registry
pub async fn port_assignments(
    State(app): State<AppState>,
) -> Result<Json<AssignmentsHttpResponse>, ApiError> {
    debug!("REST Assignments request");

    let listing = app.list_services().execute().await.map_err(|e| {
        error!(error = %e, "List services failed");
        api_error(e)
    })?;

    let assignments: Vec<AssignmentView> = listing
        .services
        .iter()
        .filter_map(|record| {
            let manifest = record.manifest()?;
            let effective = effective_ports(record);
            let ports = manifest
                .ports()
                .iter()
                .map(|(name, spec)| {
                    let assigned = effective.get(name).copied().unwrap_or(spec.default);
                    (
                        name.clone(),
                        AssignmentPortView {
                            default: spec.default,
                            assigned,
                            changed: assigned != spec.default,
                        },
                    )
                })
                .collect();
            Some(AssignmentView {
                service_id: record.id().to_string(),
                name: record.display_name().to_string(),
                ports,
            })
        })
        .collect();

    Ok(Json(AssignmentsHttpResponse {
        total_services: assignments.len(),
        assignments,
    }))
}

#[derive(Serialize)]
pub struct ChangeView {
    pub service_id: String,
    pub port_name: String,
    pub from_port: u16,
    pub to_port: u16,
}

impl ChangeView {
    fn from_domain(change: &PortChange) -> Self {
        ChangeView {
            service_id: change.service.to_string(),
            port_name: change.port_name.clone(),
            from_port: change.from_port,
            to_port: change.to_port,
        }
    }
}

#[derive(Serialize)]
pub struct ResolveHttpResponse {
    pub success: bool,
    pub message: String,
    pub conflicts_before: usize,
    pub changes: Vec<ChangeView>,
}

/// POST /ports/resolve - Move later claimants off contested ports
pub async fn resolve_port_conflicts(
    State(app): State<AppState>,
) -> Result<Json<ResolveHttpResponse>, ApiError> {
    info!("REST Resolve request");

    let result = app.resolve_conflicts().execute().await.map_err(|e| {
        error!(error = %e, "Conflict resolution failed");
        api_error(e)
    })?;

    let message = if result.changes.is_empty() {
        "No port conflicts to resolve".to_string()
    } else {
        format!("Moved {} port(s) to resolve conflicts", result.changes.len())
    };

    Ok(Json(ResolveHttpResponse {
        success: true,
        message,
        conflicts_before: result.conflicts.len(),
        changes: result.changes.iter().map(ChangeView::from_domain).collect(),
    }))
}

// ===== Machine surfaces =====

/// GET /resources - Current machine utilization
pub async fn resources(State(app): State<AppState>) -> Result<Json<ResourceSnapshot>, ApiError> {
    debug!("REST Resources request");

    let snapshot = app.sampler().sample().await.map_err(|e| {
        error!(error = %e, "Resource sampling failed");
        api_error(e)
    })?;
    Ok(Json(snapshot))
}

#[derive(Serialize)]
pub struct BandsView {
    pub api: PortBand,
    pub ui: PortBand,
}

impl BandsView {
    fn from_bands(bands: PortBands) -> Self {
        BandsView {
            api: bands.api,
            ui: bands.ui,
        }
    }
}

#[derive(Serialize)]
pub struct PortRangesView {
    pub current: BandsView,
    pub all_platforms: BTreeMap<String, BandsView>,
}

#[derive(Serialize)]
pub struct MachineInfoResponse {
    pub machine_id: String,
    pub machine_name: String,
    pub identity: MachineIdentity,
    pub port_ranges: PortRangesView,
}

/// GET /machine/info - Identity and the port band table
pub async fn machine_info(State(app): State<AppState>) -> Json<MachineInfoResponse> {
    debug!("REST Machine-info request");

    let platform = app.identity().platform;
    let all_platforms = MACHINE_SLOTS
        .iter()
        .map(|slot| {
            (
                slot.to_string(),
                BandsView::from_bands(PortBands::for_machine(slot, platform)),
            )
        })
        .collect();

    Json(MachineInfoResponse {
        machine_id: app.machine_id().to_string(),
        machine_name: app.machine_name().to_string(),
        identity: app.identity().clone(),
        port_ranges: PortRangesView {
            current: BandsView::from_bands(app.allocator().bands()),
            all_platforms,
        },
    })
}

/// GET /config - Effective agent configuration
pub async fn agent_config(State(app): State<AppState>) -> Json<AgentConfig> {
    debug!("REST Config request");
    Json(app.config().clone())
}
