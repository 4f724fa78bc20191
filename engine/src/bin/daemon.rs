//! svc-agentd: the per-machine service agent daemon
//!
//! Boot order matters: identity and config come first so the port bands
//! are known, then the initial scan populates the registry, then the
//! configured services are brought up, and only then does the HTTP API
//! start answering.

#[path = "daemon/config.rs"]
mod config;

use config::{DaemonConfig, TransportMode};
use sa_engine::adapters::rest::{build_router, serve_on_tcp, serve_on_unix_socket};
use sa_engine::domain::StartServiceCommand;
use sa_engine::infrastructure::{AgentConfig, MachineIdentity};
use sa_engine::Application;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let daemon_config = DaemonConfig::from_env();
    daemon_config.validate()?;
    init_tracing(&daemon_config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "svc-agentd starting"
    );

    let identity = MachineIdentity::detect();
    let agent_config = AgentConfig::discover(
        daemon_config.config_file.as_deref().map(Path::new),
        &identity,
    )?;

    let app = Arc::new(Application::with_os_adapters(agent_config, identity));
    info!(
        machine_id = %app.machine_id(),
        machine_name = %app.machine_name(),
        run_id = %app.run_id(),
        "Agent identity resolved"
    );

    run_startup_tasks(&app).await;

    // Background health sweeps, stopped via the token on shutdown
    let shutdown_token = CancellationToken::new();
    let health_task = if app.config().health_check.enabled {
        let watch = app.health_watch();
        let token = shutdown_token.clone();
        Some(tokio::spawn(async move { watch.run(token).await }))
    } else {
        info!("Health watch disabled by config");
        None
    };

    let router = build_router(app.clone());
    match daemon_config.transport_mode {
        TransportMode::Tcp => {
            let addr: SocketAddr =
                format!("{}:{}", app.config().agent.host, app.config().agent.port).parse()?;
            serve_on_tcp(addr, router, shutdown_signal()).await?;
        }
        TransportMode::Unix => {
            serve_on_unix_socket(&daemon_config.socket_path, router, shutdown_signal()).await?;
        }
    }

    info!("Shutdown signal received, stopping services");
    shutdown_token.cancel();
    if let Some(task) = health_task {
        let _ = task.await;
    }
    let stopped = app.lifecycle().stop_all().await;
    info!(stopped, "svc-agentd stopped");

    Ok(())
}

fn init_tracing(directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Scan, settle port conflicts and bring up the configured services
async fn run_startup_tasks(app: &Arc<Application>) {
    match app.scan_services().execute().await {
        Ok(report) => info!(
            added = report.added,
            refreshed = report.refreshed,
            removed = report.removed,
            total = report.total,
            "Initial scan complete"
        ),
        Err(e) => warn!(error = %e, "Initial scan failed"),
    }

    if app.config().port_ranges.auto_resolve_conflicts {
        match app.resolve_conflicts().execute().await {
            Ok(report) if report.changes.is_empty() => {}
            Ok(report) => info!(
                conflicts = report.conflicts.len(),
                moved = report.changes.len(),
                "Resolved port conflicts found at startup"
            ),
            Err(e) => warn!(error = %e, "Startup conflict resolution failed"),
        }
    }

    // A missing manifest or a dead folder must not keep the agent down
    for name in &app.config().services.always_running {
        match app
            .start_service()
            .execute(StartServiceCommand::new(name.as_str()))
            .await
        {
            Ok(response) => info!(
                service = %response.service,
                pid = ?response.pid,
                "Auto-started service"
            ),
            Err(e) => warn!(service = %name, error = %e, "Could not auto-start service"),
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!(error = %e, "Could not install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
