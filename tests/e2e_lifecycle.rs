//! End-to-end tests for the basic service lifecycle: start, stop, logs,
//! on-demand health, and the error paths around them.

use sa_e2e_tests::{
    api_get, api_post, echo_manifest, echo_manifest_with_ui, reserve_port_block, service_state,
    AgentBuilder,
};
use std::thread;
use std::time::Duration;

#[test]
fn test_start_stop_cycle() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    // Boot scan hydrated the manifest
    let (status, body) = api_get("/services/alpha");
    assert_eq!(status, 200, "lookup failed: {}", body);
    assert_eq!(body["state"], "ready", "seeded service not ready: {}", body);
    assert_eq!(body["has_manifest"], true);

    let (status, started) = api_post("/services/alpha/start");
    assert_eq!(status, 200, "start failed: {}", started);
    assert_eq!(started["success"], true);
    assert_eq!(started["state"], "running");
    assert_eq!(started["message"], "Service 'alpha' started");
    assert_eq!(started["assigned_ports"]["api"], ports.api(0) as u64);
    assert!(
        started["pid"].as_u64().is_some(),
        "running service should report a pid: {}",
        started
    );

    // The granted port is persisted to .env before launch
    let env = std::fs::read_to_string(agent.env_file("alpha")).unwrap();
    assert!(
        env.contains(&format!("PORT={}", ports.api(0))),
        "unexpected .env contents: {}",
        env
    );

    let (status, stopped) = api_post("/services/alpha/stop");
    assert_eq!(status, 200, "stop failed: {}", stopped);
    assert_eq!(stopped["message"], "Service stopped");
    assert_eq!(stopped["state"], "stopped");

    let (_, after) = api_get("/services/alpha");
    assert_eq!(after["state"], "stopped");
    assert!(after["pid"].is_null(), "stopped service kept a pid: {}", after);
}

#[test]
fn test_start_assigns_every_manifest_port() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service(
            "dual",
            &echo_manifest_with_ui("dual", ports.api(0), ports.ui(0)),
        )
        .build();

    let (status, started) = api_post("/services/dual/start");
    assert_eq!(status, 200, "start failed: {}", started);
    assert_eq!(started["assigned_ports"]["api"], ports.api(0) as u64);
    assert_eq!(started["assigned_ports"]["ui"], ports.ui(0) as u64);

    let env = std::fs::read_to_string(agent.env_file("dual")).unwrap();
    assert!(env.contains(&format!("PORT={}", ports.api(0))), "{}", env);
    assert!(env.contains(&format!("UI_PORT={}", ports.ui(0))), "{}", env);

    let (_, stopped) = api_post("/services/dual/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_start_unknown_service_is_not_found() {
    let _agent = AgentBuilder::new().build();

    let (status, body) = api_post("/services/ghost/start");
    assert_eq!(status, 404, "expected 404: {}", body);
    assert!(
        body["error"].as_str().unwrap_or_default().contains("ghost"),
        "error should name the service: {}",
        body
    );
}

#[test]
fn test_start_without_manifest_is_rejected() {
    let _agent = AgentBuilder::new().bare_service("raw").build();

    assert_eq!(service_state("raw"), "discovered");

    let (status, body) = api_post("/services/raw/start");
    assert_eq!(status, 400, "expected 400: {}", body);
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("has no manifest"),
        "unexpected error: {}",
        body
    );
    assert_eq!(service_state("raw"), "discovered");
}

#[test]
fn test_double_start_is_rejected() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (status, first) = api_post("/services/alpha/start");
    assert_eq!(status, 200, "start failed: {}", first);
    let pid = first["pid"].as_u64().unwrap();

    let (status, second) = api_post("/services/alpha/start");
    assert_eq!(status, 400, "second start should fail: {}", second);
    assert!(
        second["error"]
            .as_str()
            .unwrap_or_default()
            .contains("Invalid state transition"),
        "unexpected error: {}",
        second
    );

    // The running process is untouched
    let (_, body) = api_get("/services/alpha");
    assert_eq!(body["state"], "running");
    assert_eq!(body["pid"], pid);

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_stop_is_idempotent() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    // Never started: stop is a no-op
    let (status, body) = api_post("/services/alpha/stop");
    assert_eq!(status, 200, "stop failed: {}", body);
    assert_eq!(body["message"], "Service was not running");
    assert_eq!(service_state("alpha"), "ready");

    // Started then stopped twice: the second stop is a no-op too
    let (status, _) = api_post("/services/alpha/start");
    assert_eq!(status, 200);
    let (_, first) = api_post("/services/alpha/stop");
    assert_eq!(first["message"], "Service stopped");
    let (_, second) = api_post("/services/alpha/stop");
    assert_eq!(second["message"], "Service was not running");
    assert_eq!(service_state("alpha"), "stopped");
}

#[test]
fn test_logs_capture_service_output() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("chatty", &echo_manifest("chatty", ports.api(0)))
        .build();

    let (status, _) = api_post("/services/chatty/start");
    assert_eq!(status, 200);

    // Give the output pump a moment to drain the pipe
    thread::sleep(Duration::from_millis(500));

    let (status, body) = api_get("/services/chatty/logs");
    assert_eq!(status, 200, "logs failed: {}", body);
    let logs = body["logs"].as_array().cloned().unwrap_or_default();
    assert!(
        logs.iter()
            .any(|line| line.as_str().unwrap_or_default().contains("listening on")),
        "captured logs missing startup line: {}",
        body
    );
    assert_eq!(body["lines"], logs.len() as u64);

    let (_, limited) = api_get("/services/chatty/logs?lines=1");
    assert_eq!(
        limited["logs"].as_array().map(Vec::len),
        Some(1),
        "line limit not applied: {}",
        limited
    );

    let (_, stopped) = api_post("/services/chatty/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_health_endpoint_reflects_probe() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (status, _) = api_post("/services/alpha/start");
    assert_eq!(status, 200);

    let (status, verdict) = api_get("/services/alpha/health");
    assert_eq!(status, 200, "health failed: {}", verdict);
    assert_eq!(verdict["service_id"], "alpha");
    assert_eq!(verdict["status"], "healthy", "not healthy: {}", verdict);
    assert!(verdict["latency_ms"].as_f64().is_some());
    assert!(verdict["observed_at"].as_u64().unwrap_or(0) > 0);
    assert!(verdict["detail"].is_null());

    // The verdict sticks to the service record
    let (_, detail) = api_get("/services/alpha");
    assert_eq!(detail["health"]["status"], "healthy");

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);

    // Probing a stopped service is informational, never an error
    let (status, verdict) = api_get("/services/alpha/health");
    assert_eq!(status, 200);
    assert_eq!(verdict["status"], "unknown");
    assert!(
        verdict["detail"]
            .as_str()
            .unwrap_or_default()
            .contains("not running"),
        "unexpected detail: {}",
        verdict
    );
    assert!(verdict["latency_ms"].is_null());
}

#[test]
fn test_always_running_service_starts_at_boot() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("keeper", &echo_manifest("keeper", ports.api(0)))
        .always_running("keeper")
        .build();

    // Boot start-up tasks run before the API comes up
    let (status, body) = api_get("/services/keeper");
    assert_eq!(status, 200);
    assert_eq!(body["state"], "running", "not auto-started: {}", body);
}
