//! End-to-end tests for the agent-wide surfaces: status counters, machine
//! identity and bands, config echo, resource snapshots, the background
//! health sweep, and the CLI front end.

use sa_e2e_tests::{
    api_get, api_post, echo_manifest, reserve_port_block, run_ctl, AgentBuilder,
};
use std::thread;
use std::time::Duration;

#[test]
fn test_status_reports_counts_and_resources() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .service("beta", &echo_manifest("beta", ports.api(1)))
        .build();

    let (status, _) = api_post("/services/alpha/start");
    assert_eq!(status, 200);

    let (status, body) = api_get("/status");
    assert_eq!(status, 200, "status failed: {}", body);
    assert_eq!(body["status"], "running");
    assert!(
        !body["machine_id"].as_str().unwrap_or_default().is_empty(),
        "missing machine id: {}",
        body
    );
    assert!(body["uptime_seconds"].as_u64().unwrap_or(u64::MAX) < 120);

    assert_eq!(body["services"]["total"], 2);
    assert_eq!(body["services"]["running"], 1);
    assert_eq!(body["services"]["stopped"], 1);
    assert_eq!(body["services"]["failed"], 0);

    assert!(
        body["resources"]["memory"]["total_gb"].as_f64().unwrap_or(0.0) > 0.0,
        "no memory sampled: {}",
        body
    );

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_machine_info_reports_bands() {
    let ports = reserve_port_block();
    let (api_start, api_end) = ports.api_band();
    let (ui_start, ui_end) = ports.ui_band();
    let _agent = AgentBuilder::new().build();

    let (status, body) = api_get("/machine/info");
    assert_eq!(status, 200, "machine info failed: {}", body);
    assert!(!body["machine_id"].as_str().unwrap_or_default().is_empty());
    assert!(
        !body["identity"]["hostname"]
            .as_str()
            .unwrap_or_default()
            .is_empty(),
        "missing hostname: {}",
        body
    );
    assert!(
        !body["identity"]["config_suffix"]
            .as_str()
            .unwrap_or_default()
            .is_empty(),
        "missing config suffix: {}",
        body
    );

    // Config overrides win over the platform band table
    let current = &body["port_ranges"]["current"];
    assert_eq!(current["api"]["start"], api_start as u64);
    assert_eq!(current["api"]["end"], api_end as u64);
    assert_eq!(current["ui"]["start"], ui_start as u64);
    assert_eq!(current["ui"]["end"], ui_end as u64);

    let all = body["port_ranges"]["all_platforms"]
        .as_object()
        .cloned()
        .unwrap_or_default();
    assert_eq!(all.len(), 4, "expected one band set per machine slot: {}", body);
    assert!(all.contains_key("linux"));
    assert!(all.contains_key("macos"));
}

#[test]
fn test_config_endpoint_reflects_file() {
    let ports = reserve_port_block();
    let (api_start, _) = ports.api_band();
    let agent = AgentBuilder::new().build();

    let (status, body) = api_get("/config");
    assert_eq!(status, 200, "config failed: {}", body);
    assert_eq!(body["agent"]["port"], ports.agent() as u64);
    assert_eq!(body["agent"]["host"], "127.0.0.1");
    assert_eq!(body["port_ranges"]["api_start"], api_start as u64);
    assert_eq!(body["health_check"]["interval_seconds"], 300);
    assert_eq!(body["lifecycle"]["stop_grace_seconds"], 2);
    assert_eq!(
        body["services"]["folders"][0],
        agent.services_root().display().to_string()
    );
}

#[test]
fn test_resources_snapshot() {
    let _agent = AgentBuilder::new().build();

    let (status, body) = api_get("/resources");
    assert_eq!(status, 200, "resources failed: {}", body);
    assert!(
        body["memory"]["total_gb"].as_f64().unwrap_or(0.0) > 0.0,
        "no memory info: {}",
        body
    );
    assert!(
        body["cpu"]["cores"].as_u64().unwrap_or(0) >= 1,
        "no cpu info: {}",
        body
    );
    assert!(
        body["disk"]["total_gb"].as_f64().unwrap_or(0.0) > 0.0,
        "no disk info: {}",
        body
    );
    assert!(body["sampled_at"].as_u64().unwrap_or(0) > 0);
}

#[test]
fn test_background_sweep_records_verdicts() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .health_sweep(1)
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (status, _) = api_post("/services/alpha/start");
    assert_eq!(status, 200);

    // No explicit probe: the periodic sweep records the verdict on its own
    thread::sleep(Duration::from_millis(2500));

    let (_, body) = api_get("/services/alpha");
    assert_eq!(
        body["health"]["status"], "healthy",
        "sweep left no verdict: {}",
        body
    );
    assert!(
        agent.stdout_logs().contains("Health watch started"),
        "health watch not running"
    );

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_missing_always_running_does_not_block_boot() {
    let agent = AgentBuilder::new().always_running("phantom").build();

    // Boot completed despite the unknown service name
    let (status, body) = api_get("/status");
    assert_eq!(status, 200);
    assert_eq!(body["services"]["total"], 0);
    assert!(
        agent.stdout_logs().contains("Could not auto-start service"),
        "missing warning about the unknown service"
    );
}

#[test]
fn test_ctl_lifecycle_round_trip() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (stdout, stderr, code) = run_ctl(&["start", "alpha"]);
    assert_eq!(code, 0, "start failed: {} {}", stdout, stderr);
    assert!(
        stdout.contains("[OK] Service 'alpha' started"),
        "unexpected output: {}",
        stdout
    );
    assert!(
        stdout.contains(&format!("api:{}", ports.api(0))),
        "ports not shown: {}",
        stdout
    );

    let (stdout, _, code) = run_ctl(&["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Agent Status"), "unexpected output: {}", stdout);
    assert!(stdout.contains("Running:"), "unexpected output: {}", stdout);

    let (stdout, _, code) = run_ctl(&["list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("alpha"), "service missing: {}", stdout);
    assert!(stdout.contains("running"), "state missing: {}", stdout);

    let (stdout, _, code) = run_ctl(&["show", "alpha"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("BASIC INFORMATION"), "unexpected output: {}", stdout);
    assert!(stdout.contains("running"), "state missing: {}", stdout);

    thread::sleep(Duration::from_millis(500));
    let (stdout, _, code) = run_ctl(&["logs", "alpha"]);
    assert_eq!(code, 0);
    assert!(
        stdout.contains("listening on"),
        "captured output missing: {}",
        stdout
    );

    let (stdout, _, code) = run_ctl(&["scan"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[OK] Scan complete"), "unexpected output: {}", stdout);

    let (stdout, _, code) = run_ctl(&["stop", "alpha"]);
    assert_eq!(code, 0);
    assert!(
        stdout.contains("[OK] Service stopped"),
        "unexpected output: {}",
        stdout
    );
}

#[test]
fn test_ctl_health_exit_codes() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (status, _) = api_post("/services/alpha/start");
    assert_eq!(status, 200);

    let (stdout, _, code) = run_ctl(&["health", "alpha"]);
    assert_eq!(code, 0, "healthy service should exit 0: {}", stdout);
    assert!(stdout.contains("healthy"), "unexpected output: {}", stdout);

    let (status, _) = api_post("/services/alpha/stop");
    assert_eq!(status, 200);

    // Anything but healthy exits non-zero for scripting
    let (stdout, _, code) = run_ctl(&["health", "alpha"]);
    assert_eq!(code, 1, "non-running service should exit 1: {}", stdout);
    assert!(stdout.contains("unknown"), "unexpected output: {}", stdout);
}

#[test]
fn test_ctl_reports_api_errors() {
    let _agent = AgentBuilder::new().build();

    let (stdout, stderr, code) = run_ctl(&["show", "ghost"]);
    assert_eq!(code, 1, "missing service should exit 1: {}", stdout);
    assert!(
        stderr.contains("Error:") && stderr.contains("not found"),
        "unexpected stderr: {}",
        stderr
    );
}

#[test]
fn test_ctl_unknown_command_prints_usage() {
    let _agent = AgentBuilder::new().build();

    let (_, stderr, code) = run_ctl(&["bogus"]);
    assert_eq!(code, 1);
    assert!(
        stderr.contains("unknown command: bogus"),
        "unexpected stderr: {}",
        stderr
    );
    assert!(stderr.contains("Usage:"), "usage not printed: {}", stderr);
}
