//! End-to-end tests for port allocation: candidate precedence (.env over
//! manifest default), explicit overrides, band scanning on contention, and
//! the read-only port views.

use sa_e2e_tests::{
    api_get, api_post, api_post_json, echo_manifest, reserve_port_block, AgentBuilder,
};
use serde_json::json;
use std::fs;

#[test]
fn test_persisted_env_beats_manifest_default() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    // A previous operator choice, written the way the agent would
    fs::write(agent.env_file("alpha"), format!("PORT={}\n", ports.api(7))).unwrap();

    let (status, started) = api_post("/services/alpha/start");
    assert_eq!(status, 200, "start failed: {}", started);
    assert_eq!(
        started["assigned_ports"]["api"],
        ports.api(7) as u64,
        "persisted assignment not honored: {}",
        started
    );

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);

    // Still on disk for the next start
    let env = fs::read_to_string(agent.env_file("alpha")).unwrap();
    assert!(env.contains(&format!("PORT={}", ports.api(7))), "{}", env);
}

#[test]
fn test_explicit_assignment_wins_and_persists() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    fs::write(agent.env_file("alpha"), format!("PORT={}\n", ports.api(7))).unwrap();

    // Explicit request body outranks both .env and the manifest default
    let (status, started) = api_post_json(
        "/services/alpha/start",
        json!({ "port_assignments": { "api": ports.api(9) } }),
    );
    assert_eq!(status, 200, "start failed: {}", started);
    assert_eq!(started["assigned_ports"]["api"], ports.api(9) as u64);

    let env = fs::read_to_string(agent.env_file("alpha")).unwrap();
    assert!(
        env.contains(&format!("PORT={}", ports.api(9))),
        "override not persisted: {}",
        env
    );

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_duplicate_default_scans_band() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(3)))
        // Same manifest default as alpha on purpose
        .service("beta", &echo_manifest("beta", ports.api(3)))
        .build();

    let (status, first) = api_post("/services/alpha/start");
    assert_eq!(status, 200, "start failed: {}", first);
    assert_eq!(first["assigned_ports"]["api"], ports.api(3) as u64);

    // Default taken: beta lands on the first free port of the api band
    let (status, second) = api_post("/services/beta/start");
    assert_eq!(status, 200, "start failed: {}", second);
    assert_eq!(
        second["assigned_ports"]["api"],
        ports.api(0) as u64,
        "band scan did not start at the band floor: {}",
        second
    );

    // Both keep running on their own ports
    let (_, alpha) = api_get("/services/alpha");
    let (_, beta) = api_get("/services/beta");
    assert_eq!(alpha["state"], "running");
    assert_eq!(beta["state"], "running");

    let (_, stopped) = api_post("/services/alpha/stop");
    assert_eq!(stopped["success"], true);
    let (_, stopped) = api_post("/services/beta/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_plain_start_honors_out_of_band_default() {
    let ports = reserve_port_block();
    let _agent = AgentBuilder::new()
        .service("loner", &echo_manifest("loner", ports.outside_bands(1)))
        .build();

    // An explicit manifest default is respected even outside the band
    let (status, started) = api_post("/services/loner/start");
    assert_eq!(status, 200, "start failed: {}", started);
    assert_eq!(
        started["assigned_ports"]["api"],
        ports.outside_bands(1) as u64
    );

    let (_, stopped) = api_post("/services/loner/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_start_auto_pulls_default_into_band() {
    let ports = reserve_port_block();
    let (api_start, api_end) = ports.api_band();
    let _agent = AgentBuilder::new()
        .service("drifter", &echo_manifest("drifter", ports.outside_bands(0)))
        .build();

    let (status, started) = api_post("/services/drifter/start-auto");
    assert_eq!(status, 200, "start failed: {}", started);
    assert!(
        started["message"]
            .as_str()
            .unwrap_or_default()
            .contains("auto-assigned"),
        "unexpected message: {}",
        started
    );
    let granted = started["assigned_ports"]["api"].as_u64().unwrap() as u16;
    assert!(
        (api_start..=api_end).contains(&granted),
        "auto port {} outside band {}-{}",
        granted,
        api_start,
        api_end
    );

    let (_, stopped) = api_post("/services/drifter/stop");
    assert_eq!(stopped["success"], true);
}

#[test]
fn test_ports_view_reports_configuration() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .build();

    let (status, view) = api_get("/services/alpha/ports");
    assert_eq!(status, 200, "ports view failed: {}", view);
    assert_eq!(view["service_id"], "alpha");
    assert_eq!(view["ports"]["api"]["env_var"], "PORT");
    assert_eq!(view["ports"]["api"]["default"], ports.api(0) as u64);
    assert_eq!(view["ports"]["api"]["configured"], ports.api(0) as u64);
    assert_eq!(view["ports"]["api"]["is_default"], true);

    fs::write(agent.env_file("alpha"), format!("PORT={}\n", ports.api(7))).unwrap();

    let (_, view) = api_get("/services/alpha/ports");
    assert_eq!(view["ports"]["api"]["configured"], ports.api(7) as u64);
    assert_eq!(view["ports"]["api"]["is_default"], false);
}

#[test]
fn test_assignments_view_lists_manifest_services() {
    let ports = reserve_port_block();
    let agent = AgentBuilder::new()
        .service("alpha", &echo_manifest("alpha", ports.api(0)))
        .service("beta", &echo_manifest("beta", ports.api(1)))
        .build();

    fs::write(agent.env_file("alpha"), format!("PORT={}\n", ports.api(5))).unwrap();

    let (status, body) = api_get("/ports/assignments");
    assert_eq!(status, 200, "assignments failed: {}", body);
    assert_eq!(body["total_services"], 2);

    let assignments = body["assignments"].as_array().cloned().unwrap_or_default();
    let alpha = assignments
        .iter()
        .find(|entry| entry["service_id"] == "alpha")
        .unwrap_or_else(|| panic!("alpha missing from assignments: {}", body));
    assert_eq!(alpha["ports"]["api"]["default"], ports.api(0) as u64);
    assert_eq!(alpha["ports"]["api"]["assigned"], ports.api(5) as u64);
    assert_eq!(alpha["ports"]["api"]["changed"], true);

    let beta = assignments
        .iter()
        .find(|entry| entry["service_id"] == "beta")
        .unwrap_or_else(|| panic!("beta missing from assignments: {}", body));
    assert_eq!(beta["ports"]["api"]["assigned"], ports.api(1) as u64);
    assert_eq!(beta["ports"]["api"]["changed"], false);
}
