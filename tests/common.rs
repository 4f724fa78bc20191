//! Common utilities for end-to-end agent tests
//!
//! Each test boots a real `svc-agentd` on a private port with a throwaway
//! services folder, drives it over the HTTP API (and `svc-agentctl`), and
//! tears it down through the returned guard. Tests run in parallel, so
//! every test thread reserves a disjoint block of ports: the agent listens
//! on the block base and the configured port bands live inside the block.
//!
//! When a test panics, the last lines of the agent's captured stdout and
//! stderr are printed automatically (a panic hook installed via `#[ctor]`),
//! which is the only way to see what the daemon was doing in CI.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// First port handed to test agents; every test gets its own block above this
const BASE_PORT: u16 = 50000;

/// Ports reserved per test: agent endpoint, api band, ui band, out-of-band spares
const BLOCK_SPAN: u16 = 200;

static BLOCK_COUNTER: AtomicU16 = AtomicU16::new(0);

thread_local! {
    static TEST_BLOCK: Cell<Option<u16>> = const { Cell::new(None) };
    static AGENT_LOG_FILES: RefCell<Option<(String, String)>> = const { RefCell::new(None) };
}

// Installed when the test binary loads, before any test runs
#[ctor::ctor]
fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        print_agent_log_tail(50);
    }));
}

/// Print the last `lines` lines of the agent's stdout and stderr logs
pub fn print_agent_log_tail(lines: usize) {
    let files = AGENT_LOG_FILES.with(|slot| slot.borrow().clone());
    let Some((stdout_path, stderr_path)) = files else {
        return;
    };
    for (label, path) in [("stdout", stdout_path), ("stderr", stderr_path)] {
        let contents = fs::read_to_string(&path).unwrap_or_default();
        let all: Vec<&str> = contents.lines().collect();
        if all.is_empty() {
            continue;
        }
        let start = all.len().saturating_sub(lines);
        eprintln!("\n=== agent {} (last {} lines of {}) ===", label, all.len() - start, path);
        for line in &all[start..] {
            eprintln!("{}", line);
        }
    }
}

/// Path to the agent daemon binary, override with SVC_AGENT_DAEMON_BINARY
pub fn agent_binary() -> &'static str {
    if let Ok(path) = std::env::var("SVC_AGENT_DAEMON_BINARY") {
        Box::leak(path.into_boxed_str())
    } else {
        "../target/debug/svc-agentd"
    }
}

/// Path to the CLI binary, override with SVC_AGENT_CTL_BINARY
pub fn ctl_binary() -> &'static str {
    if let Ok(path) = std::env::var("SVC_AGENT_CTL_BINARY") {
        Box::leak(path.into_boxed_str())
    } else {
        "../target/debug/svc-agentctl"
    }
}

/// Absolute path to the echo-health helper binary.
///
/// Service processes run with the service folder as working directory, so
/// manifests must reference the helper by absolute path.
pub fn echo_binary() -> String {
    let path = Path::new("../target/debug/echo-health");
    match path.canonicalize() {
        Ok(absolute) => absolute.display().to_string(),
        Err(e) => panic!(
            "echo-health helper not found at {} ({}). Did you run cargo build?",
            path.display(),
            e
        ),
    }
}

/// A disjoint slice of the port space owned by one test thread
///
/// Layout within the block: offset 0 is the agent's own HTTP port,
/// 10-99 the api band, 100-149 the ui band, and 150 upward ports that
/// belong to no configured band (for out-of-band manifest defaults).
#[derive(Debug, Clone, Copy)]
pub struct PortBlock {
    base: u16,
}

impl PortBlock {
    pub fn agent(&self) -> u16 {
        self.base
    }

    pub fn api_band(&self) -> (u16, u16) {
        (self.base + 10, self.base + 99)
    }

    pub fn ui_band(&self) -> (u16, u16) {
        (self.base + 100, self.base + 149)
    }

    /// The `offset`-th port of the api band
    pub fn api(&self, offset: u16) -> u16 {
        self.base + 10 + offset
    }

    /// The `offset`-th port of the ui band
    pub fn ui(&self, offset: u16) -> u16 {
        self.base + 100 + offset
    }

    /// A port outside both configured bands
    pub fn outside_bands(&self, offset: u16) -> u16 {
        self.base + 150 + offset
    }
}

/// Reserve (or return this thread's existing) port block
pub fn reserve_port_block() -> PortBlock {
    TEST_BLOCK.with(|slot| {
        if let Some(base) = slot.get() {
            return PortBlock { base };
        }
        let index = BLOCK_COUNTER.fetch_add(1, Ordering::SeqCst);
        let base = BASE_PORT + index * BLOCK_SPAN;
        slot.set(Some(base));
        PortBlock { base }
    })
}

fn current_agent_port() -> u16 {
    TEST_BLOCK
        .with(|slot| slot.get())
        .expect("no agent started on this test thread")
}

/// Configures and boots a test agent
pub struct AgentBuilder {
    readiness_window_secs: u64,
    startup_poll_ms: u64,
    stop_grace_secs: u64,
    kill_wait_secs: u64,
    health_enabled: bool,
    health_interval_secs: u64,
    health_timeout_secs: u64,
    auto_resolve_conflicts: bool,
    always_running: Vec<String>,
    machine_name: Option<String>,
    log_level: String,
    services: Vec<(String, Option<String>)>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        AgentBuilder {
            readiness_window_secs: 10,
            startup_poll_ms: 100,
            stop_grace_secs: 2,
            kill_wait_secs: 2,
            health_enabled: true,
            // Long enough that no sweep fires unless a test asks for one
            health_interval_secs: 300,
            health_timeout_secs: 2,
            auto_resolve_conflicts: false,
            always_running: Vec::new(),
            machine_name: None,
            log_level: "debug".to_string(),
            services: Vec::new(),
        }
    }

    pub fn readiness_window(mut self, secs: u64) -> Self {
        self.readiness_window_secs = secs;
        self
    }

    pub fn startup_poll_ms(mut self, ms: u64) -> Self {
        self.startup_poll_ms = ms;
        self
    }

    pub fn stop_grace(mut self, secs: u64) -> Self {
        self.stop_grace_secs = secs;
        self
    }

    pub fn kill_wait(mut self, secs: u64) -> Self {
        self.kill_wait_secs = secs;
        self
    }

    /// Enable the background health sweep at the given interval
    pub fn health_sweep(mut self, interval_secs: u64) -> Self {
        self.health_enabled = true;
        self.health_interval_secs = interval_secs;
        self
    }

    pub fn no_health_sweep(mut self) -> Self {
        self.health_enabled = false;
        self
    }

    pub fn auto_resolve_conflicts(mut self, enabled: bool) -> Self {
        self.auto_resolve_conflicts = enabled;
        self
    }

    pub fn always_running(mut self, id: &str) -> Self {
        self.always_running.push(id.to_string());
        self
    }

    pub fn machine_name(mut self, name: &str) -> Self {
        self.machine_name = Some(name.to_string());
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    /// Seed a service folder with the given manifest before the agent boots
    pub fn service(mut self, id: &str, manifest: &str) -> Self {
        self.services.push((id.to_string(), Some(manifest.to_string())));
        self
    }

    /// Seed a service folder with a README but no manifest before the
    /// agent boots
    pub fn bare_service(mut self, id: &str) -> Self {
        self.services.push((id.to_string(), None));
        self
    }

    pub fn build(self) -> AgentGuard {
        start_agent(self)
    }
}

/// Handle to a running test agent; stops it on drop
#[must_use]
pub struct AgentGuard {
    root: tempfile::TempDir,
    child: Option<Child>,
    block: PortBlock,
    stdout_log: String,
    stderr_log: String,
}

impl AgentGuard {
    pub fn ports(&self) -> PortBlock {
        self.block
    }

    pub fn agent_port(&self) -> u16 {
        self.block.agent()
    }

    pub fn services_root(&self) -> PathBuf {
        self.root.path().join("services")
    }

    pub fn service_dir(&self, id: &str) -> PathBuf {
        self.services_root().join(id)
    }

    pub fn env_file(&self, id: &str) -> PathBuf {
        self.service_dir(id).join(".env")
    }

    /// Create a service folder with a manifest; callers rescan to register it
    pub fn add_service(&self, id: &str, manifest: &str) -> PathBuf {
        let dir = self.service_dir(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CAPABILITY.yaml"), manifest).unwrap();
        dir
    }

    /// Create a service folder with a README but no manifest
    pub fn add_bare_service(&self, id: &str) -> PathBuf {
        let dir = self.service_dir(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README.md"), "# service under test\n").unwrap();
        dir
    }

    pub fn remove_service(&self, id: &str) {
        fs::remove_dir_all(self.service_dir(id)).unwrap();
    }

    pub fn stdout_logs(&self) -> String {
        fs::read_to_string(&self.stdout_log).unwrap_or_default()
    }

    pub fn stderr_logs(&self) -> String {
        fs::read_to_string(&self.stderr_log).unwrap_or_default()
    }
}

impl Drop for AgentGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id() as i32;
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        // Graceful shutdown stops every service; allow time for escalation
        let deadline = Instant::now() + Duration::from_secs(15);
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(50));
                }
                _ => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break;
                }
            }
        }
    }
}

fn start_agent(builder: AgentBuilder) -> AgentGuard {
    let block = reserve_port_block();
    let root = tempfile::Builder::new()
        .prefix("svc-agent-e2e-")
        .tempdir()
        .unwrap();

    let services_root = root.path().join("services");
    fs::create_dir_all(&services_root).unwrap();
    for (id, manifest) in &builder.services {
        let dir = services_root.join(id);
        fs::create_dir_all(&dir).unwrap();
        match manifest {
            Some(yaml) => fs::write(dir.join("CAPABILITY.yaml"), yaml).unwrap(),
            None => fs::write(dir.join("README.md"), "# service under test\n").unwrap(),
        }
    }

    let config_path = root.path().join("config.yaml");
    fs::write(&config_path, render_config(&builder, block, &services_root)).unwrap();

    let stdout_log = format!("/tmp/svc-agentd-{}.stdout.log", block.agent());
    let stderr_log = format!("/tmp/svc-agentd-{}.stderr.log", block.agent());
    let stdout_file = File::create(&stdout_log).unwrap();
    let stderr_file = File::create(&stderr_log).unwrap();

    AGENT_LOG_FILES.with(|slot| {
        *slot.borrow_mut() = Some((stdout_log.clone(), stderr_log.clone()));
    });

    let child = Command::new(agent_binary())
        .env("SVC_AGENT_CONFIG", &config_path)
        .env("RUST_LOG", &builder.log_level)
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .unwrap_or_else(|e| {
            panic!(
                "Failed to start agent at {}: {}. Did you run cargo build?",
                agent_binary(),
                e
            )
        });
    let pid = child.id();

    let guard = AgentGuard {
        root,
        child: Some(child),
        block,
        stdout_log: stdout_log.clone(),
        stderr_log: stderr_log.clone(),
    };

    if !wait_for_agent(15) {
        panic!(
            "Agent (pid {}) did not answer on port {} within 15s",
            pid,
            block.agent()
        );
    }

    println!("Agent started (pid {}, port {})", pid, block.agent());
    println!("  stdout: {}", stdout_log);
    println!("  stderr: {}", stderr_log);

    guard
}

fn render_config(builder: &AgentBuilder, block: PortBlock, services_root: &Path) -> String {
    let (api_start, api_end) = block.api_band();
    let (ui_start, ui_end) = block.ui_band();

    let mut yaml = format!(
        "agent:\n  host: 127.0.0.1\n  port: {}\n  log_level: {}\n",
        block.agent(),
        builder.log_level
    );
    if let Some(name) = &builder.machine_name {
        yaml.push_str(&format!("machine:\n  name: {}\n", name));
    }
    yaml.push_str(&format!(
        "port_ranges:\n  api_start: {}\n  api_end: {}\n  ui_start: {}\n  ui_end: {}\n  auto_resolve_conflicts: {}\n",
        api_start, api_end, ui_start, ui_end, builder.auto_resolve_conflicts
    ));
    yaml.push_str(&format!(
        "health_check:\n  enabled: {}\n  interval_seconds: {}\n  timeout_seconds: {}\n",
        builder.health_enabled, builder.health_interval_secs, builder.health_timeout_secs
    ));
    yaml.push_str(&format!(
        "lifecycle:\n  readiness_window_seconds: {}\n  startup_poll_interval_ms: {}\n  stop_grace_seconds: {}\n  kill_wait_seconds: {}\n",
        builder.readiness_window_secs,
        builder.startup_poll_ms,
        builder.stop_grace_secs,
        builder.kill_wait_secs
    ));
    yaml.push_str(&format!(
        "services:\n  folders:\n    - {}\n",
        services_root.display()
    ));
    if builder.always_running.is_empty() {
        yaml.push_str("  always_running: []\n");
    } else {
        yaml.push_str("  always_running:\n");
        for id in &builder.always_running {
            yaml.push_str(&format!("    - {}\n", id));
        }
    }
    yaml
}

fn http() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(10))
        .build()
}

fn agent_url(path: &str) -> String {
    format!("http://127.0.0.1:{}{}", current_agent_port(), path)
}

fn dispatch(request: ureq::Request, body: Option<Value>) -> (u16, Value) {
    let result = match body {
        Some(json) => request.send_json(json),
        None => request.call(),
    };
    match result {
        Ok(response) => {
            let status = response.status();
            (status, response.into_json::<Value>().unwrap_or(Value::Null))
        }
        Err(ureq::Error::Status(code, response)) => {
            (code, response.into_json::<Value>().unwrap_or(Value::Null))
        }
        Err(e) => panic!("agent request failed: {}", e),
    }
}

/// GET against the agent API, returning (status, body)
pub fn api_get(path: &str) -> (u16, Value) {
    dispatch(http().get(&agent_url(path)), None)
}

/// POST with an empty body
pub fn api_post(path: &str) -> (u16, Value) {
    dispatch(http().post(&agent_url(path)), None)
}

/// POST with a JSON body
pub fn api_post_json(path: &str, body: Value) -> (u16, Value) {
    dispatch(http().post(&agent_url(path)), Some(body))
}

/// Wait for the agent's status endpoint to answer
pub fn wait_for_agent(timeout_secs: u64) -> bool {
    let url = agent_url("/status");
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    while Instant::now() < deadline {
        if let Ok(response) = http().get(&url).call() {
            if response.status() == 200 {
                return true;
            }
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

/// Poll until the service reports the given state
pub fn wait_for_state(service: &str, state: &str, timeout_secs: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    while Instant::now() < deadline {
        let (status, body) = api_get(&format!("/services/{}", service));
        if status == 200 && body["state"] == state {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    false
}

/// Current state string for a registered service
pub fn service_state(service: &str) -> String {
    let (status, body) = api_get(&format!("/services/{}", service));
    assert_eq!(status, 200, "service lookup failed: {}", body);
    body["state"].as_str().unwrap_or_default().to_string()
}

/// Run the CLI against this thread's agent, returning (stdout, stderr, exit code)
pub fn run_ctl(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(ctl_binary())
        .args(args)
        .env("SVC_AGENT_HOST", "127.0.0.1")
        .env("SVC_AGENT_PORT", current_agent_port().to_string())
        .output()
        .unwrap_or_else(|e| {
            panic!(
                "Failed to run CLI at {}: {}. Did you run cargo build?",
                ctl_binary(),
                e
            )
        });
    (
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    )
}

/// Manifest for an echo-health service listening on `api_port`
pub fn echo_manifest(id: &str, api_port: u16) -> String {
    echo_manifest_with(id, api_port, "")
}

/// Manifest for echo-health with extra command-line flags (crash timers,
/// signal modes). `exec` keeps the service pid equal to the spawned pid.
pub fn echo_manifest_with(id: &str, api_port: u16, extra_flags: &str) -> String {
    let mut command = format!("exec {}", echo_binary());
    if !extra_flags.is_empty() {
        command.push(' ');
        command.push_str(extra_flags);
    }
    format!(
        r#"service:
  id: {id}
  name: {id}
runtime:
  start_command: "{command}"
  ports:
    api:
      default: {api_port}
      env_var: PORT
endpoints:
  api:
    health_check: /health
"#
    )
}

/// Manifest for echo-health with both an api and a ui port
pub fn echo_manifest_with_ui(id: &str, api_port: u16, ui_port: u16) -> String {
    format!(
        r#"service:
  id: {id}
  name: {id}
runtime:
  start_command: "exec {command}"
  ports:
    api:
      default: {api_port}
      env_var: PORT
    ui:
      default: {ui_port}
      env_var: UI_PORT
endpoints:
  api:
    health_check: /health
  ui:
    path: /
"#,
        command = echo_binary()
    )
}
