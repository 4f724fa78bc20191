//! Command handlers talking to the agent HTTP API

use crate::formatters::{format_health, format_state, format_timestamp, format_uptime};
use crate::options::{LogsOptions, StartOptions};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::time::Duration;
use tabwriter::TabWriter;

/// Thin blocking client over the agent API
pub struct ApiClient {
    agent: ureq::Agent,
    base: String,
}

impl ApiClient {
    pub fn new(host: &str, port: u16) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        ApiClient {
            agent,
            base: format!("http://{}:{}", host, port),
        }
    }

    fn get(&self, path: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let url = format!("{}{}", self.base, path);
        self.read(self.agent.get(&url).call())
    }

    fn post(&self, path: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let url = format!("{}{}", self.base, path);
        self.read(self.agent.post(&url).call())
    }

    fn post_json(&self, path: &str, body: Value) -> Result<Value, Box<dyn std::error::Error>> {
        let url = format!("{}{}", self.base, path);
        self.read(self.agent.post(&url).send_json(body))
    }

    /// Turn an API response into JSON, surfacing `{error}` bodies as text
    fn read(
        &self,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        match result {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(code, response)) => {
                let detail = response
                    .into_json::<Value>()
                    .ok()
                    .and_then(|body| body["error"].as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("HTTP {}", code));
                Err(detail.into())
            }
            Err(e) => Err(format!("cannot reach agent at {}: {}", self.base, e).into()),
        }
    }
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or("-")
}

/// Render an `{"api": 8412, ...}` port object as `api:8412 ...`
fn format_port_map(ports: &Value) -> String {
    let entries: Vec<String> = ports
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(name, port)| format!("{}:{}", name, port))
                .collect()
        })
        .unwrap_or_default();
    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.join(" ")
    }
}

pub fn handle_status(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let status = client.get("/status")?;

    println!("Agent Status");
    println!("{}", "─".repeat(45));
    println!("Machine ID:         {}", text(&status["machine_id"]));
    println!("Machine Name:       {}", text(&status["machine_name"]));
    println!(
        "Uptime:             {}",
        format_uptime(status["uptime_seconds"].as_u64().unwrap_or(0))
    );
    println!();

    let services = &status["services"];
    println!("Services");
    println!("{}", "─".repeat(45));
    println!(
        "Total:              {}",
        services["total"].as_u64().unwrap_or(0)
    );
    println!(
        "Running:            {}",
        services["running"].as_u64().unwrap_or(0)
    );
    println!(
        "Stopped:            {}",
        services["stopped"].as_u64().unwrap_or(0)
    );
    println!(
        "Failed:             {}",
        services["failed"].as_u64().unwrap_or(0)
    );
    println!();

    print_resources(&status["resources"]);
    Ok(())
}

pub fn handle_list(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let listing = client.get("/services")?;
    let mut services = listing["services"].as_array().cloned().unwrap_or_default();

    if services.is_empty() {
        println!("No services");
        return Ok(());
    }
    services.sort_by(|a, b| text(&a["service_id"]).cmp(text(&b["service_id"])));

    let mut tw = TabWriter::new(std::io::stdout());
    writeln!(tw, "ID\tSTATE\tPID\tPORTS\tUPTIME\tHEALTH")?;
    for service in &services {
        let pid = service["pid"]
            .as_u64()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let uptime = service["uptime_seconds"]
            .as_u64()
            .map(format_uptime)
            .unwrap_or_else(|| "-".to_string());
        let health = service["health"]["status"]
            .as_str()
            .map(|s| format_health(s).to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}",
            text(&service["service_id"]),
            format_state(text(&service["state"])),
            pid,
            format_port_map(&service["assigned_ports"]),
            uptime,
            health
        )?;
    }
    tw.flush()?;
    Ok(())
}

pub fn handle_show(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let id = args
        .get(1)
        .ok_or("usage: svc-agentctl show <id>")?;
    let detail = client.get(&format!("/services/{}", id))?;

    println!("\nService Details");
    println!("{}", "─".repeat(60));

    println!("\nBASIC INFORMATION");
    println!("  Name:            {}", text(&detail["name"]));
    println!("  ID:              {}", text(&detail["service_id"]));
    if let Some(description) = detail["description"].as_str() {
        println!("  Description:     {}", description);
    }
    println!(
        "  State:           {}",
        format_state(text(&detail["state"]))
    );
    println!("  Location:        {}", text(&detail["location"]));
    println!(
        "  Manifest:        {}",
        if detail["has_manifest"].as_bool().unwrap_or(false) {
            "present"
        } else {
            "missing"
        }
    );
    if let Some(version) = detail["version"].as_str() {
        println!("  Version:         {}", version);
    }
    if let Some(tags) = detail["tags"].as_array() {
        let joined: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
        if !joined.is_empty() {
            println!("  Tags:            {}", joined.join(", "));
        }
    }

    println!("\nRUNTIME");
    match detail["pid"].as_u64() {
        Some(pid) => println!("  PID:             {}", pid),
        None => println!("  PID:             -"),
    }
    println!(
        "  Ports:           {}",
        format_port_map(&detail["assigned_ports"])
    );
    if let Some(uptime) = detail["uptime_seconds"].as_u64() {
        println!("  Uptime:          {}", format_uptime(uptime));
    }
    if let Some(status) = detail["health"]["status"].as_str() {
        print!("  Health:          {}", format_health(status));
        if let Some(latency) = detail["health"]["latency_ms"].as_f64() {
            print!(" ({:.1} ms)", latency);
        }
        println!();
        if let Some(reason) = detail["health"]["detail"].as_str() {
            println!("  Health Detail:   {}", reason);
        }
    }
    if let Some(error) = detail["last_error"].as_str() {
        println!("  Last Error:      {}", error);
    }

    println!("\nLIFECYCLE");
    println!(
        "  Registered:      {}",
        format_timestamp(detail["registered_at"].as_u64().unwrap_or(0))
    );
    println!(
        "  Started:         {}",
        format_timestamp(detail["started_at"].as_u64().unwrap_or(0))
    );
    println!(
        "  Stopped:         {}",
        format_timestamp(detail["stopped_at"].as_u64().unwrap_or(0))
    );

    if let Some(logs) = detail["recent_logs"].as_array() {
        if !logs.is_empty() {
            println!("\nRECENT LOGS");
            for line in logs {
                println!("  {}", text(line));
            }
        }
    }

    println!();
    Ok(())
}

pub fn handle_start(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let opts = StartOptions::parse(args)
        .map_err(|e| format!("{}\nusage: svc-agentctl start <id> [--port name=N]... [--env K=V]... [--auto]", e))?;

    let path = if opts.auto {
        format!("/services/{}/start-auto", opts.service)
    } else {
        format!("/services/{}/start", opts.service)
    };

    let response = if opts.ports.is_empty() && opts.env.is_empty() {
        client.post(&path)?
    } else {
        let mut ports = Map::new();
        for (name, port) in &opts.ports {
            ports.insert(name.clone(), json!(port));
        }
        let mut env = Map::new();
        for (key, value) in &opts.env {
            env.insert(key.clone(), json!(value));
        }
        client.post_json(&path, json!({ "port_assignments": ports, "env": env }))?
    };

    print_lifecycle_outcome(&response);
    Ok(())
}

pub fn handle_stop(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let id = args
        .get(1)
        .ok_or("usage: svc-agentctl stop <id>")?;
    let response = client.post(&format!("/services/{}/stop", id))?;

    println!("[OK] {}", text(&response["message"]));
    println!("  State: {}", format_state(text(&response["state"])));
    Ok(())
}

pub fn handle_restart(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let id = args
        .get(1)
        .ok_or("usage: svc-agentctl restart <id>")?;
    let response = client.post(&format!("/services/{}/restart", id))?;

    print_lifecycle_outcome(&response);
    Ok(())
}

fn print_lifecycle_outcome(response: &Value) {
    println!("[OK] {}", text(&response["message"]));
    println!("  State: {}", format_state(text(&response["state"])));
    if let Some(pid) = response["pid"].as_u64() {
        println!("  PID:   {}", pid);
    }
    let ports = format_port_map(&response["assigned_ports"]);
    if ports != "-" {
        println!("  Ports: {}", ports);
    }
}

pub fn handle_health(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let id = args
        .get(1)
        .ok_or("usage: svc-agentctl health <id>")?;
    let verdict = client.get(&format!("/services/{}/health", id))?;

    let status = text(&verdict["status"]);
    print!("{}: {}", text(&verdict["service_id"]), format_health(status));
    if let Some(latency) = verdict["latency_ms"].as_f64() {
        print!(" ({:.1} ms)", latency);
    }
    println!();
    if let Some(detail) = verdict["detail"].as_str() {
        println!("  {}", detail);
    }

    if status != "healthy" {
        std::process::exit(1);
    }
    Ok(())
}

pub fn handle_logs(
    client: &ApiClient,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let opts = LogsOptions::parse(args)
        .map_err(|e| format!("{}\nusage: svc-agentctl logs <id> [--lines N]", e))?;

    let path = match opts.lines {
        Some(lines) => format!("/services/{}/logs?lines={}", opts.service, lines),
        None => format!("/services/{}/logs", opts.service),
    };
    let response = client.get(&path)?;

    match response["logs"].as_array() {
        Some(lines) if !lines.is_empty() => {
            for line in lines {
                println!("{}", text(line));
            }
        }
        _ => println!("No captured output"),
    }
    Ok(())
}

pub fn handle_scan(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let report = client.post("/scan")?;
    println!(
        "[OK] Scan complete: {} services known ({} new)",
        report["services_found"].as_u64().unwrap_or(0),
        report["new_services"].as_u64().unwrap_or(0)
    );
    Ok(())
}

pub fn handle_conflicts(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let report = client.get("/ports/conflicts")?;

    let conflicts = report["conflicts"].as_array().cloned().unwrap_or_default();
    if conflicts.is_empty() {
        println!("No port conflicts");
        return Ok(());
    }

    println!("{}", text(&report["message"]));
    let mut tw = TabWriter::new(std::io::stdout());
    writeln!(tw, "PORT\tNAME\tSERVICES")?;
    for conflict in &conflicts {
        let services: Vec<&str> = conflict["services"]
            .as_array()
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        writeln!(
            tw,
            "{}\t{}\t{}",
            conflict["port"].as_u64().unwrap_or(0),
            text(&conflict["port_name"]),
            services.join(", ")
        )?;
    }
    tw.flush()?;
    Ok(())
}

pub fn handle_resolve(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let report = client.post("/ports/resolve")?;
    println!("[OK] {}", text(&report["message"]));

    let changes = report["changes"].as_array().cloned().unwrap_or_default();
    if changes.is_empty() {
        return Ok(());
    }

    let mut tw = TabWriter::new(std::io::stdout());
    writeln!(tw, "SERVICE\tPORT\tFROM\tTO")?;
    for change in &changes {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            text(&change["service_id"]),
            text(&change["port_name"]),
            change["from_port"].as_u64().unwrap_or(0),
            change["to_port"].as_u64().unwrap_or(0)
        )?;
    }
    tw.flush()?;
    Ok(())
}

pub fn handle_resources(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = client.get("/resources")?;
    print_resources(&snapshot);
    Ok(())
}

fn print_resources(resources: &Value) {
    println!("Resources");
    println!("{}", "─".repeat(45));

    let memory = &resources["memory"];
    println!(
        "Memory:             {:.1} GB free of {:.1} GB ({:.0}% used)",
        memory["available_gb"].as_f64().unwrap_or(0.0),
        memory["total_gb"].as_f64().unwrap_or(0.0),
        memory["used_percent"].as_f64().unwrap_or(0.0)
    );

    let cpu = &resources["cpu"];
    println!(
        "CPU:                {} cores, {:.0}% used",
        cpu["cores"].as_u64().unwrap_or(0),
        cpu["used_percent"].as_f64().unwrap_or(0.0)
    );

    let disk = &resources["disk"];
    println!(
        "Disk:               {:.1} GB free of {:.1} GB ({:.0}% used)",
        disk["free_gb"].as_f64().unwrap_or(0.0),
        disk["total_gb"].as_f64().unwrap_or(0.0),
        disk["used_percent"].as_f64().unwrap_or(0.0)
    );

    let gpu = &resources["gpu"];
    if gpu.is_object() {
        println!(
            "GPU:                {} ({:.1} GB VRAM free of {:.1} GB, {:.0}% busy)",
            text(&gpu["name"]),
            gpu["vram_free_gb"].as_f64().unwrap_or(0.0),
            gpu["vram_total_gb"].as_f64().unwrap_or(0.0),
            gpu["utilization_percent"].as_f64().unwrap_or(0.0)
        );
    } else {
        println!("GPU:                none detected");
    }
}

pub fn handle_machine_info(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let info = client.get("/machine/info")?;

    println!("Machine");
    println!("{}", "─".repeat(45));
    println!("ID:                 {}", text(&info["machine_id"]));
    println!("Name:               {}", text(&info["machine_name"]));
    let identity = &info["identity"];
    println!("Hostname:           {}", text(&identity["hostname"]));
    println!("Platform:           {}", text(&identity["platform"]));
    println!("Short ID:           {}", text(&identity["short_id"]));
    println!();

    let current = &info["port_ranges"]["current"];
    println!(
        "Port bands:         api {}-{}  ui {}-{}",
        current["api"]["start"].as_u64().unwrap_or(0),
        current["api"]["end"].as_u64().unwrap_or(0),
        current["ui"]["start"].as_u64().unwrap_or(0),
        current["ui"]["end"].as_u64().unwrap_or(0)
    );
    println!();

    if let Some(all) = info["port_ranges"]["all_platforms"].as_object() {
        let mut tw = TabWriter::new(std::io::stdout());
        writeln!(tw, "SLOT\tAPI\tUI")?;
        for (slot, bands) in all {
            writeln!(
                tw,
                "{}\t{}-{}\t{}-{}",
                slot,
                bands["api"]["start"].as_u64().unwrap_or(0),
                bands["api"]["end"].as_u64().unwrap_or(0),
                bands["ui"]["start"].as_u64().unwrap_or(0),
                bands["ui"]["end"].as_u64().unwrap_or(0)
            )?;
        }
        tw.flush()?;
    }
    Ok(())
}
