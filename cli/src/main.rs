mod commands;
mod formatters;
mod options;

use commands::ApiClient;
use options::GlobalOptions;
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    let (global, rest) = match GlobalOptions::parse(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if rest.is_empty() {
        print_usage();
        return;
    }

    let client = ApiClient::new(&global.host, global.port);

    // Dispatch to command handlers
    let result = match rest[0].as_str() {
        "status" => commands::handle_status(&client),
        "list" | "ls" => commands::handle_list(&client),
        "show" | "describe" => commands::handle_show(&client, &rest),
        "start" => commands::handle_start(&client, &rest),
        "stop" => commands::handle_stop(&client, &rest),
        "restart" => commands::handle_restart(&client, &rest),
        "health" => commands::handle_health(&client, &rest),
        "logs" => commands::handle_logs(&client, &rest),
        "scan" => commands::handle_scan(&client),
        "conflicts" => commands::handle_conflicts(&client),
        "resolve" => commands::handle_resolve(&client),
        "resources" => commands::handle_resources(&client),
        "machine-info" => commands::handle_machine_info(&client),
        other => {
            eprintln!("unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Service Agent CLI");
    eprintln!();
    eprintln!("Usage: svc-agentctl [--host H] [--port P] <command> [args...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                               Agent summary with service counts");
    eprintln!("  list                                 List all services (aliases: ls)");
    eprintln!("  show <id>                            Show detailed service information (aliases: describe)");
    eprintln!("  start <id> [--port name=N]...        Start a service; repeatable port/env overrides");
    eprintln!("        [--env K=V]... [--auto]        --auto plans free ports in the machine band");
    eprintln!("  stop <id>                            Stop a service");
    eprintln!("  restart <id>                         Restart a service");
    eprintln!("  health <id>                          Probe a service (exit 0 if healthy)");
    eprintln!("  logs <id> [--lines N]                Show captured output");
    eprintln!("  scan                                 Rescan the configured service folders");
    eprintln!("  conflicts                            List configured-port conflicts");
    eprintln!("  resolve                              Rewrite conflicting port assignments");
    eprintln!("  resources                            Current machine resource snapshot");
    eprintln!("  machine-info                         Identity and port band table");
    eprintln!();
    eprintln!("Environment Variables:");
    eprintln!("  SVC_AGENT_HOST   Agent host when --host is not given (default: 127.0.0.1)");
    eprintln!("  SVC_AGENT_PORT   Agent port when --port is not given (default: 9100)");
}
