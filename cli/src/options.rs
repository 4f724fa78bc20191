//! Command-line option parsing

use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9100;

/// Connection options shared by every command
///
/// Flags may appear before the command name; `SVC_AGENT_HOST` and
/// `SVC_AGENT_PORT` are the fallbacks when no flag is given.
pub struct GlobalOptions {
    pub host: String,
    pub port: u16,
}

impl GlobalOptions {
    /// Split leading `--host`/`--port` flags from the command and its args
    pub fn parse(args: &[String]) -> Result<(Self, Vec<String>), String> {
        let mut host = env::var("SVC_AGENT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let mut port = env::var("SVC_AGENT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    i += 1;
                    host = args
                        .get(i)
                        .ok_or_else(|| "--host requires a value".to_string())?
                        .clone();
                }
                "--port" => {
                    i += 1;
                    let raw = args
                        .get(i)
                        .ok_or_else(|| "--port requires a value".to_string())?;
                    port = raw
                        .parse()
                        .map_err(|_| format!("invalid --port value: {}", raw))?;
                }
                _ => break,
            }
            i += 1;
        }

        Ok((GlobalOptions { host, port }, args[i..].to_vec()))
    }
}

/// Options for the start and restart commands
#[derive(Default)]
pub struct StartOptions {
    pub service: String,
    pub ports: Vec<(String, u16)>,
    pub env: Vec<(String, String)>,
    pub auto: bool,
}

impl StartOptions {
    /// Expected format: start <id> [--port name=N]... [--env K=V]... [--auto]
    pub fn parse(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("missing service id".to_string());
        }

        let mut opts = StartOptions {
            service: args[1].clone(),
            ..Default::default()
        };

        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    i += 1;
                    let raw = args
                        .get(i)
                        .ok_or_else(|| "--port requires name=NUMBER".to_string())?;
                    opts.ports.push(parse_port_spec(raw)?);
                }
                "--env" => {
                    i += 1;
                    let raw = args
                        .get(i)
                        .ok_or_else(|| "--env requires KEY=VALUE".to_string())?;
                    opts.env.push(parse_env_spec(raw)?);
                }
                "--auto" => opts.auto = true,
                other => return Err(format!("unknown flag: {}", other)),
            }
            i += 1;
        }

        Ok(opts)
    }
}

/// Options for the logs command
pub struct LogsOptions {
    pub service: String,
    pub lines: Option<usize>,
}

impl LogsOptions {
    /// Expected format: logs <id> [--lines N]
    pub fn parse(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("missing service id".to_string());
        }

        let mut opts = LogsOptions {
            service: args[1].clone(),
            lines: None,
        };

        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--lines" | "-n" => {
                    i += 1;
                    let raw = args
                        .get(i)
                        .ok_or_else(|| "--lines requires a number".to_string())?;
                    opts.lines = Some(
                        raw.parse()
                            .map_err(|_| format!("invalid --lines value: {}", raw))?,
                    );
                }
                other => return Err(format!("unknown flag: {}", other)),
            }
            i += 1;
        }

        Ok(opts)
    }
}

/// Parse a `name=NUMBER` port assignment
fn parse_port_spec(raw: &str) -> Result<(String, u16), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid port assignment (use name=NUMBER): {}", raw))?;
    if name.is_empty() {
        return Err(format!("invalid port assignment (empty name): {}", raw));
    }
    let port = value
        .parse()
        .map_err(|_| format!("invalid port number: {}", value))?;
    Ok((name.to_string(), port))
}

/// Parse a `KEY=VALUE` environment pair
fn parse_env_spec(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid env pair (use KEY=VALUE): {}", raw))?;
    if key.is_empty() {
        return Err(format!("invalid env pair (empty key): {}", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
