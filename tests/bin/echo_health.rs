//! Minimal HTTP service managed by the agent in end-to-end tests
//!
//! Binds the port named by the PORT environment variable and answers every
//! request with 200 OK. Flags select the failure modes the agent has to
//! handle:
//!
//!   --never-ready        never bind, sleep until killed
//!   --crash-after-ms N   exit after N milliseconds
//!   --exit-code N        exit code used by --crash-after-ms (default 3)
//!   --ignore-term        ignore SIGTERM so stopping has to escalate

use std::env;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::process;
use std::thread;
use std::time::Duration;

struct Flags {
    never_ready: bool,
    ignore_term: bool,
    crash_after_ms: Option<u64>,
    exit_code: i32,
}

fn parse_flags() -> Flags {
    let mut flags = Flags {
        never_ready: false,
        ignore_term: false,
        crash_after_ms: None,
        exit_code: 3,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--never-ready" => flags.never_ready = true,
            "--ignore-term" => flags.ignore_term = true,
            "--crash-after-ms" => {
                flags.crash_after_ms = args.next().and_then(|v| v.parse().ok());
            }
            "--exit-code" => {
                if let Some(code) = args.next().and_then(|v| v.parse().ok()) {
                    flags.exit_code = code;
                }
            }
            other => {
                eprintln!("unknown flag: {}", other);
                process::exit(2);
            }
        }
    }
    flags
}

fn main() {
    let flags = parse_flags();

    if flags.ignore_term {
        unsafe {
            libc::signal(libc::SIGTERM, libc::SIG_IGN);
        }
    }

    if let Some(delay_ms) = flags.crash_after_ms {
        let code = flags.exit_code;
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            eprintln!("crashing with exit code {}", code);
            process::exit(code);
        });
    }

    if flags.never_ready {
        loop {
            thread::sleep(Duration::from_secs(1));
        }
    }

    let port: u16 = match env::var("PORT").ok().and_then(|v| v.parse().ok()) {
        Some(port) => port,
        None => {
            eprintln!("PORT not set or not a port number");
            process::exit(2);
        }
    };

    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind port {}: {}", port, e);
            process::exit(2);
        }
    };

    // The log pipe is block-buffered, flush so the agent captures the line
    println!("listening on {}", port);
    let _ = std::io::stdout().flush();

    for stream in listener.incoming() {
        let Ok(mut stream) = stream else { continue };
        let mut buffer = [0u8; 1024];
        let _ = stream.read(&mut buffer);
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        );
    }
}
