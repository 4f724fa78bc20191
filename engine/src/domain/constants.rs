//! Domain Constants
//!
//! Common constants used throughout the domain layer

/// Exit code indicating successful process termination
pub const SUCCESS_EXIT_CODE: i32 = 0;

/// Manifest file name expected in each service folder
pub const MANIFEST_FILE_NAME: &str = "CAPABILITY.yaml";

/// Manifest schema version accepted by the parser
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";

/// Environment file holding persisted port assignments
pub const ENV_FILE_NAME: &str = ".env";

/// Fallback environment file consulted when .env is absent
pub const ENV_EXAMPLE_FILE_NAME: &str = ".env.example";

/// Comment written above port lines appended to .env files
pub const PORT_LINE_MARKER: &str = "# Port configured by service agent";

/// Start command assumed when a manifest omits one
pub const DEFAULT_START_COMMAND: &str = "python main.py";

/// Port default used when a manifest declares a port without one
pub const DEFAULT_SERVICE_PORT: u16 = 8000;

/// Health check path assumed for generated manifests
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Band used for port names with no platform band of their own
pub const FALLBACK_BAND_START: u16 = 8000;
pub const FALLBACK_BAND_END: u16 = 8999;

/// Default window for a started process to report ready, in seconds
pub const DEFAULT_READINESS_WINDOW_SEC: u64 = 60;

/// Default interval between readiness probes during startup, in milliseconds
pub const DEFAULT_STARTUP_POLL_INTERVAL_MS: u64 = 1000;

/// Default grace period after SIGTERM before escalating, in seconds
pub const DEFAULT_STOP_GRACE_SEC: u64 = 10;

/// Default wait after SIGKILL for the process to disappear, in seconds
pub const DEFAULT_KILL_WAIT_SEC: u64 = 5;

/// Default interval between background health sweeps, in seconds
pub const DEFAULT_HEALTH_INTERVAL_SEC: u64 = 60;

/// Default timeout for a single health probe, in seconds
pub const DEFAULT_HEALTH_TIMEOUT_SEC: u64 = 5;

/// Pause between the stop and start halves of a restart, in milliseconds
pub const RESTART_SETTLE_MS: u64 = 1000;

/// Interval used when polling for process liveness, in milliseconds
pub const EXIT_POLL_INTERVAL_MS: u64 = 100;

/// Captured output ring buffer trims to LOG_BUFFER_TRIM_TO once it
/// reaches LOG_BUFFER_MAX_LINES
pub const LOG_BUFFER_MAX_LINES: usize = 1000;
pub const LOG_BUFFER_TRIM_TO: usize = 500;

/// Default number of log lines returned when none are requested
pub const DEFAULT_LOG_TAIL_LINES: usize = 100;

/// Default VRAM held back from admission decisions, in GB
pub const DEFAULT_GPU_VRAM_RESERVE_GB: f64 = 2.0;

/// Default RAM held back from admission decisions, in GB
pub const DEFAULT_RAM_RESERVE_GB: f64 = 4.0;
