//! Transports for the agent API
//!
//! Same-host callers reach the daemon over a Unix domain socket; TCP is
//! kept for remote callers and is the only transport on Windows.

use axum::Router;
use std::future::Future;
use tracing::info;

#[cfg(unix)]
use hyper::server::accept;
#[cfg(unix)]
use std::path::Path;
#[cfg(unix)]
use tokio::net::UnixListener;
#[cfg(unix)]
use tokio_stream::wrappers::UnixListenerStream;
#[cfg(unix)]
use tracing::warn;

/// Port used when the socket transport is requested on Windows
#[cfg(windows)]
const WINDOWS_FALLBACK_ADDR: &str = "127.0.0.1:9100";

/// Make `path` bindable: drop a stale socket file left by a previous
/// run and create the parent directory when it is missing.
#[cfg(unix)]
fn claim_socket_path(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        info!(socket = %path.display(), "Removing stale socket file");
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Serve the agent API on a Unix domain socket.
///
/// The socket file is chmodded to 0660 so only the daemon's owner and
/// group can issue commands.
#[cfg(unix)]
pub async fn serve_on_unix_socket(
    socket_path: &str,
    app: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(socket_path);
    claim_socket_path(path)?;

    let listener = UnixListener::bind(socket_path)?;
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o660))?;
    }

    info!(socket = socket_path, "Agent API listening on Unix socket");

    let stream = UnixListenerStream::new(listener);
    axum::Server::builder(accept::from_stream(stream))
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    if path.exists() {
        warn!(socket = socket_path, "Cleaning up socket file");
        let _ = std::fs::remove_file(path);
    }

    Ok(())
}

/// Windows build: the socket transport degrades to loopback TCP.
#[cfg(windows)]
pub async fn serve_on_unix_socket(
    _socket_path: &str,
    app: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = WINDOWS_FALLBACK_ADDR.parse()?;

    info!(%addr, "Agent API listening on TCP (no Unix sockets on this platform)");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Serve the agent API on plain TCP.
pub async fn serve_on_tcp(
    addr: std::net::SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(%addr, "Agent API listening on TCP");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
