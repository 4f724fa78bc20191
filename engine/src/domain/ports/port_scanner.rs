//! PortScanner port
//! Interface for checking whether a TCP port is bindable

/// Port for OS-level port availability checks
///
/// Deliberately synchronous: a bind probe is instantaneous and the
/// allocator calls it while holding its table lock.
pub trait PortScanner: Send + Sync {
    /// True when nothing on this machine currently holds the port
    fn is_free(&self, port: u16) -> bool;
}
