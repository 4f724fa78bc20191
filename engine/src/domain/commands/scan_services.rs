//! ScanServices Command

/// Response from rescanning the service folders
#[derive(Debug, Clone, Default)]
pub struct ScanServicesResponse {
    /// Services seen for the first time
    pub added: usize,
    /// Known inactive services re-read from disk
    pub refreshed: usize,
    /// Inactive services whose folder disappeared
    pub removed: usize,
    /// Registry size after the merge
    pub total: usize,
}
