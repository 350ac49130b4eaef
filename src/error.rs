use thiserror::Error;

/// Failures surfaced by peripheral sessions and task loops.
///
/// Initialization failures are reported to the owning task loop, which logs
/// and retries on its back-off cadence. Per-iteration operate failures are
/// logged and swallowed so a transient fault never kills a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Caller-supplied parameter was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The underlying bus or device setup failed.
    #[error("driver initialization failed")]
    DriverInit,
    /// A discovery scan completed without registering any device.
    #[error("no devices found")]
    NoDevicesFound,
    /// Operation attempted on a session that was never initialized or has
    /// already been torn down.
    #[error("session not initialized")]
    NotInitialized,
    /// An underlying driver call failed after initialization.
    #[error("driver operation failed")]
    OperationFailed,
}
