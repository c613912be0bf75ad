//! VSync error taxonomy.

use thiserror::Error;

/// Status codes for vsync operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VsyncError {
    /// Bad rate, unknown connection, or duplicate registration.
    #[error("invalid arguments")]
    InvalidArguments,

    /// The distributor behind a connection's weak reference is gone.
    #[error("distributor no longer exists")]
    NullPtr,

    /// A syscall failed; carries the errno.
    #[error("os error {0}")]
    Os(i32),
}

impl VsyncError {
    pub(crate) fn last_os() -> Self {
        VsyncError::Os(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

/// Result alias used throughout the crate.
pub type VsyncResult<T> = Result<T, VsyncError>;
