//! Surface error taxonomy
//!
//! Every fallible queue/buffer operation returns one of these status values.
//! The set is stable: IPC layers map them across process boundaries by
//! discriminant, so variants are never reordered.

use thiserror::Error;

/// Status codes for buffer pipeline operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Input failed validation (dimensions, stride alignment, format, ...).
    #[error("invalid arguments")]
    InvalidArguments,

    /// Operation is illegal in the current state or queue mode
    /// (e.g. cancel on a shared queue).
    #[error("operation invalid in current state")]
    InvalidOperating,

    /// Pool exhausted (producer) or dirty list empty (consumer).
    #[error("no buffer available")]
    NoBuffer,

    /// Sequence not present in the cache, or present in the wrong state.
    #[error("no such entry")]
    NoEntry,

    /// No consumer listener is installed on the queue.
    #[error("no consumer listener registered")]
    NoConsumer,

    /// An attach could not make enough room in the cache.
    #[error("out of range")]
    OutOfRange,

    /// Typed extra-data lookup found a value of a different type.
    #[error("extra data type mismatch")]
    TypeMismatch,

    /// The allocator or an underlying syscall failed; carries the errno.
    #[error("os error {0}")]
    Os(i32),
}

impl SurfaceError {
    /// Capture the current `errno` as an [`SurfaceError::Os`] value.
    pub(crate) fn last_os() -> Self {
        SurfaceError::Os(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

/// Result alias used throughout the crate.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(SurfaceError::NoBuffer.to_string(), "no buffer available");
        assert_eq!(SurfaceError::Os(22).to_string(), "os error 22");
    }
}
