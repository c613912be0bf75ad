//! Cross-process synchronization fences.
//!
//! A fence is an opaque kernel object surfaced as a file descriptor; it
//! becomes readable when signaled. The queue never waits on fences itself, it
//! only carries them between producer and consumer.

use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::Arc;

use crate::error::{SurfaceError, SurfaceResult};

/// An acquire or release fence handed through the queue.
///
/// Clones share the same descriptor. The invalid fence is the out-of-band
/// "nothing to wait on" sentinel.
#[derive(Debug, Clone)]
pub struct SyncFence {
    fd: Option<Arc<OwnedFd>>,
}

impl SyncFence {
    /// The sentinel fence: already signaled, carries no descriptor.
    pub const INVALID: SyncFence = SyncFence { fd: None };

    /// Wrap a signaled-on-readable descriptor.
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd: Some(Arc::new(fd)) }
    }

    pub fn is_valid(&self) -> bool {
        self.fd.is_some()
    }

    /// Borrow the descriptor, if any.
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        self.fd.as_deref().map(|fd| unsafe { BorrowedFd::borrow_raw(fd.as_raw_fd()) })
    }

    /// Raw descriptor value, `-1` for the invalid fence.
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_deref().map(|fd| fd.as_raw_fd()).unwrap_or(-1)
    }

    /// Duplicate the underlying descriptor (for serialization).
    pub(crate) fn dup_fd(&self) -> SurfaceResult<Option<OwnedFd>> {
        match self.fd.as_deref() {
            None => Ok(None),
            Some(fd) => fd.try_clone().map(Some).map_err(|_| SurfaceError::last_os()),
        }
    }

    /// Block until the fence signals or `timeout_ms` elapses.
    ///
    /// Returns `Ok(true)` when signaled, `Ok(false)` on timeout. The invalid
    /// fence is treated as already signaled. A negative timeout waits
    /// forever.
    pub fn wait(&self, timeout_ms: i32) -> SurfaceResult<bool> {
        let Some(fd) = self.fd.as_deref() else {
            return Ok(true);
        };
        let mut pfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if ret > 0 {
                return Ok(true);
            }
            if ret == 0 {
                return Ok(false);
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(SurfaceError::Os(err.raw_os_error().unwrap_or(0)));
        }
    }
}

impl From<OwnedFd> for SyncFence {
    fn from(fd: OwnedFd) -> Self {
        SyncFence::new(fd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::FromRawFd;

    fn pipe_fence() -> (SyncFence, std::fs::File) {
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let read = unsafe { OwnedFd::from_raw_fd(fds[0]) };
        let write = unsafe { std::fs::File::from_raw_fd(fds[1]) };
        (SyncFence::new(read), write)
    }

    #[test]
    fn test_invalid_fence_is_signaled() {
        assert!(!SyncFence::INVALID.is_valid());
        assert_eq!(SyncFence::INVALID.raw_fd(), -1);
        assert_eq!(SyncFence::INVALID.wait(0), Ok(true));
    }

    #[test]
    fn test_wait_times_out_until_signaled() {
        let (fence, mut write) = pipe_fence();
        assert_eq!(fence.wait(10), Ok(false));
        write.write_all(&[1u8]).unwrap();
        assert_eq!(fence.wait(1000), Ok(true));
    }

    #[test]
    fn test_clone_shares_descriptor() {
        let (fence, _write) = pipe_fence();
        let other = fence.clone();
        assert_eq!(fence.raw_fd(), other.raw_fd());
    }
}
