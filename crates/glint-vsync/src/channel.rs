//! Timestamp delivery channel.
//!
//! Each connection owns one end of a nonblocking `SOCK_SEQPACKET` socketpair
//! and hands the other end to its subscriber. Every vsync event is a single
//! 8-byte native-endian timestamp packet, so readers never see a torn value.

use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

use crate::error::{VsyncError, VsyncResult};

/// One timestamp per packet.
const EVENT_SIZE: usize = std::mem::size_of::<i64>();

/// Outcome of a nonblocking post to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendStatus {
    /// Delivered.
    Sent,
    /// The subscriber's end is gone; the connection should be removed.
    Closed,
    /// The subscriber is not draining its queue.
    WouldBlock,
}

/// Distributor-held sending end.
#[derive(Debug)]
pub(crate) struct EventSender {
    fd: OwnedFd,
}

impl EventSender {
    pub(crate) fn post(&self, timestamp: i64) -> SendStatus {
        let bytes = timestamp.to_ne_bytes();
        let ret = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                bytes.as_ptr() as *const libc::c_void,
                EVENT_SIZE,
                libc::MSG_DONTWAIT | libc::MSG_NOSIGNAL,
            )
        };
        if ret > 0 {
            return SendStatus::Sent;
        }
        if ret == 0 {
            return SendStatus::Closed;
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EAGAIN) => SendStatus::WouldBlock,
            _ => SendStatus::Closed,
        }
    }
}

/// Subscriber-held receiving end.
#[derive(Debug)]
pub struct VsyncReceiver {
    fd: OwnedFd,
}

impl VsyncReceiver {
    /// Read one pending timestamp, if any.
    pub fn try_recv(&self) -> VsyncResult<Option<i64>> {
        let mut bytes = [0u8; EVENT_SIZE];
        let ret = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                bytes.as_mut_ptr() as *mut libc::c_void,
                EVENT_SIZE,
                libc::MSG_DONTWAIT,
            )
        };
        if ret == EVENT_SIZE as isize {
            return Ok(Some(i64::from_ne_bytes(bytes)));
        }
        if ret == 0 {
            // peer closed
            return Err(VsyncError::Os(libc::EPIPE));
        }
        if ret > 0 {
            return Err(VsyncError::Os(libc::EBADMSG));
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EAGAIN) => Ok(None),
            Some(errno) => Err(VsyncError::Os(errno)),
            None => Err(VsyncError::Os(0)),
        }
    }

    /// Wait up to `timeout` for a timestamp.
    pub fn recv_timeout(&self, timeout: Duration) -> VsyncResult<Option<i64>> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        loop {
            let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if ret > 0 {
                return self.try_recv();
            }
            if ret == 0 {
                return Ok(None);
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(VsyncError::Os(err.raw_os_error().unwrap_or(0)));
        }
    }
}

/// Build the socketpair for one connection.
pub(crate) fn event_channel() -> VsyncResult<(EventSender, VsyncReceiver)> {
    let (send_fd, recv_fd) = socketpair(
        AddressFamily::Unix,
        SockType::SeqPacket,
        None,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
    )
    .map_err(|errno| VsyncError::Os(errno as i32))?;

    // keep the kernel queues near one-event depth; the kernel clamps upward
    let size: libc::c_int = EVENT_SIZE as libc::c_int;
    for (fd, opt) in [(&send_fd, libc::SO_SNDBUF), (&recv_fd, libc::SO_RCVBUF)] {
        let ret = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                opt,
                &size as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret != 0 {
            return Err(VsyncError::last_os());
        }
    }

    Ok((EventSender { fd: send_fd }, VsyncReceiver { fd: recv_fd }))
}
