//! Buffer allocation.
//!
//! The queue allocates through the [`BufferAllocator`] trait so a real
//! gralloc/ion backend can be dropped in. The default backend allocates
//! anonymous shared memory via `memfd_create`, which is enough for CPU
//! rendering and for exercising the full queue lifecycle.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::debug;

use crate::error::{SurfaceError, SurfaceResult};
use crate::pixel_format;
use crate::types::{BufferRequestConfig, BufferUsage, VerifyAllocInfo};

/// Allocator-owned descriptor of one graphics buffer.
#[derive(Debug)]
pub struct BufferHandle {
    /// Backing memory, shareable across processes.
    pub fd: OwnedFd,
    pub width: i32,
    pub height: i32,
    /// Row pitch in bytes.
    pub stride: i32,
    /// One of [`crate::pixel_format`]'s constants.
    pub format: i32,
    pub usage: BufferUsage,
    /// Total size of the backing memory in bytes.
    pub size: usize,
}

impl BufferHandle {
    /// Duplicate the descriptor for serialization.
    pub(crate) fn dup_fd(&self) -> SurfaceResult<OwnedFd> {
        self.fd.try_clone().map_err(|_| SurfaceError::last_os())
    }
}

/// A live CPU mapping of a buffer's backing memory.
///
/// Unmapped on drop. The pointer refers to `MAP_SHARED` memory, so moving the
/// mapping between threads is sound; concurrent byte access is the caller's
/// problem, as it is for any shared graphics memory.
#[derive(Debug)]
pub struct Mapping {
    ptr: NonNull<libc::c_void>,
    len: usize,
}

unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    /// Map `len` bytes of `fd` read/write.
    pub fn new(fd: &OwnedFd, len: usize) -> SurfaceResult<Mapping> {
        if len == 0 {
            return Err(SurfaceError::InvalidArguments);
        }
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(SurfaceError::last_os());
        }
        // mmap never returns null on success
        Ok(Mapping { ptr: unsafe { NonNull::new_unchecked(ptr) }, len })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr() as *mut u8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write back CPU caches (`msync(MS_SYNC)`).
    pub fn flush(&self) -> SurfaceResult<()> {
        self.msync(libc::MS_SYNC)
    }

    /// Discard CPU caches so the next read sees device writes
    /// (`msync(MS_INVALIDATE)`).
    pub fn invalidate(&self) -> SurfaceResult<()> {
        self.msync(libc::MS_INVALIDATE)
    }

    fn msync(&self, flags: libc::c_int) -> SurfaceResult<()> {
        let ret = unsafe { libc::msync(self.ptr.as_ptr(), self.len, flags) };
        if ret != 0 {
            return Err(SurfaceError::last_os());
        }
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr(), self.len);
        }
    }
}

/// Supplies backing memory for the queue.
pub trait BufferAllocator: Send + Sync {
    /// Allocate a buffer satisfying `config`.
    fn alloc(&self, config: &BufferRequestConfig) -> SurfaceResult<BufferHandle>;

    /// Answer, per query, whether this allocator could satisfy it.
    fn is_supported_alloc(&self, infos: &[VerifyAllocInfo]) -> SurfaceResult<Vec<bool>> {
        Ok(infos
            .iter()
            .map(|info| {
                info.width > 0
                    && info.height > 0
                    && info.format >= 0
                    && info.format < pixel_format::BUTT
            })
            .collect())
    }
}

/// Default allocator: anonymous shared memory from `memfd_create`.
#[derive(Debug, Default)]
pub struct MemfdAllocator;

impl MemfdAllocator {
    pub fn shared() -> Arc<dyn BufferAllocator> {
        Arc::new(MemfdAllocator)
    }
}

impl BufferAllocator for MemfdAllocator {
    fn alloc(&self, config: &BufferRequestConfig) -> SurfaceResult<BufferHandle> {
        let bpp = pixel_format::bytes_per_pixel(config.format);
        let align = config.stride_alignment.max(1) as usize;
        let row = config.width as usize * bpp;
        let stride = (row + align - 1) & !(align - 1);
        let size = stride * config.height as usize;

        let name = c"glint_buffer";
        let raw = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(SurfaceError::last_os());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        if unsafe { libc::ftruncate(fd.as_raw_fd(), size as libc::off_t) } != 0 {
            return Err(SurfaceError::last_os());
        }

        debug!(
            width = config.width,
            height = config.height,
            stride,
            size,
            "allocated memfd buffer"
        );
        Ok(BufferHandle {
            fd,
            width: config.width,
            height: config.height,
            stride: stride as i32,
            format: config.format,
            usage: config.usage,
            size,
        })
    }
}
