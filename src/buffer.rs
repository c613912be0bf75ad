//! The surface buffer value object.
//!
//! A `SurfaceBuffer` is passive: it carries identity, the allocator handle,
//! an optional CPU mapping, and mutable presentation metadata. All lifecycle
//! decisions (who may render, who may read) belong to the queue.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::alloc::{BufferHandle, Mapping};
use crate::error::{SurfaceError, SurfaceResult};
use crate::extra::ExtraData;
use crate::types::{BufferUsage, ColorGamut, ScalingMode, TransformType};

/// Process-unique buffer sequence: pid in the high 32 bits, a process-global
/// counter in the low 32.
pub(crate) fn next_sequence() -> u64 {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let low = COUNTER.fetch_add(1, Ordering::Relaxed);
    ((unsafe { libc::getpid() } as u64) << 32) | low as u64
}

/// Mutable presentation metadata, settable after allocation.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BufferMeta {
    pub color_gamut: ColorGamut,
    pub transform: TransformType,
    pub scaling_mode: ScalingMode,
    pub surface_width: i32,
    pub surface_height: i32,
}

/// One graphics buffer.
#[derive(Debug)]
pub struct SurfaceBuffer {
    sequence: u64,
    handle: BufferHandle,
    mapping: Mutex<Option<Mapping>>,
    meta: Mutex<BufferMeta>,
    extra: Mutex<ExtraData>,
}

impl SurfaceBuffer {
    /// Wrap a freshly allocated handle under a new sequence number.
    pub fn new(handle: BufferHandle) -> Self {
        Self::with_sequence(next_sequence(), handle)
    }

    /// Reconstruct a buffer that already has an identity (deserialization).
    pub(crate) fn with_sequence(sequence: u64, handle: BufferHandle) -> Self {
        Self {
            sequence,
            handle,
            mapping: Mutex::new(None),
            meta: Mutex::new(BufferMeta::default()),
            extra: Mutex::new(ExtraData::new()),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn handle(&self) -> &BufferHandle {
        &self.handle
    }

    pub fn width(&self) -> i32 {
        self.handle.width
    }

    pub fn height(&self) -> i32 {
        self.handle.height
    }

    pub fn stride(&self) -> i32 {
        self.handle.stride
    }

    pub fn format(&self) -> i32 {
        self.handle.format
    }

    pub fn usage(&self) -> BufferUsage {
        self.handle.usage
    }

    pub fn size(&self) -> usize {
        self.handle.size
    }

    // ------------------------------------------------------------------
    // CPU mapping
    // ------------------------------------------------------------------

    /// Map the backing memory for CPU access. Idempotent.
    pub fn map(&self) -> SurfaceResult<()> {
        let mut mapping = self.mapping.lock().unwrap();
        if mapping.is_none() {
            *mapping = Some(Mapping::new(&self.handle.fd, self.handle.size)?);
        }
        Ok(())
    }

    /// Drop the CPU mapping, if any.
    pub fn unmap(&self) -> SurfaceResult<()> {
        self.mapping.lock().unwrap().take();
        Ok(())
    }

    /// Mapped base address, when mapped.
    pub fn virt_addr(&self) -> Option<*mut u8> {
        self.mapping.lock().unwrap().as_ref().map(|m| m.as_ptr())
    }

    /// Write back CPU caches so the device sees CPU writes.
    pub fn flush_cache(&self) -> SurfaceResult<()> {
        match self.mapping.lock().unwrap().as_ref() {
            Some(mapping) => mapping.flush(),
            None => Err(SurfaceError::InvalidOperating),
        }
    }

    /// Invalidate CPU caches so the CPU sees device writes.
    pub fn invalidate_cache(&self) -> SurfaceResult<()> {
        match self.mapping.lock().unwrap().as_ref() {
            Some(mapping) => mapping.invalidate(),
            None => Err(SurfaceError::InvalidOperating),
        }
    }

    /// Copy `data` into the mapped buffer at `offset`.
    pub fn write_bytes(&self, offset: usize, data: &[u8]) -> SurfaceResult<()> {
        let mapping = self.mapping.lock().unwrap();
        let Some(mapping) = mapping.as_ref() else {
            return Err(SurfaceError::InvalidOperating);
        };
        if offset.checked_add(data.len()).map_or(true, |end| end > mapping.len()) {
            return Err(SurfaceError::OutOfRange);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapping.as_ptr().add(offset), data.len());
        }
        Ok(())
    }

    /// Copy from the mapped buffer at `offset` into `out`.
    pub fn read_bytes(&self, offset: usize, out: &mut [u8]) -> SurfaceResult<()> {
        let mapping = self.mapping.lock().unwrap();
        let Some(mapping) = mapping.as_ref() else {
            return Err(SurfaceError::InvalidOperating);
        };
        if offset.checked_add(out.len()).map_or(true, |end| end > mapping.len()) {
            return Err(SurfaceError::OutOfRange);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(mapping.as_ptr().add(offset), out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn color_gamut(&self) -> ColorGamut {
        self.meta.lock().unwrap().color_gamut
    }

    pub fn set_color_gamut(&self, gamut: ColorGamut) {
        self.meta.lock().unwrap().color_gamut = gamut;
    }

    pub fn transform(&self) -> TransformType {
        self.meta.lock().unwrap().transform
    }

    pub fn set_transform(&self, transform: TransformType) {
        self.meta.lock().unwrap().transform = transform;
    }

    pub fn scaling_mode(&self) -> ScalingMode {
        self.meta.lock().unwrap().scaling_mode
    }

    pub fn set_scaling_mode(&self, mode: ScalingMode) {
        self.meta.lock().unwrap().scaling_mode = mode;
    }

    /// Logical (surface-space) width, distinct from the allocated width.
    pub fn surface_width(&self) -> i32 {
        self.meta.lock().unwrap().surface_width
    }

    pub fn set_surface_width(&self, width: i32) {
        self.meta.lock().unwrap().surface_width = width;
    }

    pub fn surface_height(&self) -> i32 {
        self.meta.lock().unwrap().surface_height
    }

    pub fn set_surface_height(&self, height: i32) {
        self.meta.lock().unwrap().surface_height = height;
    }

    pub(crate) fn meta(&self) -> BufferMeta {
        *self.meta.lock().unwrap()
    }

    /// Snapshot of the extra-data table.
    pub fn extra_data(&self) -> ExtraData {
        self.extra.lock().unwrap().clone()
    }

    /// Replace the extra-data table wholesale.
    pub fn set_extra_data(&self, data: ExtraData) {
        *self.extra.lock().unwrap() = data;
    }
}
