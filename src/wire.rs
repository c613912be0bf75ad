//! Wire serialization.
//!
//! A `Parcel` is a flat little-endian byte stream plus a file-descriptor
//! table, the shape an IPC transport needs: values inline, descriptors out of
//! band (a transport forwards them with `SCM_RIGHTS` or equivalent). Strings
//! are length-prefixed UTF-8. Descriptor slots hold the table index, `-1`
//! meaning "none".

use std::os::fd::OwnedFd;

use crate::buffer::SurfaceBuffer;
use crate::error::{SurfaceError, SurfaceResult};
use crate::extra::{ExtraData, ExtraTag, ExtraValue};
use crate::fence::SyncFence;
use crate::types::{BufferUsage, ColorGamut, ScalingMode, TransformType};
use crate::alloc::BufferHandle;

/// Serialization buffer with an out-of-band descriptor table.
#[derive(Debug, Default)]
pub struct Parcel {
    data: Vec<u8>,
    fds: Vec<Option<OwnedFd>>,
    read_pos: usize,
}

impl Parcel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn fd_count(&self) -> usize {
        self.fds.len()
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// f64 serializes via raw bits, so round-trips are bit-exact.
    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    pub fn write_str(&mut self, v: &str) {
        self.write_u32(v.len() as u32);
        self.data.extend_from_slice(v.as_bytes());
    }

    /// Park a descriptor in the table and write its index (`-1` for none).
    pub fn write_fd(&mut self, fd: Option<OwnedFd>) {
        match fd {
            None => self.write_i32(-1),
            Some(fd) => {
                self.write_i32(self.fds.len() as i32);
                self.fds.push(Some(fd));
            }
        }
    }

    fn take(&mut self, n: usize) -> SurfaceResult<&[u8]> {
        if self.read_pos + n > self.data.len() {
            return Err(SurfaceError::InvalidArguments);
        }
        let slice = &self.data[self.read_pos..self.read_pos + n];
        self.read_pos += n;
        Ok(slice)
    }

    pub fn read_i32(&mut self) -> SurfaceResult<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> SurfaceResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> SurfaceResult<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> SurfaceResult<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> SurfaceResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_str(&mut self) -> SurfaceResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SurfaceError::InvalidArguments)
    }

    /// Claim the descriptor referenced at the current position. Each table
    /// slot can be claimed once.
    pub fn read_fd(&mut self) -> SurfaceResult<Option<OwnedFd>> {
        let index = self.read_i32()?;
        if index < 0 {
            return Ok(None);
        }
        let slot = self
            .fds
            .get_mut(index as usize)
            .ok_or(SurfaceError::InvalidArguments)?;
        slot.take().map(Some).ok_or(SurfaceError::InvalidArguments)
    }

    // ------------------------------------------------------------------
    // Composite layouts
    // ------------------------------------------------------------------

    pub fn write_fence(&mut self, fence: &SyncFence) -> SurfaceResult<()> {
        self.write_fd(fence.dup_fd()?);
        Ok(())
    }

    pub fn read_fence(&mut self) -> SurfaceResult<SyncFence> {
        Ok(match self.read_fd()? {
            None => SyncFence::INVALID,
            Some(fd) => SyncFence::new(fd),
        })
    }

    fn write_extra_data(&mut self, data: &ExtraData) {
        self.write_u32(data.len() as u32);
        for (key, value) in data.iter() {
            self.write_str(key);
            self.write_i32(value.tag() as i32);
            match value {
                ExtraValue::I32(v) => self.write_i32(*v),
                ExtraValue::I64(v) => self.write_i64(*v),
                ExtraValue::F64(v) => self.write_f64(*v),
                ExtraValue::Str(v) => self.write_str(v),
            }
        }
    }

    fn read_extra_data(&mut self) -> SurfaceResult<ExtraData> {
        let count = self.read_u32()?;
        let mut data = ExtraData::new();
        for _ in 0..count {
            let key = self.read_str()?;
            let value = match ExtraTag::try_from(self.read_i32()?)? {
                ExtraTag::I32 => ExtraValue::I32(self.read_i32()?),
                ExtraTag::I64 => ExtraValue::I64(self.read_i64()?),
                ExtraTag::F64 => ExtraValue::F64(self.read_f64()?),
                ExtraTag::Str => ExtraValue::Str(self.read_str()?),
            };
            data.set(key, value);
        }
        Ok(data)
    }

    /// Layout: sequence, handle blob (fd, geometry, format, usage, size),
    /// presentation metadata, extra-data records.
    pub fn write_surface_buffer(&mut self, buffer: &SurfaceBuffer) -> SurfaceResult<()> {
        self.write_u64(buffer.sequence());
        let handle = buffer.handle();
        self.write_fd(Some(handle.dup_fd()?));
        self.write_i32(handle.width);
        self.write_i32(handle.height);
        self.write_i32(handle.stride);
        self.write_i32(handle.format);
        self.write_u64(handle.usage.bits());
        self.write_u64(handle.size as u64);

        let meta = buffer.meta();
        self.write_i32(meta.color_gamut as i32);
        self.write_i32(meta.transform as i32);
        self.write_i32(meta.scaling_mode as i32);
        self.write_i32(meta.surface_width);
        self.write_i32(meta.surface_height);

        self.write_extra_data(&buffer.extra_data());
        Ok(())
    }

    pub fn read_surface_buffer(&mut self) -> SurfaceResult<SurfaceBuffer> {
        let sequence = self.read_u64()?;
        let fd = self.read_fd()?.ok_or(SurfaceError::InvalidArguments)?;
        let handle = BufferHandle {
            fd,
            width: self.read_i32()?,
            height: self.read_i32()?,
            stride: self.read_i32()?,
            format: self.read_i32()?,
            usage: BufferUsage::from_bits_retain(self.read_u64()?),
            size: self.read_u64()? as usize,
        };

        let buffer = SurfaceBuffer::with_sequence(sequence, handle);
        buffer.set_color_gamut(ColorGamut::try_from(self.read_i32()?)?);
        buffer.set_transform(TransformType::try_from(self.read_i32()?)?);
        buffer.set_scaling_mode(ScalingMode::try_from(self.read_i32()?)?);
        buffer.set_surface_width(self.read_i32()?);
        buffer.set_surface_height(self.read_i32()?);
        buffer.set_extra_data(self.read_extra_data()?);
        Ok(buffer)
    }
}
