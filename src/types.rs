//! Shared value types: rectangles, configs, metadata enums, usage flags.

use bitflags::bitflags;

use crate::error::SurfaceError;
use crate::pixel_format;

/// Upper bound on the queue depth.
pub const SURFACE_MAX_QUEUE_SIZE: u32 = 64;
/// Queue depth used when none is configured.
pub const SURFACE_DEFAULT_QUEUE_SIZE: u32 = 3;
/// Smallest accepted stride alignment, in bytes.
pub const SURFACE_MIN_STRIDE_ALIGNMENT: u32 = 4;
/// Largest accepted stride alignment, in bytes.
pub const SURFACE_MAX_STRIDE_ALIGNMENT: u32 = 1024;

bitflags! {
    /// Buffer usage bitmask, set by the producer at request time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BufferUsage: u64 {
        /// CPU reads the mapped buffer.
        const CPU_READ = 1 << 0;
        /// CPU writes the mapped buffer; triggers a cache flush at flush time.
        const CPU_WRITE = 1 << 1;
        /// Contiguous media memory zone allocation.
        const MEM_MMZ = 1 << 2;
        /// DMA-capable memory.
        const MEM_DMA = 1 << 3;
        /// Shareable across processes.
        const MEM_SHARE = 1 << 4;
        /// MMZ with cache.
        const MEM_MMZ_CACHE = 1 << 5;
        /// Framebuffer memory.
        const MEM_FB = 1 << 6;
        /// Assigned by the producer-side driver.
        const ASSIGN_SIZE = 1 << 7;
    }
}

/// Damage rectangle, a compositor hint for the changed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// Color gamut carried as buffer metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ColorGamut {
    Native = 0,
    StandardBt601 = 1,
    StandardBt709 = 2,
    #[default]
    Srgb = 3,
    AdobeRgb = 4,
    DisplayP3 = 5,
    Bt2020 = 6,
    Bt2100Pq = 7,
    Bt2100Hlg = 8,
    DisplayBt2020 = 9,
}

impl TryFrom<i32> for ColorGamut {
    type Error = SurfaceError;

    fn try_from(v: i32) -> Result<Self, SurfaceError> {
        match v {
            0 => Ok(Self::Native),
            1 => Ok(Self::StandardBt601),
            2 => Ok(Self::StandardBt709),
            3 => Ok(Self::Srgb),
            4 => Ok(Self::AdobeRgb),
            5 => Ok(Self::DisplayP3),
            6 => Ok(Self::Bt2020),
            7 => Ok(Self::Bt2100Pq),
            8 => Ok(Self::Bt2100Hlg),
            9 => Ok(Self::DisplayBt2020),
            _ => Err(SurfaceError::InvalidArguments),
        }
    }
}

/// Rotation/flip applied at composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum TransformType {
    #[default]
    RotateNone = 0,
    Rotate90 = 1,
    Rotate180 = 2,
    Rotate270 = 3,
    FlipH = 4,
    FlipV = 5,
    FlipHRotate90 = 6,
    FlipVRotate90 = 7,
}

impl TryFrom<i32> for TransformType {
    type Error = SurfaceError;

    fn try_from(v: i32) -> Result<Self, SurfaceError> {
        match v {
            0 => Ok(Self::RotateNone),
            1 => Ok(Self::Rotate90),
            2 => Ok(Self::Rotate180),
            3 => Ok(Self::Rotate270),
            4 => Ok(Self::FlipH),
            5 => Ok(Self::FlipV),
            6 => Ok(Self::FlipHRotate90),
            7 => Ok(Self::FlipVRotate90),
            _ => Err(SurfaceError::InvalidArguments),
        }
    }
}

/// How the consumer scales a buffer whose logical size differs from the
/// surface size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ScalingMode {
    Freeze = 0,
    #[default]
    ScaleToWindow = 1,
    ScaleCrop = 2,
    NoScaleCrop = 3,
}

impl TryFrom<i32> for ScalingMode {
    type Error = SurfaceError;

    fn try_from(v: i32) -> Result<Self, SurfaceError> {
        match v {
            0 => Ok(Self::Freeze),
            1 => Ok(Self::ScaleToWindow),
            2 => Ok(Self::ScaleCrop),
            3 => Ok(Self::NoScaleCrop),
            _ => Err(SurfaceError::InvalidArguments),
        }
    }
}

/// Allocation parameters for a buffer request.
///
/// Two configs compare equal when they would describe the same allocation;
/// `timeout_ms` belongs to the request call, not the buffer, and is excluded
/// so a changed timeout never forces a reallocation.
#[derive(Debug, Clone, Copy)]
pub struct BufferRequestConfig {
    pub width: i32,
    pub height: i32,
    /// Row alignment in bytes; must be a power of two within
    /// [`SURFACE_MIN_STRIDE_ALIGNMENT`, `SURFACE_MAX_STRIDE_ALIGNMENT`].
    pub stride_alignment: u32,
    /// One of [`crate::pixel_format`]'s constants.
    pub format: i32,
    pub usage: BufferUsage,
    /// How long a request may block waiting for a free buffer. Zero means
    /// fail immediately.
    pub timeout_ms: u32,
    pub color_gamut: ColorGamut,
    pub transform: TransformType,
    pub scaling_mode: ScalingMode,
}

impl Default for BufferRequestConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            stride_alignment: SURFACE_MIN_STRIDE_ALIGNMENT,
            format: pixel_format::RGBA_8888,
            usage: BufferUsage::CPU_READ | BufferUsage::CPU_WRITE | BufferUsage::MEM_DMA,
            timeout_ms: 0,
            color_gamut: ColorGamut::default(),
            transform: TransformType::default(),
            scaling_mode: ScalingMode::default(),
        }
    }
}

impl PartialEq for BufferRequestConfig {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.stride_alignment == other.stride_alignment
            && self.format == other.format
            && self.usage == other.usage
            && self.color_gamut == other.color_gamut
            && self.transform == other.transform
            && self.scaling_mode == other.scaling_mode
    }
}

impl Eq for BufferRequestConfig {}

/// Parameters attached to a flush.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferFlushConfig {
    pub damage: Rect,
    /// Presentation timestamp in microseconds; zero means "stamp with the
    /// current time at flush".
    pub timestamp: i64,
}

/// Query record for [`crate::alloc::BufferAllocator::is_supported_alloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyAllocInfo {
    pub width: i32,
    pub height: i32,
    pub usage: BufferUsage,
    pub format: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: i32, height: i32) -> BufferRequestConfig {
        BufferRequestConfig {
            width,
            height,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_eq_ignores_timeout() {
        let a = BufferRequestConfig {
            timeout_ms: 0,
            ..config(800, 600)
        };
        let b = BufferRequestConfig {
            timeout_ms: 5000,
            ..config(800, 600)
        };
        assert_eq!(a, b);
        assert_ne!(a, config(1024, 768));
    }

    #[test]
    fn test_enum_decode_bounds() {
        assert_eq!(ColorGamut::try_from(3), Ok(ColorGamut::Srgb));
        assert_eq!(ColorGamut::try_from(10), Err(SurfaceError::InvalidArguments));
        assert_eq!(TransformType::try_from(7), Ok(TransformType::FlipVRotate90));
        assert_eq!(TransformType::try_from(8), Err(SurfaceError::InvalidArguments));
        assert_eq!(ScalingMode::try_from(-1), Err(SurfaceError::InvalidArguments));
    }

    #[test]
    fn test_usage_flags() {
        let usage = BufferUsage::CPU_READ | BufferUsage::CPU_WRITE;
        assert!(usage.contains(BufferUsage::CPU_WRITE));
        assert!(!usage.contains(BufferUsage::MEM_FB));
    }
}
