//! Hardware vsync source interface.
//!
//! The distributor drives whatever tick source the platform provides through
//! these two traits. When no controller is available (early boot, headless
//! tests) the distributor's 16 ms software fallback paces frames instead.

use std::sync::Arc;

use crate::error::VsyncResult;

/// Receives hardware vsync pulses. Implemented by the distributor.
pub trait VsyncCallback: Send + Sync {
    /// `timestamp` is monotonic nanoseconds.
    fn on_vsync(&self, timestamp: i64);
}

/// A hardware vsync source.
pub trait VsyncController: Send + Sync {
    /// Start or stop pulse generation.
    fn set_enable(&self, enabled: bool) -> VsyncResult<()>;

    /// Route pulses to `callback`.
    fn set_callback(&self, callback: Arc<dyn VsyncCallback>) -> VsyncResult<()>;
}
