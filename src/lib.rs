//! Graphics buffer pipeline.
//!
//! `glint` mediates the exchange of GPU-allocatable image buffers between a
//! rendering producer and a compositing consumer. The heart of the crate is
//! the [`queue::BufferQueue`], a finite four-state pool with a blocking
//! producer API and a non-blocking consumer API; around it sit the passive
//! [`buffer::SurfaceBuffer`] value object, fd-backed [`fence::SyncFence`]s
//! for cross-process GPU synchronization, and a parcel [`wire`] layer for
//! IPC transports.
//!
//! Frame pacing lives in the companion crate, re-exported as [`vsync`]: a
//! distributor thread fans hardware (or software-simulated) vsync pulses out
//! to subscribers at per-subscriber rate divisors.
//!
//! ```no_run
//! use std::sync::Arc;
//! use glint::{create_buffer_queue, queue::ConsumerListener};
//! use glint::types::{BufferFlushConfig, BufferRequestConfig, Rect};
//! use glint::{extra::ExtraData, fence::SyncFence};
//!
//! struct Wakeup;
//! impl ConsumerListener for Wakeup {
//!     fn on_buffer_available(&self) {}
//! }
//!
//! let (producer, consumer) = create_buffer_queue("preview", false);
//! consumer.register_consumer_listener(Arc::new(Wakeup));
//!
//! let config = BufferRequestConfig { width: 800, height: 600, ..Default::default() };
//! let frame = producer.request_buffer(&config)?;
//! // render into frame.buffer ...
//! producer.flush_buffer(
//!     frame.sequence,
//!     ExtraData::new(),
//!     SyncFence::INVALID,
//!     &BufferFlushConfig { damage: Rect::new(0, 0, 800, 600), timestamp: 0 },
//! )?;
//!
//! let shown = consumer.acquire_buffer()?;
//! // composite ...
//! consumer.release_buffer(&shown.buffer, SyncFence::INVALID)?;
//! # Ok::<(), glint::error::SurfaceError>(())
//! ```

pub mod alloc;
pub mod buffer;
pub mod consumer;
pub mod error;
pub mod extra;
pub mod fence;
pub mod pixel_format;
pub mod producer;
pub mod queue;
pub mod types;
pub mod wire;

pub use glint_vsync as vsync;

pub use buffer::SurfaceBuffer;
pub use consumer::BufferQueueConsumer;
pub use error::{SurfaceError, SurfaceResult};
pub use fence::SyncFence;
pub use producer::BufferQueueProducer;
pub use queue::{BufferQueue, ConsumerListener};

use std::sync::Arc;

/// Create a queue and hand back its two role-restricted views.
pub fn create_buffer_queue(
    name: impl Into<String>,
    is_shared: bool,
) -> (BufferQueueProducer, BufferQueueConsumer) {
    let queue = Arc::new(BufferQueue::new(name, is_shared));
    (
        BufferQueueProducer::new(queue.clone()),
        BufferQueueConsumer::new(queue),
    )
}
