//! VSync distribution.
//!
//! A [`VsyncDistributor`] fans display-refresh pulses out to any number of
//! subscribers. Each subscriber holds a [`VsyncConnection`] with its own
//! cadence: a one-shot request, a periodic divisor of the tick rate, or a
//! temporary high-priority override. Delivery is an 8-byte timestamp per
//! event over a nonblocking socketpair, read through a [`VsyncReceiver`] on
//! the subscriber's side of the world.
//!
//! Pulses come from a platform [`VsyncController`] when one exists; without
//! one (or before the first hardware pulse) a 16 ms software tick keeps
//! waiting subscribers paced.
//!
//! ```no_run
//! use std::time::Duration;
//! use glint_vsync::{VsyncConnection, VsyncDistributor};
//!
//! let distributor = VsyncDistributor::new(None, "compositor")?;
//! let connection = VsyncConnection::new(&distributor, "render-loop")?;
//! distributor.add_connection(&connection)?;
//! let receiver = connection.take_receiver().unwrap();
//!
//! connection.request_next_vsync()?;
//! if let Some(timestamp) = receiver.recv_timeout(Duration::from_millis(32))? {
//!     // pace the next frame against `timestamp`
//! }
//! # Ok::<(), glint_vsync::VsyncError>(())
//! ```

mod channel;
mod connection;
mod controller;
mod distributor;
mod error;

pub use channel::VsyncReceiver;
pub use connection::{ConnectionInfo, VsyncConnection};
pub use controller::{VsyncCallback, VsyncController};
pub use distributor::{VsyncDistributor, SOFT_VSYNC_PERIOD};
pub use error::{VsyncError, VsyncResult};
