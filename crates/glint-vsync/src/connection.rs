//! Per-subscriber vsync connection.
//!
//! A connection pairs the subscriber's delivery channel with its rate state.
//! Rates are interpreted as: `-1` inactive, `0` one-shot pending, `> 0`
//! deliver every Nth tick. The connection holds only a weak reference to its
//! distributor so it can never keep it alive.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::channel::{event_channel, EventSender, SendStatus, VsyncReceiver};
use crate::distributor::{DistributorCore, VsyncDistributor};
use crate::error::{VsyncError, VsyncResult};

/// Diagnostic snapshot of one connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub name: String,
    /// Timestamps successfully posted to the subscriber.
    pub post_event_count: u64,
}

/// One vsync subscriber, registered with a [`VsyncDistributor`].
pub struct VsyncConnection {
    name: String,
    rate: AtomicI32,
    high_priority_rate: AtomicI32,
    high_priority_state: AtomicBool,
    post_count: AtomicU64,
    distributor: Weak<DistributorCore>,
    sender: EventSender,
    receiver: Mutex<Option<VsyncReceiver>>,
}

impl VsyncConnection {
    /// Create a connection bound to `distributor`. The connection still has
    /// to be registered via [`VsyncDistributor::add_connection`].
    pub fn new(distributor: &VsyncDistributor, name: impl Into<String>) -> VsyncResult<Arc<Self>> {
        let (sender, receiver) = event_channel()?;
        Ok(Arc::new(Self {
            name: name.into(),
            rate: AtomicI32::new(-1),
            high_priority_rate: AtomicI32::new(-1),
            high_priority_state: AtomicBool::new(false),
            post_count: AtomicU64::new(0),
            distributor: distributor.core_weak(),
            sender,
            receiver: Mutex::new(Some(receiver)),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand the subscriber its receiving end. Yields `Some` exactly once.
    pub fn take_receiver(&self) -> Option<VsyncReceiver> {
        self.receiver.lock().unwrap().take()
    }

    pub fn post_event_count(&self) -> u64 {
        self.post_count.load(Ordering::SeqCst)
    }

    /// Ask for exactly one upcoming vsync.
    pub fn request_next_vsync(&self) -> VsyncResult<()> {
        self.distributor()?.request_next_vsync(self)
    }

    /// Subscribe to every `rate`-th vsync.
    pub fn set_vsync_rate(&self, rate: i32) -> VsyncResult<()> {
        self.distributor()?.set_vsync_rate(rate, self)
    }

    /// Install a temporary rate override (see
    /// [`VsyncDistributor::set_high_priority_vsync_rate`]).
    pub fn set_high_priority_vsync_rate(&self, rate: i32) -> VsyncResult<()> {
        self.distributor()?.set_high_priority_vsync_rate(rate, self)
    }

    fn distributor(&self) -> VsyncResult<Arc<DistributorCore>> {
        self.distributor.upgrade().ok_or(VsyncError::NullPtr)
    }

    // ------------------------------------------------------------------
    // Distributor-side access
    // ------------------------------------------------------------------

    pub(crate) fn post_event(&self, timestamp: i64) -> SendStatus {
        let status = self.sender.post(timestamp);
        if status == SendStatus::Sent {
            self.post_count.fetch_add(1, Ordering::SeqCst);
        }
        status
    }

    pub(crate) fn rate(&self) -> i32 {
        self.rate.load(Ordering::SeqCst)
    }

    pub(crate) fn set_rate(&self, rate: i32) {
        self.rate.store(rate, Ordering::SeqCst);
    }

    pub(crate) fn high_priority_rate(&self) -> i32 {
        self.high_priority_rate.load(Ordering::SeqCst)
    }

    pub(crate) fn set_high_priority(&self, rate: i32) {
        self.high_priority_rate.store(rate, Ordering::SeqCst);
        self.high_priority_state.store(true, Ordering::SeqCst);
    }

    pub(crate) fn high_priority_active(&self) -> bool {
        self.high_priority_state.load(Ordering::SeqCst)
    }

    pub(crate) fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            name: self.name.clone(),
            post_event_count: self.post_event_count(),
        }
    }
}

impl std::fmt::Debug for VsyncConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsyncConnection")
            .field("name", &self.name)
            .field("rate", &self.rate())
            .field("high_priority_rate", &self.high_priority_rate())
            .field("post_count", &self.post_event_count())
            .finish()
    }
}
