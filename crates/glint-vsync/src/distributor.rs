//! The vsync distributor.
//!
//! One worker thread fans vsync pulses out to every registered connection at
//! its effective rate. Pulses normally come from a hardware
//! [`VsyncController`]; when none has fired, a 16 ms software tick keeps
//! waiting subscribers paced, which is what lets the pipeline run before the
//! display is up (or without one).

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::SendStatus;
use crate::connection::{ConnectionInfo, VsyncConnection};
use crate::controller::{VsyncCallback, VsyncController};
use crate::error::{VsyncError, VsyncResult};

/// Cadence of the software fallback tick.
pub const SOFT_VSYNC_PERIOD: Duration = Duration::from_millis(16);

const THREAD_NICE: libc::c_int = -6;
const SCHED_PRIORITY: libc::c_int = 2;

#[derive(Debug, Default)]
struct VsyncEvent {
    /// Monotonic nanoseconds of the latest pulse; 0 = consumed.
    timestamp: i64,
    vsync_count: i64,
}

struct DistState {
    running: bool,
    event: VsyncEvent,
    connections: Vec<Arc<VsyncConnection>>,
    vsync_enabled: bool,
}

pub(crate) struct DistributorCore {
    name: String,
    controller: Option<Arc<dyn VsyncController>>,
    state: Mutex<DistState>,
    cond: Condvar,
}

impl DistributorCore {
    fn registered(state: &DistState, connection: &VsyncConnection) -> bool {
        state
            .connections
            .iter()
            .any(|c| std::ptr::eq(c.as_ref(), connection))
    }

    pub(crate) fn request_next_vsync(&self, connection: &VsyncConnection) -> VsyncResult<()> {
        let state = self.state.lock().unwrap();
        if !Self::registered(&state, connection) {
            return Err(VsyncError::InvalidArguments);
        }
        if connection.rate() < 0 {
            connection.set_rate(0);
            self.cond.notify_all();
        }
        debug!(name = %self.name, connection = connection.name(), "next vsync requested");
        Ok(())
    }

    pub(crate) fn set_vsync_rate(&self, rate: i32, connection: &VsyncConnection) -> VsyncResult<()> {
        if rate <= 0 {
            return Err(VsyncError::InvalidArguments);
        }
        let state = self.state.lock().unwrap();
        if !Self::registered(&state, connection) || connection.rate() == rate {
            return Err(VsyncError::InvalidArguments);
        }
        connection.set_rate(rate);
        debug!(name = %self.name, connection = connection.name(), rate, "vsync rate set");
        self.cond.notify_all();
        Ok(())
    }

    pub(crate) fn set_high_priority_vsync_rate(
        &self,
        rate: i32,
        connection: &VsyncConnection,
    ) -> VsyncResult<()> {
        if rate <= 0 {
            return Err(VsyncError::InvalidArguments);
        }
        let state = self.state.lock().unwrap();
        if !Self::registered(&state, connection) || connection.high_priority_rate() == rate {
            return Err(VsyncError::InvalidArguments);
        }
        connection.set_high_priority(rate);
        debug!(
            name = %self.name,
            connection = connection.name(),
            rate,
            "high priority vsync rate set"
        );
        self.cond.notify_all();
        Ok(())
    }

    fn on_vsync_event(&self, timestamp: i64) {
        let mut state = self.state.lock().unwrap();
        state.event.timestamp = timestamp;
        state.event.vsync_count += 1;
        self.cond.notify_all();
    }

    fn remove_connection(&self, connection: &Arc<VsyncConnection>) -> VsyncResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.connections.len();
        state
            .connections
            .retain(|c| !Arc::ptr_eq(c, connection));
        if state.connections.len() == before {
            return Err(VsyncError::InvalidArguments);
        }
        Ok(())
    }

    /// Start hardware pulses; idempotent while enabled.
    fn enable_vsync(self: &Arc<Self>, state: &mut DistState) {
        let Some(controller) = &self.controller else {
            return;
        };
        if state.vsync_enabled {
            return;
        }
        state.vsync_enabled = true;
        let callback: Arc<dyn VsyncCallback> = self.clone();
        if let Err(err) = controller.set_callback(callback) {
            warn!(name = %self.name, %err, "vsync controller rejected callback");
        }
        if let Err(err) = controller.set_enable(true) {
            warn!(name = %self.name, %err, "vsync controller enable failed");
        }
    }

    fn disable_vsync(&self, state: &mut DistState) {
        let Some(controller) = &self.controller else {
            return;
        };
        if !state.vsync_enabled {
            return;
        }
        state.vsync_enabled = false;
        if let Err(err) = controller.set_enable(false) {
            warn!(name = %self.name, %err, "vsync controller disable failed");
        }
    }

    /// Pick this tick's recipients and update one-shot rates. Returns whether
    /// any connection is waiting for a vsync.
    fn collect_connections(
        state: &mut DistState,
        timestamp: i64,
        selected: &mut Vec<Arc<VsyncConnection>>,
    ) -> bool {
        let vsync_count = state.event.vsync_count;
        let mut wait_for_vsync = false;
        for connection in &state.connections {
            let rate = if connection.high_priority_active() {
                connection.high_priority_rate()
            } else {
                connection.rate()
            };
            if rate == 0 {
                // one-shot from request_next_vsync
                wait_for_vsync = true;
                if timestamp > 0 {
                    connection.set_rate(-1);
                    selected.push(connection.clone());
                }
            } else if rate > 0 && vsync_count % rate as i64 == 0 {
                if connection.rate() == 0 {
                    // high-priority cadence carrying a pending one-shot
                    wait_for_vsync = true;
                    if timestamp > 0 {
                        connection.set_rate(-1);
                        selected.push(connection.clone());
                    }
                } else if connection.rate() > 0 {
                    wait_for_vsync = true;
                    if timestamp > 0 {
                        selected.push(connection.clone());
                    }
                }
            }
        }
        wait_for_vsync
    }

    fn thread_main(self: &Arc<Self>) {
        raise_thread_priority(&self.name);
        loop {
            let mut selected = Vec::new();
            let timestamp;
            {
                let mut state = self.state.lock().unwrap();
                if !state.running {
                    break;
                }
                timestamp = state.event.timestamp;
                state.event.timestamp = 0;
                let wait_for_vsync =
                    Self::collect_connections(&mut state, timestamp, &mut selected);
                if timestamp == 0 {
                    if wait_for_vsync {
                        self.enable_vsync(&mut state);
                        let (mut state, result) = self
                            .cond
                            .wait_timeout(state, SOFT_VSYNC_PERIOD)
                            .unwrap();
                        if result.timed_out() && state.running {
                            state.event.timestamp = monotonic_nanos();
                            state.event.vsync_count += 1;
                            debug!(name = %self.name, "software vsync tick");
                        }
                    } else if state.running {
                        let _state = self.cond.wait(state).unwrap();
                    }
                    continue;
                } else if !wait_for_vsync {
                    // A pulse arrived with nobody waiting. Hardware vsync
                    // stays enabled: disabling at this point proved unstable.
                    continue;
                }
            }

            for connection in &selected {
                match connection.post_event(timestamp) {
                    SendStatus::Sent => {
                        debug!(
                            name = %self.name,
                            connection = connection.name(),
                            timestamp,
                            "vsync posted"
                        );
                    }
                    SendStatus::Closed => {
                        warn!(
                            name = %self.name,
                            connection = connection.name(),
                            "subscriber gone, removing connection"
                        );
                        let _ = self.remove_connection(connection);
                    }
                    SendStatus::WouldBlock => {
                        let _state = self.state.lock().unwrap();
                        // demote to one-shot; periodic rates keep their cadence
                        if connection.rate() < 0 {
                            connection.set_rate(0);
                        }
                    }
                }
            }
        }
    }
}

impl VsyncCallback for DistributorCore {
    fn on_vsync(&self, timestamp: i64) {
        self.on_vsync_event(timestamp);
    }
}

/// Multi-subscriber vsync fan-out. Owns the distributor thread; dropping the
/// distributor stops and joins it.
pub struct VsyncDistributor {
    core: Arc<DistributorCore>,
    thread: Option<JoinHandle<()>>,
}

impl VsyncDistributor {
    /// Spawn a distributor. With `controller = None` all pacing comes from
    /// the software tick.
    pub fn new(
        controller: Option<Arc<dyn VsyncController>>,
        name: impl Into<String>,
    ) -> VsyncResult<Self> {
        let name = name.into();
        let core = Arc::new(DistributorCore {
            name: name.clone(),
            controller,
            state: Mutex::new(DistState {
                running: true,
                event: VsyncEvent::default(),
                connections: Vec::new(),
                vsync_enabled: false,
            }),
            cond: Condvar::new(),
        });
        let thread = {
            let core = core.clone();
            std::thread::Builder::new()
                .name(format!("vsync-{name}"))
                .spawn(move || core.thread_main())
                .map_err(|_| VsyncError::last_os())?
        };
        info!(name = %name, "vsync distributor started");
        Ok(Self { core, thread: Some(thread) })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub(crate) fn core_weak(&self) -> Weak<DistributorCore> {
        Arc::downgrade(&self.core)
    }

    pub fn add_connection(&self, connection: &Arc<VsyncConnection>) -> VsyncResult<()> {
        let mut state = self.core.state.lock().unwrap();
        if DistributorCore::registered(&state, connection.as_ref()) {
            return Err(VsyncError::InvalidArguments);
        }
        state.connections.push(connection.clone());
        Ok(())
    }

    pub fn remove_connection(&self, connection: &Arc<VsyncConnection>) -> VsyncResult<()> {
        self.core.remove_connection(connection)
    }

    /// Hardware-side entry: record a pulse and wake the worker.
    pub fn on_vsync_event(&self, timestamp: i64) {
        self.core.on_vsync_event(timestamp);
    }

    pub fn request_next_vsync(&self, connection: &VsyncConnection) -> VsyncResult<()> {
        self.core.request_next_vsync(connection)
    }

    /// Deliver every `rate`-th tick to `connection`. Rejects `rate <= 0` and
    /// no-op changes.
    pub fn set_vsync_rate(&self, rate: i32, connection: &VsyncConnection) -> VsyncResult<()> {
        self.core.set_vsync_rate(rate, connection)
    }

    /// Install a rate override that masks the regular rate until cleared by
    /// shutdown. Rejects `rate <= 0` and no-op changes.
    pub fn set_high_priority_vsync_rate(
        &self,
        rate: i32,
        connection: &VsyncConnection,
    ) -> VsyncResult<()> {
        self.core.set_high_priority_vsync_rate(rate, connection)
    }

    /// Diagnostic snapshot of every registered connection.
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        let state = self.core.state.lock().unwrap();
        state.connections.iter().map(|c| c.info()).collect()
    }
}

impl Drop for VsyncDistributor {
    fn drop(&mut self) {
        {
            let mut state = self.core.state.lock().unwrap();
            state.running = false;
        }
        self.core.cond.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let mut state = self.core.state.lock().unwrap();
        self.core.disable_vsync(&mut state);
        info!(name = %self.core.name, "vsync distributor stopped");
    }
}

fn monotonic_nanos() -> i64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
}

/// Best effort: nice the worker and ask for a FIFO slot. Both usually need
/// privileges; failure leaves the thread at normal priority.
fn raise_thread_priority(name: &str) {
    unsafe {
        if libc::setpriority(libc::PRIO_PROCESS as _, 0, THREAD_NICE) != 0 {
            debug!(name, "setpriority unavailable, keeping default nice");
        }
        let param = libc::sched_param { sched_priority: SCHED_PRIORITY };
        if libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) != 0 {
            debug!(name, "realtime scheduling unavailable, staying best-effort");
        }
    }
}
