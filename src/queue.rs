//! The buffer queue.
//!
//! A finite pool of graphics buffers cycling through four states between a
//! rendering producer and a compositing consumer:
//!
//! ```text
//! Released --request--> Requested --flush--> Flushed --acquire--> Acquired
//!     ^                     |                                        |
//!     +------cancel---------+                +-----release----------+
//! ```
//!
//! Externally owned buffers enter via attach in a fifth `Attached` state and
//! leave via detach. All bookkeeping lives under one mutex; the consumer
//! listener and the producer's release callback are invoked outside it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::alloc::{BufferAllocator, MemfdAllocator};
use crate::buffer::SurfaceBuffer;
use crate::error::{SurfaceError, SurfaceResult};
use crate::extra::ExtraData;
use crate::fence::SyncFence;
use crate::pixel_format;
use crate::types::{
    BufferFlushConfig, BufferRequestConfig, BufferUsage, Rect, TransformType, VerifyAllocInfo,
    SURFACE_DEFAULT_QUEUE_SIZE, SURFACE_MAX_QUEUE_SIZE, SURFACE_MAX_STRIDE_ALIGNMENT,
    SURFACE_MIN_STRIDE_ALIGNMENT,
};

/// Consumer-side notification sink. Registration replaces any prior
/// listener; exactly one is active at a time.
pub trait ConsumerListener: Send + Sync {
    /// A buffer was flushed and can be acquired.
    fn on_buffer_available(&self);
}

/// Producer-side release hook. Returning `Ok` means the producer has taken
/// custody of the released buffer and the queue must not re-enqueue it.
pub type OnBufferRelease = Arc<dyn Fn(&Arc<SurfaceBuffer>) -> SurfaceResult<()> + Send + Sync>;

/// Invoked with the sequence of every buffer evicted from the cache.
pub type OnBufferDelete = Arc<dyn Fn(u64) + Send + Sync>;

/// Lifecycle state of a cached buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Released,
    Requested,
    Flushed,
    Acquired,
    Attached,
}

impl BufferState {
    fn dump_str(self) -> &'static str {
        match self {
            BufferState::Released => "0 <released>",
            BufferState::Requested => "1 <requested>",
            BufferState::Flushed => "2 <flushed>",
            BufferState::Acquired => "3 <acquired>",
            BufferState::Attached => "4 <attached>",
        }
    }
}

/// Cache entry: the buffer plus everything captured at its last transition.
struct BufferElement {
    buffer: Arc<SurfaceBuffer>,
    state: BufferState,
    is_deleting: bool,
    config: BufferRequestConfig,
    fence: SyncFence,
    damage: Rect,
    /// Microseconds, captured at flush.
    timestamp: i64,
}

struct QueueInner {
    cache: HashMap<u64, BufferElement>,
    free_list: VecDeque<u64>,
    dirty_list: VecDeque<u64>,
    deleting_list: Vec<u64>,
    queue_size: u32,
    default_width: i32,
    default_height: i32,
    default_usage: BufferUsage,
    transform: TransformType,
}

impl QueueInner {
    fn used_size(&self) -> u32 {
        self.cache.len() as u32
    }
}

/// Result of a successful buffer request.
pub struct RequestedBuffer {
    pub buffer: Arc<SurfaceBuffer>,
    pub sequence: u64,
    /// Release fence of the previous cycle; wait before rendering.
    pub fence: SyncFence,
    /// Sequences evicted since the producer's previous request, so it can
    /// drop any mirrored handles.
    pub deleting_buffers: Vec<u64>,
}

/// Result of a successful acquire.
pub struct AcquiredBuffer {
    pub buffer: Arc<SurfaceBuffer>,
    /// Acquire fence from the producer; wait before reading.
    pub fence: SyncFence,
    /// Flush timestamp in microseconds.
    pub timestamp: i64,
    pub damage: Rect,
}

fn next_unique_id() -> u64 {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let low = COUNTER.fetch_add(1, Ordering::Relaxed);
    ((unsafe { libc::getpid() } as u64) << 32) | low as u64
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// The producer/consumer buffer pool. Usually accessed through the
/// [`crate::producer::BufferQueueProducer`] and
/// [`crate::consumer::BufferQueueConsumer`] facades over a shared `Arc`.
pub struct BufferQueue {
    name: String,
    unique_id: u64,
    is_shared: bool,
    allocator: Arc<dyn BufferAllocator>,
    inner: Mutex<QueueInner>,
    wait_req: Condvar,
    listener: Mutex<Option<Arc<dyn ConsumerListener>>>,
    on_release: Mutex<Option<OnBufferRelease>>,
    on_delete: Mutex<Option<OnBufferDelete>>,
}

impl BufferQueue {
    /// Create a queue backed by the default memfd allocator. Shared queues
    /// are pinned to a single buffer.
    pub fn new(name: impl Into<String>, is_shared: bool) -> Self {
        Self::with_allocator(name, is_shared, MemfdAllocator::shared())
    }

    pub fn with_allocator(
        name: impl Into<String>,
        is_shared: bool,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Self {
        let name = name.into();
        let unique_id = next_unique_id();
        info!(name = %name, unique_id, is_shared, "buffer queue created");
        Self {
            name,
            unique_id,
            is_shared,
            allocator,
            inner: Mutex::new(QueueInner {
                cache: HashMap::new(),
                free_list: VecDeque::new(),
                dirty_list: VecDeque::new(),
                deleting_list: Vec::new(),
                queue_size: if is_shared { 1 } else { SURFACE_DEFAULT_QUEUE_SIZE },
                default_width: 0,
                default_height: 0,
                default_usage: BufferUsage::default(),
                transform: TransformType::default(),
            }),
            wait_req: Condvar::new(),
            listener: Mutex::new(None),
            on_release: Mutex::new(None),
            on_delete: Mutex::new(None),
        }
    }

    /// Present for contract symmetry with transport-backed queues.
    pub fn init(&self) -> SurfaceResult<()> {
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique queue id: pid in the high 32 bits.
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    pub fn used_size(&self) -> u32 {
        self.inner.lock().unwrap().used_size()
    }

    pub fn queue_size(&self) -> u32 {
        self.inner.lock().unwrap().queue_size
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    fn check_request_config(config: &BufferRequestConfig) -> SurfaceResult<()> {
        if config.width <= 0 || config.height <= 0 {
            warn!(width = config.width, height = config.height, "invalid buffer dimensions");
            return Err(SurfaceError::InvalidArguments);
        }
        let align = config.stride_alignment;
        if !(SURFACE_MIN_STRIDE_ALIGNMENT..=SURFACE_MAX_STRIDE_ALIGNMENT).contains(&align)
            || !align.is_power_of_two()
        {
            warn!(align, "stride alignment must be a power of two in range");
            return Err(SurfaceError::InvalidArguments);
        }
        if config.format < 0 || config.format > pixel_format::BUTT {
            warn!(format = config.format, "pixel format out of range");
            return Err(SurfaceError::InvalidArguments);
        }
        Ok(())
    }

    fn check_flush_config(config: &BufferFlushConfig) -> SurfaceResult<()> {
        if config.damage.w < 0 || config.damage.h < 0 {
            warn!(w = config.damage.w, h = config.damage.h, "negative damage extent");
            return Err(SurfaceError::InvalidArguments);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Producer contract
    // ------------------------------------------------------------------

    /// Dequeue a buffer for rendering, allocating or reallocating as needed
    /// and blocking up to `config.timeout_ms` when the pool is exhausted.
    pub fn request_buffer(&self, config: &BufferRequestConfig) -> SurfaceResult<RequestedBuffer> {
        if self.listener.lock().unwrap().is_none() {
            return Err(SurfaceError::NoConsumer);
        }
        Self::check_request_config(config)?;

        let mut inner = self.inner.lock().unwrap();
        if let Some(sequence) = self.pop_from_free_list(&mut inner, config) {
            return self.reuse_buffer(inner, sequence, config);
        }

        if inner.used_size() >= inner.queue_size {
            let timeout = Duration::from_millis(config.timeout_ms as u64);
            let (guard, _) = self
                .wait_req
                .wait_timeout_while(inner, timeout, |inner| {
                    inner.free_list.is_empty() && inner.used_size() >= inner.queue_size
                })
                .unwrap();
            inner = guard;
            if let Some(sequence) = self.pop_from_free_list(&mut inner, config) {
                return self.reuse_buffer(inner, sequence, config);
            }
            if inner.used_size() >= inner.queue_size {
                warn!(queue = self.unique_id, "all buffers in use, request timed out");
                return Err(SurfaceError::NoBuffer);
            }
        }

        let buffer = self.alloc_buffer(&mut inner, config)?;
        let deleting_buffers = std::mem::take(&mut inner.deleting_list);
        let sequence = buffer.sequence();
        debug!(
            sequence,
            queue = self.unique_id,
            width = config.width,
            height = config.height,
            "allocated fresh buffer for request"
        );
        Ok(RequestedBuffer {
            buffer,
            sequence,
            fence: SyncFence::INVALID,
            deleting_buffers,
        })
    }

    /// Free-list pop with a config-match preference. Shared queues hand back
    /// their single cached buffer regardless of lists.
    fn pop_from_free_list(
        &self,
        inner: &mut QueueInner,
        config: &BufferRequestConfig,
    ) -> Option<u64> {
        if self.is_shared {
            return inner.cache.keys().next().copied();
        }
        let mut matching = None;
        for (pos, sequence) in inner.free_list.iter().enumerate() {
            if inner.cache.get(sequence).map(|e| &e.config) == Some(config) {
                matching = Some(pos);
                break;
            }
        }
        match matching {
            Some(pos) => inner.free_list.remove(pos),
            None => inner.free_list.pop_front(),
        }
    }

    /// Hand out a pooled buffer, reallocating when the cached config no
    /// longer matches. The deleting-list drain is snapshotted first so a
    /// reallocation performed here is reported at the *next* request.
    fn reuse_buffer(
        &self,
        mut inner: MutexGuard<'_, QueueInner>,
        sequence: u64,
        config: &BufferRequestConfig,
    ) -> SurfaceResult<RequestedBuffer> {
        let deleting_buffers = std::mem::take(&mut inner.deleting_list);

        let mut sequence = sequence;
        let need_realloc =
            !self.is_shared && inner.cache.get(&sequence).map(|e| &e.config) != Some(config);
        if need_realloc {
            self.delete_buffer_in_cache(&mut inner, sequence);
            let buffer = match self.alloc_buffer(&mut inner, config) {
                Ok(buffer) => buffer,
                Err(err) => {
                    // keep undelivered eviction records for the next request
                    let mut restored = deleting_buffers;
                    restored.append(&mut inner.deleting_list);
                    inner.deleting_list = restored;
                    return Err(err);
                }
            };
            debug!(
                old = sequence,
                new = buffer.sequence(),
                queue = self.unique_id,
                "reallocated buffer on config change"
            );
            sequence = buffer.sequence();
        }

        let element = inner.cache.get_mut(&sequence).ok_or(SurfaceError::NoEntry)?;
        element.state = BufferState::Requested;
        let buffer = element.buffer.clone();
        let fence = element.fence.clone();
        debug!(sequence, queue = self.unique_id, "reusing pooled buffer");
        Ok(RequestedBuffer {
            buffer,
            sequence,
            fence,
            deleting_buffers,
        })
    }

    /// Allocate, map, and insert a fresh buffer in `Requested` state.
    fn alloc_buffer(
        &self,
        inner: &mut QueueInner,
        config: &BufferRequestConfig,
    ) -> SurfaceResult<Arc<SurfaceBuffer>> {
        let handle = self.allocator.alloc(config)?;
        let buffer = Arc::new(SurfaceBuffer::new(handle));
        buffer.set_color_gamut(config.color_gamut);
        buffer.set_transform(config.transform);
        buffer.set_scaling_mode(config.scaling_mode);
        buffer.map()?;
        inner.cache.insert(
            buffer.sequence(),
            BufferElement {
                buffer: buffer.clone(),
                state: BufferState::Requested,
                is_deleting: false,
                config: *config,
                fence: SyncFence::INVALID,
                damage: Rect::default(),
                timestamp: 0,
            },
        );
        Ok(buffer)
    }

    /// Return an unrendered buffer to the free list.
    pub fn cancel_buffer(&self, sequence: u64, extra: ExtraData) -> SurfaceResult<()> {
        if self.is_shared {
            return Err(SurfaceError::InvalidOperating);
        }
        let mut inner = self.inner.lock().unwrap();
        let element = inner.cache.get_mut(&sequence).ok_or(SurfaceError::NoEntry)?;
        if element.state != BufferState::Requested {
            return Err(SurfaceError::InvalidOperating);
        }
        element.state = BufferState::Released;
        element.buffer.set_extra_data(extra);
        inner.free_list.push_back(sequence);
        drop(inner);
        self.wait_req.notify_all();
        debug!(sequence, queue = self.unique_id, "buffer canceled");
        Ok(())
    }

    /// Queue a rendered buffer for the consumer, carrying the acquire fence
    /// and the damage hint.
    pub fn flush_buffer(
        &self,
        sequence: u64,
        extra: ExtraData,
        fence: SyncFence,
        config: &BufferFlushConfig,
    ) -> SurfaceResult<()> {
        Self::check_flush_config(config)?;
        {
            let inner = self.inner.lock().unwrap();
            let element = inner.cache.get(&sequence).ok_or(SurfaceError::NoEntry)?;
            if !self.is_shared
                && element.state != BufferState::Requested
                && element.state != BufferState::Attached
            {
                warn!(sequence, state = ?element.state, "flush from illegal state");
                return Err(SurfaceError::NoEntry);
            }
        }

        if self.listener.lock().unwrap().is_none() {
            // undo the request so the buffer is not stranded
            let _ = self.cancel_buffer(sequence, extra);
            return Err(SurfaceError::NoConsumer);
        }

        self.do_flush_buffer(sequence, extra, fence, config)?;

        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener.on_buffer_available();
        }
        debug!(sequence, queue = self.unique_id, "buffer flushed");
        Ok(())
    }

    fn do_flush_buffer(
        &self,
        sequence: u64,
        extra: ExtraData,
        fence: SyncFence,
        config: &BufferFlushConfig,
    ) -> SurfaceResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.cache.get(&sequence).ok_or(SurfaceError::NoEntry)?.is_deleting {
            self.delete_buffer_in_cache(&mut inner, sequence);
            debug!(sequence, queue = self.unique_id, "flush disposed of deleting buffer");
            return Ok(());
        }

        let element = inner.cache.get_mut(&sequence).ok_or(SurfaceError::NoEntry)?;
        element.state = BufferState::Flushed;
        element.buffer.set_extra_data(extra);
        element.fence = fence;
        element.damage = config.damage;
        element.timestamp = if config.timestamp == 0 { now_micros() } else { config.timestamp };
        if element.config.usage.contains(BufferUsage::CPU_WRITE) {
            element.buffer.flush_cache()?;
        }

        // shared queues are drained straight from the cache, not the lists
        if !self.is_shared {
            inner.dirty_list.push_back(sequence);
        }

        self.dump_to_file(&inner, sequence);
        Ok(())
    }

    /// Admit an externally owned buffer into the cache.
    pub fn attach_buffer(&self, buffer: Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        if self.is_shared {
            return Err(SurfaceError::InvalidOperating);
        }
        let mut inner = self.inner.lock().unwrap();
        let sequence = buffer.sequence();
        let config = BufferRequestConfig {
            width: buffer.width(),
            height: buffer.height(),
            stride_alignment: 8,
            format: buffer.format(),
            usage: buffer.usage(),
            timeout_ms: 0,
            ..Default::default()
        };
        let element = BufferElement {
            damage: Rect::new(0, 0, config.width, config.height),
            buffer,
            state: BufferState::Attached,
            is_deleting: false,
            config,
            fence: SyncFence::INVALID,
            timestamp: 0,
        };

        let used = inner.used_size() as i32;
        let size = inner.queue_size as i32;
        if used >= size {
            let reclaimable = (inner.free_list.len() + inner.dirty_list.len()) as i32;
            let needed = used - size + 1;
            if reclaimable < needed {
                warn!(sequence, queue = self.unique_id, "no room to attach buffer");
                return Err(SurfaceError::OutOfRange);
            }
            self.delete_buffers_locked(&mut inner, needed);
        }
        inner.cache.insert(sequence, element);
        debug!(sequence, queue = self.unique_id, "buffer attached");
        Ok(())
    }

    /// Remove a producer- or consumer-held buffer from the cache.
    pub fn detach_buffer(&self, buffer: &Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        if self.is_shared {
            return Err(SurfaceError::InvalidOperating);
        }
        let mut inner = self.inner.lock().unwrap();
        let sequence = buffer.sequence();
        let state = inner.cache.get(&sequence).ok_or(SurfaceError::NoEntry)?.state;
        if state != BufferState::Requested && state != BufferState::Acquired {
            return Err(SurfaceError::NoEntry);
        }
        if let Some(on_delete) = self.on_delete.lock().unwrap().clone() {
            on_delete(sequence);
        }
        inner.cache.remove(&sequence);
        debug!(sequence, queue = self.unique_id, "buffer detached");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Consumer contract
    // ------------------------------------------------------------------

    /// Take the oldest flushed buffer for composition.
    pub fn acquire_buffer(&self) -> SurfaceResult<AcquiredBuffer> {
        let mut inner = self.inner.lock().unwrap();
        let sequence = if self.is_shared {
            *inner.cache.keys().next().ok_or(SurfaceError::NoBuffer)?
        } else {
            inner.dirty_list.pop_front().ok_or(SurfaceError::NoBuffer)?
        };
        let element = inner.cache.get_mut(&sequence).ok_or(SurfaceError::NoEntry)?;
        if !self.is_shared && element.state != BufferState::Flushed {
            warn!(sequence, state = ?element.state, "acquiring buffer not in flushed state");
        }
        element.state = BufferState::Acquired;
        debug!(sequence, queue = self.unique_id, "buffer acquired");
        Ok(AcquiredBuffer {
            buffer: element.buffer.clone(),
            fence: element.fence.clone(),
            timestamp: element.timestamp,
            damage: element.damage,
        })
    }

    /// Hand a composited buffer back to the pool, carrying the release
    /// fence. If the producer's release hook accepts custody the buffer is
    /// not re-enqueued.
    pub fn release_buffer(
        &self,
        buffer: &Arc<SurfaceBuffer>,
        fence: SyncFence,
    ) -> SurfaceResult<()> {
        let sequence = buffer.sequence();
        {
            let inner = self.inner.lock().unwrap();
            let element = inner.cache.get(&sequence).ok_or(SurfaceError::NoEntry)?;
            if !self.is_shared
                && element.state != BufferState::Acquired
                && element.state != BufferState::Attached
            {
                warn!(sequence, state = ?element.state, "release from illegal state");
                return Err(SurfaceError::NoEntry);
            }
        }

        let on_release = self.on_release.lock().unwrap().clone();
        if let Some(on_release) = on_release {
            if on_release(buffer).is_ok() {
                // producer took custody of the buffer
                debug!(sequence, queue = self.unique_id, "release consumed by producer hook");
                return Ok(());
            }
        }

        let mut inner = self.inner.lock().unwrap();
        let element = inner.cache.get_mut(&sequence).ok_or(SurfaceError::NoEntry)?;
        element.state = BufferState::Released;
        element.fence = fence;
        let is_deleting = element.is_deleting;
        if is_deleting {
            self.delete_buffer_in_cache(&mut inner, sequence);
            debug!(sequence, queue = self.unique_id, "deleting buffer dropped at release");
        } else if !self.is_shared {
            inner.free_list.push_back(sequence);
            debug!(sequence, queue = self.unique_id, "buffer released to free list");
        }
        drop(inner);
        self.wait_req.notify_all();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cache maintenance
    // ------------------------------------------------------------------

    /// Evict one entry, reporting it to the delete hook and recording it for
    /// the producer's next request.
    fn delete_buffer_in_cache(&self, inner: &mut QueueInner, sequence: u64) {
        if inner.cache.remove(&sequence).is_some() {
            if let Some(on_delete) = self.on_delete.lock().unwrap().clone() {
                on_delete(sequence);
            }
            inner.deleting_list.push(sequence);
        }
    }

    /// Evict up to `count` buffers: free list first, dirty list next, and
    /// mark the remainder deleting so they drop at their next transition.
    fn delete_buffers_locked(&self, inner: &mut QueueInner, mut count: i32) {
        if count <= 0 {
            return;
        }
        while let Some(sequence) = inner.free_list.pop_front() {
            self.delete_buffer_in_cache(inner, sequence);
            count -= 1;
            if count <= 0 {
                return;
            }
        }
        while let Some(sequence) = inner.dirty_list.pop_front() {
            self.delete_buffer_in_cache(inner, sequence);
            count -= 1;
            if count <= 0 {
                return;
            }
        }
        let mut remaining: Vec<u64> = inner.cache.keys().copied().collect();
        remaining.sort_unstable();
        for sequence in remaining {
            if let Some(element) = inner.cache.get_mut(&sequence) {
                element.is_deleting = true;
            }
            count -= 1;
            if count <= 0 {
                break;
            }
        }
    }

    /// Resize the pool. Shrinking evicts reclaimable buffers immediately and
    /// marks held ones to drop on their next transition.
    pub fn set_queue_size(&self, queue_size: u32) -> SurfaceResult<()> {
        if self.is_shared && queue_size != 1 {
            return Err(SurfaceError::InvalidArguments);
        }
        if queue_size == 0 || queue_size > SURFACE_MAX_QUEUE_SIZE {
            warn!(queue_size, "queue size out of range");
            return Err(SurfaceError::InvalidArguments);
        }
        let mut inner = self.inner.lock().unwrap();
        let shrink = inner.queue_size as i32 - queue_size as i32;
        self.delete_buffers_locked(&mut inner, shrink);
        inner.queue_size = queue_size;
        info!(queue = self.unique_id, queue_size, "queue size changed");
        Ok(())
    }

    /// Drop every cached buffer and wake all request waiters.
    pub fn clean_cache(&self) -> SurfaceResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let on_delete = self.on_delete.lock().unwrap().clone();
        if let Some(on_delete) = on_delete {
            let mut sequences: Vec<u64> = inner.cache.keys().copied().collect();
            sequences.sort_unstable();
            for sequence in sequences {
                on_delete(sequence);
            }
        }
        inner.cache.clear();
        inner.free_list.clear();
        inner.dirty_list.clear();
        inner.deleting_list.clear();
        drop(inner);
        self.wait_req.notify_all();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listener registration
    // ------------------------------------------------------------------

    pub fn register_consumer_listener(&self, listener: Arc<dyn ConsumerListener>) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    pub fn unregister_consumer_listener(&self) {
        *self.listener.lock().unwrap() = None;
    }

    /// Install the producer's release hook, replacing any prior hook.
    pub fn register_release_listener<F>(&self, hook: F)
    where
        F: Fn(&Arc<SurfaceBuffer>) -> SurfaceResult<()> + Send + Sync + 'static,
    {
        *self.on_release.lock().unwrap() = Some(Arc::new(hook));
    }

    /// Install the delete hook. The first installation wins for the queue's
    /// lifetime; later calls are silently ignored.
    pub fn register_delete_buffer_listener<F>(&self, hook: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let mut slot = self.on_delete.lock().unwrap();
        if slot.is_none() {
            *slot = Some(Arc::new(hook));
        }
    }

    // ------------------------------------------------------------------
    // Consumer-side hints
    // ------------------------------------------------------------------

    pub fn set_default_width_and_height(&self, width: i32, height: i32) -> SurfaceResult<()> {
        if width <= 0 || height <= 0 {
            return Err(SurfaceError::InvalidArguments);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.default_width = width;
        inner.default_height = height;
        Ok(())
    }

    pub fn default_width(&self) -> i32 {
        self.inner.lock().unwrap().default_width
    }

    pub fn default_height(&self) -> i32 {
        self.inner.lock().unwrap().default_height
    }

    pub fn set_default_usage(&self, usage: BufferUsage) {
        self.inner.lock().unwrap().default_usage = usage;
    }

    pub fn default_usage(&self) -> BufferUsage {
        self.inner.lock().unwrap().default_usage
    }

    pub fn set_transform(&self, transform: TransformType) {
        self.inner.lock().unwrap().transform = transform;
    }

    pub fn transform(&self) -> TransformType {
        self.inner.lock().unwrap().transform
    }

    /// Ask the allocator which of `infos` it could satisfy.
    pub fn is_supported_alloc(&self, infos: &[VerifyAllocInfo]) -> SurfaceResult<Vec<bool>> {
        self.allocator.is_supported_alloc(infos)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Multi-line textual dump of the queue and its cache.
    pub fn dump(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let total_mem: usize = inner.cache.values().map(|e| e.buffer.size()).sum();
        let mut out = String::new();
        out.push_str("BufferQueue:\n");
        out.push_str(&format!(
            "  default-size = [{}x{}], FIFO = {}, name = {}, uniqueId = {}, \
             usedBufferListLen = {}, freeBufferListLen = {}, dirtyBufferListLen = {}, \
             totalBuffersMemSize = {:.2}(KiB)\n",
            inner.default_width,
            inner.default_height,
            inner.queue_size,
            self.name,
            self.unique_id,
            inner.used_size(),
            inner.free_list.len(),
            inner.dirty_list.len(),
            total_mem as f64 / 1024.0,
        ));
        out.push_str("  cache:\n");
        let mut sequences: Vec<u64> = inner.cache.keys().copied().collect();
        sequences.sort_unstable();
        for sequence in sequences {
            let e = &inner.cache[&sequence];
            out.push_str(&format!(
                "    sequence = {}, state = {}, timestamp = {}, damage = [{}, {}, {}, {}], \
                 config = [{}x{}, {}, {}, {:#x}, {}], bufferMemSize = {:.2}(KiB)\n",
                sequence,
                e.state.dump_str(),
                e.timestamp,
                e.damage.x,
                e.damage.y,
                e.damage.w,
                e.damage.h,
                e.config.width,
                e.config.height,
                e.config.stride_alignment,
                e.config.format,
                e.config.usage.bits(),
                e.config.timeout_ms,
                e.buffer.size() as f64 / 1024.0,
            ));
        }
        out
    }

    #[cfg(feature = "buffer-dump")]
    fn dump_to_file(&self, inner: &QueueInner, sequence: u64) {
        use std::io::Write;

        let trigger = std::env::var("GLINT_BQ_DUMP_DIR")
            .unwrap_or_else(|_| "/data/bq_dump".to_string());
        let trigger = std::path::Path::new(&trigger);
        if !trigger.exists() {
            return;
        }
        let Some(element) = inner.cache.get(&sequence) else {
            return;
        };
        let mut raw = vec![0u8; element.buffer.size()];
        if element.buffer.read_bytes(0, &mut raw).is_err() {
            return;
        }
        let dir = trigger.parent().unwrap_or_else(|| std::path::Path::new("/data"));
        let path = dir.join(format!(
            "bq_{}_{}_{}.raw",
            unsafe { libc::getpid() },
            self.name,
            now_micros(),
        ));
        match std::fs::File::create(&path) {
            Ok(mut file) => {
                if let Err(err) = file.write_all(&raw) {
                    warn!(?path, %err, "buffer dump write failed");
                }
            }
            Err(err) => warn!(?path, %err, "buffer dump open failed"),
        }
    }

    #[cfg(not(feature = "buffer-dump"))]
    fn dump_to_file(&self, _inner: &QueueInner, _sequence: u64) {}

    // ------------------------------------------------------------------
    // Test introspection
    // ------------------------------------------------------------------

    #[cfg(test)]
    pub(crate) fn lists_snapshot(&self) -> (Vec<u64>, Vec<u64>) {
        let inner = self.inner.lock().unwrap();
        (
            inner.free_list.iter().copied().collect(),
            inner.dirty_list.iter().copied().collect(),
        )
    }

    #[cfg(test)]
    pub(crate) fn state_of(&self, sequence: u64) -> Option<BufferState> {
        self.inner.lock().unwrap().cache.get(&sequence).map(|e| e.state)
    }
}

impl Drop for BufferQueue {
    fn drop(&mut self) {
        info!(queue = self.unique_id, "buffer queue destroyed");
        let _ = self.clean_cache();
    }
}

impl std::fmt::Debug for BufferQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferQueue")
            .field("name", &self.name)
            .field("unique_id", &self.unique_id)
            .field("is_shared", &self.is_shared)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingListener {
        available: AtomicUsize,
    }

    impl CountingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self { available: AtomicUsize::new(0) })
        }

        fn count(&self) -> usize {
            self.available.load(Ordering::SeqCst)
        }
    }

    impl ConsumerListener for CountingListener {
        fn on_buffer_available(&self) {
            self.available.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn listening_queue(name: &str, shared: bool) -> (Arc<BufferQueue>, Arc<CountingListener>) {
        let queue = Arc::new(BufferQueue::new(name, shared));
        let listener = CountingListener::new();
        queue.register_consumer_listener(listener.clone());
        (queue, listener)
    }

    fn config(width: i32, height: i32) -> BufferRequestConfig {
        BufferRequestConfig {
            width,
            height,
            timeout_ms: 1000,
            ..Default::default()
        }
    }

    fn flush(queue: &BufferQueue, sequence: u64) {
        queue
            .flush_buffer(
                sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig::default(),
            )
            .unwrap();
    }

    #[test]
    fn test_init_is_noop_ok() {
        let (queue, _) = listening_queue("init", false);
        assert_eq!(queue.init(), Ok(()));
    }

    #[test]
    fn test_request_without_listener() {
        let queue = BufferQueue::new("orphan", false);
        assert_eq!(
            queue.request_buffer(&config(800, 600)).err(),
            Some(SurfaceError::NoConsumer)
        );
    }

    #[test]
    fn test_request_validates_config() {
        let (queue, _) = listening_queue("validate", false);
        assert_eq!(
            queue.request_buffer(&config(0, 600)).err(),
            Some(SurfaceError::InvalidArguments)
        );
        let bad_align = BufferRequestConfig {
            stride_alignment: 3,
            ..config(800, 600)
        };
        assert_eq!(
            queue.request_buffer(&bad_align).err(),
            Some(SurfaceError::InvalidArguments)
        );
        let ok_align = BufferRequestConfig {
            stride_alignment: 4,
            ..config(1, 1)
        };
        assert!(queue.request_buffer(&ok_align).is_ok());
        let bad_format = BufferRequestConfig {
            format: pixel_format::BUTT + 1,
            ..config(800, 600)
        };
        assert_eq!(
            queue.request_buffer(&bad_format).err(),
            Some(SurfaceError::InvalidArguments)
        );
    }

    #[test]
    fn test_round_trip_reuses_buffer() {
        let (queue, listener) = listening_queue("roundtrip", false);
        let cfg = BufferRequestConfig {
            format: pixel_format::RGBA_8888,
            ..config(800, 600)
        };

        let first = queue.request_buffer(&cfg).unwrap();
        assert!(!first.fence.is_valid());
        assert!(first.deleting_buffers.is_empty());

        queue
            .flush_buffer(
                first.sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig {
                    damage: Rect::new(0, 0, 800, 600),
                    timestamp: 0,
                },
            )
            .unwrap();
        assert_eq!(listener.count(), 1);

        let acquired = queue.acquire_buffer().unwrap();
        assert_eq!(acquired.buffer.sequence(), first.sequence);
        assert!(acquired.timestamp > 0);
        assert_eq!(acquired.damage, Rect::new(0, 0, 800, 600));

        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();

        let second = queue.request_buffer(&cfg).unwrap();
        assert_eq!(second.sequence, first.sequence);
    }

    #[test]
    fn test_realloc_reports_deleted_sequence_next_request() {
        let (queue, _) = listening_queue("realloc", false);
        let small = config(800, 600);
        let big = config(1024, 768);

        let first = queue.request_buffer(&small).unwrap();
        flush(&queue, first.sequence);
        let acquired = queue.acquire_buffer().unwrap();
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();

        // config change reallocates; the eviction is reported next time
        let second = queue.request_buffer(&big).unwrap();
        assert_ne!(second.sequence, first.sequence);
        assert!(second.deleting_buffers.is_empty());

        let third = queue.request_buffer(&big).unwrap();
        assert_eq!(third.deleting_buffers, vec![first.sequence]);
    }

    #[test]
    fn test_exhaustion_times_out() {
        let (queue, _) = listening_queue("exhaust", false);
        queue.set_queue_size(1).unwrap();
        let cfg = BufferRequestConfig {
            timeout_ms: 100,
            ..config(64, 64)
        };
        let _held = queue.request_buffer(&cfg).unwrap();

        let start = Instant::now();
        assert_eq!(queue.request_buffer(&cfg).err(), Some(SurfaceError::NoBuffer));
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn test_release_wakes_request_waiter() {
        let (queue, _) = listening_queue("wake", false);
        queue.set_queue_size(1).unwrap();
        let cfg = BufferRequestConfig {
            timeout_ms: 5000,
            ..config(64, 64)
        };
        let held = queue.request_buffer(&cfg).unwrap();
        flush(&queue, held.sequence);
        let acquired = queue.acquire_buffer().unwrap();

        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.request_buffer(&cfg).map(|r| r.sequence))
        };
        std::thread::sleep(Duration::from_millis(50));
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();
        assert_eq!(waiter.join().unwrap(), Ok(held.sequence));
    }

    #[test]
    fn test_cancel_state_machine() {
        let (queue, _) = listening_queue("cancel", false);
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        assert_eq!(
            queue.cancel_buffer(9999, ExtraData::new()),
            Err(SurfaceError::NoEntry)
        );
        queue.cancel_buffer(requested.sequence, ExtraData::new()).unwrap();
        // already released: a second cancel is illegal
        assert_eq!(
            queue.cancel_buffer(requested.sequence, ExtraData::new()),
            Err(SurfaceError::InvalidOperating)
        );
        // canceled buffer is immediately reusable
        let again = queue.request_buffer(&config(64, 64)).unwrap();
        assert_eq!(again.sequence, requested.sequence);
    }

    #[test]
    fn test_shared_queue_refuses_cancel() {
        let (queue, _) = listening_queue("shared-cancel", true);
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        assert_eq!(
            queue.cancel_buffer(requested.sequence, ExtraData::new()),
            Err(SurfaceError::InvalidOperating)
        );
    }

    #[test]
    fn test_shared_queue_recirculates_single_buffer() {
        let (queue, _) = listening_queue("shared", true);
        assert_eq!(queue.queue_size(), 1);

        let first = queue.request_buffer(&config(64, 64)).unwrap();
        flush(&queue, first.sequence);
        // shared mode tolerates flush-to-flush recirculation
        flush(&queue, first.sequence);

        // a differing config still returns the single cached buffer
        let second = queue.request_buffer(&config(128, 128)).unwrap();
        assert_eq!(second.sequence, first.sequence);
        assert_eq!(queue.used_size(), 1);

        let acquired = queue.acquire_buffer().unwrap();
        assert_eq!(acquired.buffer.sequence(), first.sequence);
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();
        assert_eq!(queue.used_size(), 1);
    }

    #[test]
    fn test_flush_unknown_and_wrong_state() {
        let (queue, _) = listening_queue("badflush", false);
        assert_eq!(
            queue.flush_buffer(
                42,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig::default()
            ),
            Err(SurfaceError::NoEntry)
        );
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        flush(&queue, requested.sequence);
        // Flushed is not a legal source state for flush
        assert_eq!(
            queue.flush_buffer(
                requested.sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig::default()
            ),
            Err(SurfaceError::NoEntry)
        );
    }

    #[test]
    fn test_flush_rejects_negative_damage() {
        let (queue, _) = listening_queue("damage", false);
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        let bad = BufferFlushConfig {
            damage: Rect::new(0, 0, -1, 64),
            timestamp: 0,
        };
        assert_eq!(
            queue.flush_buffer(requested.sequence, ExtraData::new(), SyncFence::INVALID, &bad),
            Err(SurfaceError::InvalidArguments)
        );
    }

    #[test]
    fn test_flush_without_listener_cancels() {
        let (queue, _) = listening_queue("unlisten", false);
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        queue.unregister_consumer_listener();
        assert_eq!(
            queue.flush_buffer(
                requested.sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig::default()
            ),
            Err(SurfaceError::NoConsumer)
        );
        // the undo moved it back to the free list
        assert_eq!(queue.state_of(requested.sequence), Some(BufferState::Released));
    }

    #[test]
    fn test_flush_timestamp_zero_and_explicit() {
        let (queue, _) = listening_queue("stamp", false);
        let first = queue.request_buffer(&config(64, 64)).unwrap();
        flush(&queue, first.sequence);
        let acquired = queue.acquire_buffer().unwrap();
        assert!(acquired.timestamp > 0);
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();

        let second = queue.request_buffer(&config(64, 64)).unwrap();
        queue
            .flush_buffer(
                second.sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig {
                    damage: Rect::default(),
                    timestamp: 777_000,
                },
            )
            .unwrap();
        assert_eq!(queue.acquire_buffer().unwrap().timestamp, 777_000);
    }

    #[test]
    fn test_acquire_empty() {
        let (queue, _) = listening_queue("empty", false);
        assert_eq!(queue.acquire_buffer().err(), Some(SurfaceError::NoBuffer));
    }

    #[test]
    fn test_release_custody_hook_skips_requeue() {
        let (queue, _) = listening_queue("custody", false);
        queue.set_queue_size(1).unwrap();
        queue.register_release_listener(|_buffer| Ok(()));

        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        flush(&queue, requested.sequence);
        let acquired = queue.acquire_buffer().unwrap();
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();

        // the hook took custody: the pool is still exhausted
        let quick = BufferRequestConfig {
            timeout_ms: 0,
            ..config(64, 64)
        };
        assert_eq!(queue.request_buffer(&quick).err(), Some(SurfaceError::NoBuffer));
    }

    #[test]
    fn test_release_hook_error_requeues() {
        let (queue, _) = listening_queue("custody-refused", false);
        queue.register_release_listener(|_buffer| Err(SurfaceError::InvalidOperating));

        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        flush(&queue, requested.sequence);
        let acquired = queue.acquire_buffer().unwrap();
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();
        let (free, _) = queue.lists_snapshot();
        assert_eq!(free, vec![requested.sequence]);
    }

    #[test]
    fn test_delete_listener_installs_once() {
        let (queue, _) = listening_queue("delonce", false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            queue.register_delete_buffer_listener(move |sequence| {
                seen.lock().unwrap().push(sequence);
            });
        }
        // second install is silently ignored
        queue.register_delete_buffer_listener(|_| panic!("must never run"));

        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        queue.clean_cache().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![requested.sequence]);
    }

    #[test]
    fn test_set_queue_size_bounds() {
        let (queue, _) = listening_queue("bounds", false);
        assert_eq!(queue.set_queue_size(0), Err(SurfaceError::InvalidArguments));
        assert_eq!(queue.set_queue_size(SURFACE_MAX_QUEUE_SIZE), Ok(()));
        assert_eq!(
            queue.set_queue_size(SURFACE_MAX_QUEUE_SIZE + 1),
            Err(SurfaceError::InvalidArguments)
        );

        let (shared, _) = listening_queue("bounds-shared", true);
        assert_eq!(shared.set_queue_size(2), Err(SurfaceError::InvalidArguments));
        assert_eq!(shared.set_queue_size(1), Ok(()));
    }

    #[test]
    fn test_shrink_marks_held_buffers_deleting() {
        let (queue, _) = listening_queue("shrink", false);
        let cfg = config(64, 64);

        // occupy all three default slots
        let first = queue.request_buffer(&cfg).unwrap();
        flush(&queue, first.sequence);
        let first_acq = queue.acquire_buffer().unwrap();
        let second = queue.request_buffer(&cfg).unwrap();
        flush(&queue, second.sequence);
        let second_acq = queue.acquire_buffer().unwrap();
        let _third = queue.request_buffer(&cfg).unwrap();
        assert_eq!(queue.used_size(), 3);

        // nothing reclaimable: the two acquired + one requested get marked
        queue.set_queue_size(1).unwrap();
        assert_eq!(queue.used_size(), 3);

        queue.release_buffer(&first_acq.buffer, SyncFence::INVALID).unwrap();
        assert_eq!(queue.state_of(first.sequence), None);
        queue.release_buffer(&second_acq.buffer, SyncFence::INVALID).unwrap();
        assert_eq!(queue.used_size(), 1);
        let (free, dirty) = queue.lists_snapshot();
        assert!(free.is_empty() && dirty.is_empty());
    }

    #[test]
    fn test_attach_detach() {
        let (queue, _) = listening_queue("attach", false);
        let cfg = config(32, 32);
        let external = Arc::new(SurfaceBuffer::new(
            MemfdAllocator.alloc(&cfg).unwrap(),
        ));
        external.map().unwrap();

        queue.attach_buffer(external.clone()).unwrap();
        assert_eq!(queue.state_of(external.sequence()), Some(BufferState::Attached));

        // attached buffers may flush
        flush(&queue, external.sequence());
        let acquired = queue.acquire_buffer().unwrap();
        assert_eq!(acquired.buffer.sequence(), external.sequence());
        queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();
        assert_eq!(queue.state_of(external.sequence()), Some(BufferState::Released));

        // a released entry is not detachable
        assert_eq!(queue.detach_buffer(&external), Err(SurfaceError::NoEntry));

        let requested = queue.request_buffer(&cfg).unwrap();
        queue.detach_buffer(&requested.buffer).unwrap();
        assert_eq!(queue.state_of(requested.sequence), None);
    }

    #[test]
    fn test_attach_overflow() {
        let (queue, _) = listening_queue("attach-full", false);
        queue.set_queue_size(1).unwrap();
        let cfg = config(32, 32);
        let _held = queue.request_buffer(&cfg).unwrap();

        let external = Arc::new(SurfaceBuffer::new(
            MemfdAllocator.alloc(&cfg).unwrap(),
        ));
        assert_eq!(queue.attach_buffer(external), Err(SurfaceError::OutOfRange));
    }

    #[test]
    fn test_attach_evicts_reclaimable() {
        let (queue, _) = listening_queue("attach-evict", false);
        queue.set_queue_size(1).unwrap();
        let cfg = config(32, 32);
        let held = queue.request_buffer(&cfg).unwrap();
        queue.cancel_buffer(held.sequence, ExtraData::new()).unwrap();

        let external = Arc::new(SurfaceBuffer::new(
            MemfdAllocator.alloc(&cfg).unwrap(),
        ));
        queue.attach_buffer(external.clone()).unwrap();
        assert_eq!(queue.state_of(held.sequence), None);
        assert_eq!(queue.state_of(external.sequence()), Some(BufferState::Attached));
    }

    #[test]
    fn test_shared_queue_refuses_attach_detach() {
        let (queue, _) = listening_queue("shared-attach", true);
        let external = Arc::new(SurfaceBuffer::new(
            MemfdAllocator.alloc(&config(32, 32)).unwrap(),
        ));
        assert_eq!(
            queue.attach_buffer(external.clone()),
            Err(SurfaceError::InvalidOperating)
        );
        assert_eq!(queue.detach_buffer(&external), Err(SurfaceError::InvalidOperating));
    }

    #[test]
    fn test_free_and_dirty_stay_disjoint() {
        let (queue, _) = listening_queue("disjoint", false);
        let cfg = config(64, 64);
        for _ in 0..3 {
            let requested = queue.request_buffer(&cfg).unwrap();
            flush(&queue, requested.sequence);
            let (free, dirty) = queue.lists_snapshot();
            assert!(free.iter().all(|s| !dirty.contains(s)));
            let acquired = queue.acquire_buffer().unwrap();
            queue.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();
            let (free, dirty) = queue.lists_snapshot();
            assert!(free.iter().all(|s| !dirty.contains(s)));
            assert_eq!(free.len() + dirty.len(), queue.used_size() as usize);
        }
    }

    #[test]
    fn test_clean_cache_wakes_waiter() {
        let (queue, _) = listening_queue("clean", false);
        queue.set_queue_size(1).unwrap();
        let cfg = BufferRequestConfig {
            timeout_ms: 5000,
            ..config(64, 64)
        };
        let _held = queue.request_buffer(&cfg).unwrap();

        let waiter = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                let start = Instant::now();
                let result = queue.request_buffer(&cfg);
                (result.is_ok(), start.elapsed())
            })
        };
        std::thread::sleep(Duration::from_millis(50));
        queue.clean_cache().unwrap();
        let (ok, waited) = waiter.join().unwrap();
        // the emptied pool lets the waiter allocate fresh, well before timeout
        assert!(ok);
        assert!(waited < Duration::from_millis(4000));
    }

    #[test]
    fn test_defaults_and_transform() {
        let (queue, _) = listening_queue("defaults", false);
        assert_eq!(
            queue.set_default_width_and_height(0, 10),
            Err(SurfaceError::InvalidArguments)
        );
        queue.set_default_width_and_height(1920, 1080).unwrap();
        assert_eq!((queue.default_width(), queue.default_height()), (1920, 1080));
        queue.set_default_usage(BufferUsage::MEM_DMA);
        assert_eq!(queue.default_usage(), BufferUsage::MEM_DMA);
        queue.set_transform(TransformType::Rotate180);
        assert_eq!(queue.transform(), TransformType::Rotate180);
    }

    #[test]
    fn test_dump_lists_entries() {
        let (queue, _) = listening_queue("dumpq", false);
        let requested = queue.request_buffer(&config(64, 64)).unwrap();
        let text = queue.dump();
        assert!(text.contains("FIFO = 3"));
        assert!(text.contains(&format!("sequence = {}", requested.sequence)));
        assert!(text.contains("<requested>"));
    }
}
