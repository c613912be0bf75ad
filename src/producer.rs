//! Producer-side view of a buffer queue.

use std::sync::Arc;

use crate::buffer::SurfaceBuffer;
use crate::error::SurfaceResult;
use crate::extra::ExtraData;
use crate::fence::SyncFence;
use crate::queue::{BufferQueue, RequestedBuffer};
use crate::types::{BufferFlushConfig, BufferRequestConfig, BufferUsage};

/// Role-restricted handle for the rendering side: request, render, flush.
#[derive(Debug, Clone)]
pub struct BufferQueueProducer {
    queue: Arc<BufferQueue>,
}

impl BufferQueueProducer {
    pub fn new(queue: Arc<BufferQueue>) -> Self {
        Self { queue }
    }

    /// Dequeue a buffer to render into, blocking up to `config.timeout_ms`.
    pub fn request_buffer(&self, config: &BufferRequestConfig) -> SurfaceResult<RequestedBuffer> {
        self.queue.request_buffer(config)
    }

    /// Give back an unrendered buffer.
    pub fn cancel_buffer(&self, sequence: u64, extra: ExtraData) -> SurfaceResult<()> {
        self.queue.cancel_buffer(sequence, extra)
    }

    /// Publish a rendered buffer to the consumer.
    pub fn flush_buffer(
        &self,
        sequence: u64,
        extra: ExtraData,
        fence: SyncFence,
        config: &BufferFlushConfig,
    ) -> SurfaceResult<()> {
        self.queue.flush_buffer(sequence, extra, fence, config)
    }

    pub fn attach_buffer(&self, buffer: Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        self.queue.attach_buffer(buffer)
    }

    pub fn detach_buffer(&self, buffer: &Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        self.queue.detach_buffer(buffer)
    }

    pub fn queue_size(&self) -> u32 {
        self.queue.queue_size()
    }

    pub fn set_queue_size(&self, queue_size: u32) -> SurfaceResult<()> {
        self.queue.set_queue_size(queue_size)
    }

    pub fn name(&self) -> &str {
        self.queue.name()
    }

    pub fn unique_id(&self) -> u64 {
        self.queue.unique_id()
    }

    pub fn default_width(&self) -> i32 {
        self.queue.default_width()
    }

    pub fn default_height(&self) -> i32 {
        self.queue.default_height()
    }

    pub fn default_usage(&self) -> BufferUsage {
        self.queue.default_usage()
    }

    /// Install the release hook; `Ok` from the hook keeps the buffer out of
    /// the free list (the producer took custody).
    pub fn register_release_listener<F>(&self, hook: F)
    where
        F: Fn(&Arc<SurfaceBuffer>) -> SurfaceResult<()> + Send + Sync + 'static,
    {
        self.queue.register_release_listener(hook)
    }

    pub fn clean_cache(&self) -> SurfaceResult<()> {
        self.queue.clean_cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::BufferQueueConsumer;
    use crate::queue::ConsumerListener;

    struct Noop;

    impl ConsumerListener for Noop {
        fn on_buffer_available(&self) {}
    }

    #[test]
    fn test_producer_delegates() {
        let queue = Arc::new(BufferQueue::new("prod", false));
        let producer = BufferQueueProducer::new(queue.clone());
        let consumer = BufferQueueConsumer::new(queue);
        consumer.register_consumer_listener(Arc::new(Noop));

        assert_eq!(producer.name(), "prod");
        assert_eq!(producer.queue_size(), 3);
        producer.set_queue_size(2).unwrap();
        assert_eq!(producer.queue_size(), 2);

        let config = BufferRequestConfig {
            width: 16,
            height: 16,
            ..Default::default()
        };
        let requested = producer.request_buffer(&config).unwrap();
        producer.cancel_buffer(requested.sequence, ExtraData::new()).unwrap();
    }
}
