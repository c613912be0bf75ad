//! Consumer-side view of a buffer queue.

use std::sync::Arc;

use crate::buffer::SurfaceBuffer;
use crate::error::SurfaceResult;
use crate::fence::SyncFence;
use crate::queue::{AcquiredBuffer, BufferQueue, ConsumerListener};
use crate::types::{BufferUsage, TransformType};

/// Role-restricted handle for the compositing side: acquire, read, release.
#[derive(Debug, Clone)]
pub struct BufferQueueConsumer {
    queue: Arc<BufferQueue>,
}

impl BufferQueueConsumer {
    pub fn new(queue: Arc<BufferQueue>) -> Self {
        Self { queue }
    }

    /// Take the oldest flushed buffer, with its fence, timestamp, and damage.
    pub fn acquire_buffer(&self) -> SurfaceResult<AcquiredBuffer> {
        self.queue.acquire_buffer()
    }

    /// Return a composited buffer with its release fence.
    pub fn release_buffer(&self, buffer: &Arc<SurfaceBuffer>, fence: SyncFence) -> SurfaceResult<()> {
        self.queue.release_buffer(buffer, fence)
    }

    pub fn attach_buffer(&self, buffer: Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        self.queue.attach_buffer(buffer)
    }

    pub fn detach_buffer(&self, buffer: &Arc<SurfaceBuffer>) -> SurfaceResult<()> {
        self.queue.detach_buffer(buffer)
    }

    pub fn register_consumer_listener(&self, listener: Arc<dyn ConsumerListener>) {
        self.queue.register_consumer_listener(listener)
    }

    pub fn unregister_consumer_listener(&self) {
        self.queue.unregister_consumer_listener()
    }

    /// Install the producer's release hook (see
    /// [`BufferQueue::register_release_listener`]).
    pub fn register_release_listener<F>(&self, hook: F)
    where
        F: Fn(&Arc<SurfaceBuffer>) -> SurfaceResult<()> + Send + Sync + 'static,
    {
        self.queue.register_release_listener(hook)
    }

    /// Install the delete hook. Only the first installation takes effect.
    pub fn register_delete_buffer_listener<F>(&self, hook: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.queue.register_delete_buffer_listener(hook)
    }

    pub fn set_default_width_and_height(&self, width: i32, height: i32) -> SurfaceResult<()> {
        self.queue.set_default_width_and_height(width, height)
    }

    pub fn set_default_usage(&self, usage: BufferUsage) {
        self.queue.set_default_usage(usage)
    }

    pub fn set_transform(&self, transform: TransformType) {
        self.queue.set_transform(transform)
    }

    pub fn transform(&self) -> TransformType {
        self.queue.transform()
    }

    pub fn name(&self) -> &str {
        self.queue.name()
    }

    pub fn unique_id(&self) -> u64 {
        self.queue.unique_id()
    }

    pub fn dump(&self) -> String {
        self.queue.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::extra::ExtraData;
    use crate::producer::BufferQueueProducer;
    use crate::types::{BufferFlushConfig, BufferRequestConfig, Rect};

    struct Noop;

    impl ConsumerListener for Noop {
        fn on_buffer_available(&self) {}
    }

    #[test]
    fn test_consumer_cycle() {
        let queue = Arc::new(BufferQueue::new("cons", false));
        let producer = BufferQueueProducer::new(queue.clone());
        let consumer = BufferQueueConsumer::new(queue);

        assert_eq!(consumer.acquire_buffer().err(), Some(SurfaceError::NoBuffer));
        consumer.register_consumer_listener(Arc::new(Noop));

        let config = BufferRequestConfig {
            width: 16,
            height: 16,
            ..Default::default()
        };
        let requested = producer.request_buffer(&config).unwrap();
        producer
            .flush_buffer(
                requested.sequence,
                ExtraData::new(),
                SyncFence::INVALID,
                &BufferFlushConfig {
                    damage: Rect::new(0, 0, 16, 16),
                    timestamp: 0,
                },
            )
            .unwrap();

        let acquired = consumer.acquire_buffer().unwrap();
        assert_eq!(acquired.damage, Rect::new(0, 0, 16, 16));
        consumer.release_buffer(&acquired.buffer, SyncFence::INVALID).unwrap();

        consumer.set_transform(TransformType::Rotate90);
        assert_eq!(consumer.transform(), TransformType::Rotate90);
        assert!(consumer.dump().contains("cons"));
    }
}
