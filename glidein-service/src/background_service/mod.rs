use service_glidein::EventQueueRunner;

/// A task that runs for the lifetime of the service.
#[async_trait::async_trait]
pub trait BackgroundService: Send + Sync {
    async fn run(&self);
}

#[async_trait::async_trait]
impl BackgroundService for EventQueueRunner {
    async fn run(&self) {
        EventQueueRunner::run(self).await;
    }
}
