use std::sync::Arc;

use dashmap::DashMap;
use domain_glidein::model::vo::msg::{ResourceEvent, ResourceKind};
use domain_glidein::service::{GlideinStateService, SiteStateService};
use tracing::Instrument;
use uuid::Uuid;

/// Producer side of the resource event queue. Cheap to clone; listeners and
/// state machines all hold one.
#[derive(Clone)]
pub struct EventQueue {
    tx: flume::Sender<ResourceEvent>,
}

impl EventQueue {
    pub fn new() -> (Self, flume::Receiver<ResourceEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn add(&self, event: ResourceEvent) {
        if self.tx.send(event).is_err() {
            tracing::error!("event queue is closed, dropping event");
        }
    }
}

/// Serializing mediator between event producers and the resource state
/// machines. Events for one resource are applied strictly in the order they
/// were enqueued; different resources are handled in parallel.
pub struct EventQueueRunner {
    rx: flume::Receiver<ResourceEvent>,
    site_service: Arc<dyn SiteStateService>,
    glidein_service: Arc<dyn GlideinStateService>,
    lanes: DashMap<(ResourceKind, Uuid), flume::Sender<ResourceEvent>>,
}

impl EventQueueRunner {
    pub fn new(
        rx: flume::Receiver<ResourceEvent>,
        site_service: Arc<dyn SiteStateService>,
        glidein_service: Arc<dyn GlideinStateService>,
    ) -> Self {
        Self {
            rx,
            site_service,
            glidein_service,
            lanes: DashMap::new(),
        }
    }

    pub async fn run(&self) {
        while let Ok(event) = self.rx.recv_async().await {
            let key = event.lane_key();
            let lane = self.lanes.entry(key).or_insert_with(|| self.spawn_lane(key));
            if lane.send(event).is_err() {
                tracing::error!(?key, "resource event lane is closed, dropping event");
            }
        }
    }

    /// One worker task per live resource: the per-resource mutual exclusion
    /// the state machines rely on.
    fn spawn_lane(&self, key: (ResourceKind, Uuid)) -> flume::Sender<ResourceEvent> {
        let (tx, rx) = flume::unbounded::<ResourceEvent>();
        let site_service = self.site_service.clone();
        let glidein_service = self.glidein_service.clone();
        tokio::spawn(
            async move {
                while let Ok(event) = rx.recv_async().await {
                    let result = match event {
                        ResourceEvent::Site(event) => site_service.handle(event).await,
                        ResourceEvent::Glidein(event) => glidein_service.handle(event).await,
                    };
                    if let Err(e) = result {
                        tracing::error!(resource = %key.1, "event handling failed: {e:#}");
                    }
                }
            }
            .instrument(tracing::debug_span!("resource_events", resource = %key.1)),
        );
        tx
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use domain_glidein::exception::GlideinResult;
    use domain_glidein::model::vo::msg::{
        GlideinEvent, GlideinEventCode, SiteEvent, SiteEventCode,
    };

    use super::*;

    struct SlowSiteService {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl SiteStateService for SlowSiteService {
        async fn handle(&self, event: SiteEvent) -> GlideinResult<()> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.log.lock().unwrap().push(format!("site:{:?}", event.code));
            Ok(())
        }
    }

    struct FastGlideinService {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl GlideinStateService for FastGlideinService {
        async fn handle(&self, event: GlideinEvent) -> GlideinResult<()> {
            self.log.lock().unwrap().push(format!("glidein:{:?}", event.code));
            Ok(())
        }
    }

    fn runner_with_log() -> (EventQueue, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (queue, rx) = EventQueue::new();
        let runner = EventQueueRunner::new(
            rx,
            Arc::new(SlowSiteService { log: log.clone() }),
            Arc::new(FastGlideinService { log: log.clone() }),
        );
        tokio::spawn(async move { runner.run().await });
        (queue, log)
    }

    #[tokio::test]
    async fn events_for_one_resource_stay_in_order() {
        let (queue, log) = runner_with_log();
        let site_id = Uuid::new_v4();
        for code in [
            SiteEventCode::Submit,
            SiteEventCode::InstallSuccess,
            SiteEventCode::StageSuccess,
        ] {
            queue.add(ResourceEvent::Site(SiteEvent::new(code, Utc::now(), site_id)));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["site:Submit", "site:InstallSuccess", "site:StageSuccess"]
        );
    }

    #[tokio::test]
    async fn resources_are_handled_in_parallel() {
        let (queue, log) = runner_with_log();
        queue.add(ResourceEvent::Site(SiteEvent::new(
            SiteEventCode::Submit,
            Utc::now(),
            Uuid::new_v4(),
        )));
        queue.add(ResourceEvent::Glidein(GlideinEvent::new(
            GlideinEventCode::Queued,
            Utc::now(),
            Uuid::new_v4(),
        )));

        // The glidein event overtakes the slow site handler because the two
        // resources run on independent lanes.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["glidein:Queued", "site:Submit"]
        );
    }
}
