use std::sync::Arc;

use domain_glidein::model::vo::event::JobEvent;
use domain_glidein::model::vo::job::JobHandle;
use domain_glidein::model::vo::msg::{EventProps, GlideinEvent, GlideinEventCode, ResourceEvent};
use domain_glidein::service::{CondorService, JobEventListener, ListenerFlow};
use uuid::Uuid;

use super::{check_status_output, cleanup_job_dir, dispatch, ListenerCore, OperationListener, TerminationCheck};
use crate::event_queue::EventQueue;

/// Watches a glidein's scheduler job and reports its remote progress.
pub struct GlideinJobListener {
    glidein_id: Uuid,
    core: ListenerCore,
}

impl GlideinJobListener {
    pub fn new(glidein_id: Uuid, queue: EventQueue, condor: Arc<dyn CondorService>) -> Self {
        Self {
            glidein_id,
            core: ListenerCore::new(queue, condor),
        }
    }

    fn emit(&self, code: GlideinEventCode, event: &JobEvent, props: EventProps) {
        self.core.emit(ResourceEvent::Glidein(
            GlideinEvent::new(code, event.time, self.glidein_id).with_props(props),
        ));
    }
}

#[async_trait::async_trait]
impl OperationListener for GlideinJobListener {
    fn core(&self) -> &ListenerCore {
        &self.core
    }

    async fn queued(&self, _job: &JobHandle, event: &JobEvent) {
        self.emit(GlideinEventCode::Queued, event, EventProps::default());
    }

    async fn running(&self, _job: &JobHandle, event: &JobEvent) {
        self.emit(GlideinEventCode::Running, event, EventProps::default());
    }

    async fn terminated(&self, job: &JobHandle, event: &JobEvent) {
        match check_status_output(job, "Glidein").await {
            TerminationCheck::Success => {
                cleanup_job_dir(job).await;
                self.emit(GlideinEventCode::JobSuccess, event, EventProps::default());
            }
            TerminationCheck::Failure { message, detail } => {
                self.emit(
                    GlideinEventCode::JobFailure,
                    event,
                    EventProps::failure(message, detail),
                );
            }
        }
    }

    async fn failed(&self, _job: &JobHandle, event: &JobEvent) {
        self.emit(
            GlideinEventCode::JobFailure,
            event,
            EventProps::failure(event.message.clone(), Some(event.details.clone())),
        );
    }

    async fn aborted(&self, _job: &JobHandle, event: &JobEvent) {
        self.emit(GlideinEventCode::JobAborted, event, EventProps::default());
    }
}

#[async_trait::async_trait]
impl JobEventListener for GlideinJobListener {
    async fn handle_event(&self, job: &JobHandle, event: &JobEvent) -> ListenerFlow {
        dispatch(self, job, event).await
    }
}
