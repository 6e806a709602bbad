use std::sync::Arc;

use domain_glidein::model::vo::event::JobEvent;
use domain_glidein::model::vo::job::JobHandle;
use domain_glidein::model::vo::msg::{EventProps, ResourceEvent, SiteEvent, SiteEventCode};
use domain_glidein::service::{CondorService, JobEventListener, ListenerFlow};
use uuid::Uuid;

use super::{check_status_output, cleanup_job_dir, dispatch, ListenerCore, OperationListener, TerminationCheck};
use crate::event_queue::EventQueue;

/// Watches a site's uninstall job.
pub struct UninstallSiteListener {
    site_id: Uuid,
    core: ListenerCore,
}

impl UninstallSiteListener {
    pub fn new(site_id: Uuid, queue: EventQueue, condor: Arc<dyn CondorService>) -> Self {
        Self {
            site_id,
            core: ListenerCore::new(queue, condor),
        }
    }

    fn emit(&self, code: SiteEventCode, event: &JobEvent, props: EventProps) {
        self.core.emit(ResourceEvent::Site(
            SiteEvent::new(code, event.time, self.site_id).with_props(props),
        ));
    }
}

#[async_trait::async_trait]
impl OperationListener for UninstallSiteListener {
    fn core(&self) -> &ListenerCore {
        &self.core
    }

    async fn terminated(&self, job: &JobHandle, event: &JobEvent) {
        match check_status_output(job, "Uninstall").await {
            TerminationCheck::Success => {
                cleanup_job_dir(job).await;
                self.emit(SiteEventCode::UninstallSuccess, event, EventProps::default());
            }
            TerminationCheck::Failure { message, detail } => {
                self.emit(
                    SiteEventCode::UninstallFailed,
                    event,
                    EventProps::failure(message, detail),
                );
            }
        }
    }

    async fn failed(&self, _job: &JobHandle, event: &JobEvent) {
        self.emit(
            SiteEventCode::UninstallFailed,
            event,
            EventProps::failure(event.message.clone(), Some(event.details.clone())),
        );
    }

    async fn aborted(&self, job: &JobHandle, event: &JobEvent) {
        self.failed(job, event).await;
    }
}

#[async_trait::async_trait]
impl JobEventListener for UninstallSiteListener {
    async fn handle_event(&self, job: &JobHandle, event: &JobEvent) -> ListenerFlow {
        dispatch(self, job, event).await
    }
}
