mod glidein_job;
mod install_site;
mod stage_site;
mod uninstall_site;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use domain_glidein::exception::GlideinResult;
use domain_glidein::model::vo::event::{JobEvent, LogEventCode};
use domain_glidein::model::vo::job::JobHandle;
use domain_glidein::model::vo::msg::ResourceEvent;
use domain_glidein::service::{CondorService, ListenerFlow};

use crate::event_queue::EventQueue;

#[rustfmt::skip]
pub use {
    glidein_job::GlideinJobListener,
    install_site::InstallSiteListener,
    stage_site::StageSiteListener,
    uninstall_site::UninstallSiteListener,
};

/// Plumbing shared by the per-operation listeners.
pub(crate) struct ListenerCore {
    queue: EventQueue,
    condor: Arc<dyn CondorService>,
    aborted: AtomicBool,
}

impl ListenerCore {
    pub(crate) fn new(queue: EventQueue, condor: Arc<dyn CondorService>) -> Self {
        Self {
            queue,
            condor,
            aborted: AtomicBool::new(false),
        }
    }

    pub(crate) fn emit(&self, event: ResourceEvent) {
        self.queue.add(event);
    }

    /// Cancel a job that the scheduler put on hold. At most one attempt per
    /// job: the cancellation itself produces an abort event, and we may be
    /// replaying the log of a job that was already aborted.
    async fn cancel_held(&self, event: &JobEvent) -> GlideinResult<()> {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.condor.cancel_job(&event.job_id).await
    }
}

/// The capability set each operation listener implements. Dispatch from the
/// raw event codes is shared; only the reactions differ per operation.
#[async_trait::async_trait]
pub(crate) trait OperationListener: Send + Sync {
    fn core(&self) -> &ListenerCore;

    /// The job was accepted by the remote scheduler.
    async fn queued(&self, _job: &JobHandle, _event: &JobEvent) {}

    /// The job started executing remotely.
    async fn running(&self, _job: &JobHandle, _event: &JobEvent) {}

    /// The scheduler reported normal termination. Success still has to be
    /// verified against the job's own output.
    async fn terminated(&self, job: &JobHandle, event: &JobEvent);

    async fn failed(&self, job: &JobHandle, event: &JobEvent);

    async fn aborted(&self, job: &JobHandle, event: &JobEvent);
}

/// Route one raw log event to the listener's capability methods.
pub(crate) async fn dispatch<L>(listener: &L, job: &JobHandle, event: &JobEvent) -> ListenerFlow
where
    L: OperationListener + ?Sized,
{
    match event.code {
        LogEventCode::GridSubmit | LogEventCode::GlobusSubmit => {
            listener.queued(job, event).await;
            ListenerFlow::Continue
        }
        LogEventCode::Execute => {
            listener.running(job, event).await;
            ListenerFlow::Continue
        }
        LogEventCode::JobTerminated => {
            listener.terminated(job, event).await;
            ListenerFlow::Stop
        }
        LogEventCode::Exception | LogEventCode::ShadowException | LogEventCode::RemoteError => {
            listener.failed(job, event).await;
            ListenerFlow::Continue
        }
        LogEventCode::GlobusSubmitFailed
        | LogEventCode::GlobusResourceDown
        | LogEventCode::GridResourceDown
        | LogEventCode::JobHeld => {
            // A held job never progresses; cancelling it makes it come back
            // as an abort event.
            match listener.core().cancel_held(event).await {
                Ok(()) => listener.failed(job, event).await,
                Err(e) => {
                    let event = JobEvent {
                        message: format!("Unable to cancel held job: {e}"),
                        ..event.clone()
                    };
                    listener.failed(job, &event).await;
                }
            }
            ListenerFlow::Continue
        }
        LogEventCode::JobAborted => {
            listener.aborted(job, event).await;
            ListenerFlow::Stop
        }
        _ => ListenerFlow::Continue,
    }
}

/// Outcome of inspecting a terminated job's own output.
pub(crate) enum TerminationCheck {
    Success,
    Failure {
        message: String,
        detail: Option<String>,
    },
}

/// Verify a terminated job against its conventional status output file: the
/// remote wrapper writes its errors there because some job-manager backends
/// report scheduler success even when the application failed.
pub(crate) async fn check_status_output(job: &JobHandle, operation: &str) -> TerminationCheck {
    let errors = match tokio::fs::read_to_string(job.status_file()).await {
        Ok(errors) => errors,
        Err(e) => {
            return TerminationCheck::Failure {
                message: format!("Unable to read {operation} job output file(s)"),
                detail: Some(e.to_string()),
            }
        }
    };
    if errors.is_empty() {
        return TerminationCheck::Success;
    }
    let stdout = tokio::fs::read_to_string(job.output_file()).await.unwrap_or_default();
    let stderr = tokio::fs::read_to_string(job.error_file()).await.unwrap_or_default();
    TerminationCheck::Failure {
        message: format!("{operation} job failed"),
        detail: Some(format!("ERRORS:\n{errors}\n\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}")),
    }
}

/// Verify a terminated staging job: success means it wrote nothing to
/// stderr. A missing error file means the job never really ran.
pub(crate) async fn check_stderr_output(job: &JobHandle) -> TerminationCheck {
    match tokio::fs::read_to_string(job.error_file()).await {
        Ok(stderr) if stderr.is_empty() => TerminationCheck::Success,
        Ok(stderr) => TerminationCheck::Failure {
            message: "Staging job failed".to_string(),
            detail: Some(stderr),
        },
        Err(_) => TerminationCheck::Failure {
            message: "Staging job produced no error file".to_string(),
            detail: None,
        },
    }
}

/// Remove a finished job's working directory.
pub(crate) async fn cleanup_job_dir(job: &JobHandle) {
    if let Err(e) = tokio::fs::remove_dir_all(&job.job_dir).await {
        tracing::warn!(job_id = %job.job_id, "unable to remove job directory: {e}");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain_glidein::mock::MockCondorService;
    use domain_glidein::model::vo::job::JobId;
    use domain_glidein::model::vo::msg::{GlideinEventCode, ResourceEvent};
    use domain_glidein::service::JobEventListener;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    fn job_event(code: LogEventCode) -> JobEvent {
        JobEvent {
            code,
            job_id: JobId { cluster: 32, proc: 0 },
            time: Utc::now(),
            message: code.description().to_string(),
            details: String::new(),
        }
    }

    fn handle(dir: &TempDir) -> JobHandle {
        JobHandle::new(JobId { cluster: 32, proc: 0 }, dir.path())
    }

    #[tokio::test]
    async fn held_job_is_cancelled_exactly_once() {
        let dir = TempDir::new().unwrap();
        let (queue, rx) = EventQueue::new();
        let mut condor = MockCondorService::new();
        condor
            .expect_cancel_job()
            .times(1)
            .withf(|id| id.to_string() == "32.0")
            .returning(|_| Ok(()));

        let listener = GlideinJobListener::new(Uuid::new_v4(), queue, Arc::new(condor));
        let job = handle(&dir);
        let event = job_event(LogEventCode::JobHeld);
        listener.handle_event(&job, &event).await;
        listener.handle_event(&job, &event).await;

        // Both deliveries still report the failure.
        let mut codes = Vec::new();
        while let Ok(ResourceEvent::Glidein(e)) = rx.try_recv() {
            codes.push(e.code);
        }
        assert_eq!(codes, vec![GlideinEventCode::JobFailure, GlideinEventCode::JobFailure]);
    }

    #[tokio::test]
    async fn terminated_with_errors_in_status_file_is_a_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("status"), "tar: unpack failed\n").unwrap();
        std::fs::write(dir.path().join("output"), "installing\n").unwrap();
        std::fs::write(dir.path().join("error"), "").unwrap();

        let (queue, rx) = EventQueue::new();
        let listener =
            GlideinJobListener::new(Uuid::new_v4(), queue, Arc::new(MockCondorService::new()));
        let flow = listener
            .handle_event(&handle(&dir), &job_event(LogEventCode::JobTerminated))
            .await;

        assert_eq!(flow, ListenerFlow::Stop);
        let Ok(ResourceEvent::Glidein(event)) = rx.try_recv() else {
            panic!("expected a glidein event");
        };
        assert_eq!(event.code, GlideinEventCode::JobFailure);
        let detail = event.props.detail.unwrap();
        assert!(detail.contains("ERRORS:\ntar: unpack failed"));
        assert!(detail.contains("STDOUT:\ninstalling"));
    }

    #[tokio::test]
    async fn terminated_with_empty_status_file_succeeds_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let job_dir = dir.path().join("job");
        std::fs::create_dir(&job_dir).unwrap();
        std::fs::write(job_dir.join("status"), "").unwrap();

        let (queue, rx) = EventQueue::new();
        let listener =
            GlideinJobListener::new(Uuid::new_v4(), queue, Arc::new(MockCondorService::new()));
        let job = JobHandle::new(JobId { cluster: 32, proc: 0 }, &job_dir);
        listener.handle_event(&job, &job_event(LogEventCode::JobTerminated)).await;

        let Ok(ResourceEvent::Glidein(event)) = rx.try_recv() else {
            panic!("expected a glidein event");
        };
        assert_eq!(event.code, GlideinEventCode::JobSuccess);
        assert!(!job_dir.exists());
    }
}
