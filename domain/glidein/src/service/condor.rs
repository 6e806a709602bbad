use std::sync::Arc;

use crate::exception::GlideinResult;
use crate::model::vo::job::{JobHandle, JobId, JobSpec};
use crate::service::listener::JobEventListener;

/// Interface to the local Condor scheduler: submits and cancels jobs through
/// the external binaries and tails the user log of every submitted job.
#[async_trait::async_trait]
pub trait CondorService: Send + Sync {
    /// Prepare the job directory, run the submit binary and start one log
    /// watcher delivering events to `listeners`. Fails synchronously; no
    /// directory or watcher is left behind on failure.
    async fn submit_job(
        &self,
        spec: JobSpec,
        listeners: Vec<Arc<dyn JobEventListener>>,
    ) -> GlideinResult<JobHandle>;

    /// Run the cancel binary for the given job.
    async fn cancel_job(&self, job_id: &JobId) -> GlideinResult<()>;
}
