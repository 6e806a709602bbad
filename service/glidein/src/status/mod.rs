mod glidein;
mod site;

use std::path::Path;

use domain_glidein::exception::GlideinResult;
use domain_glidein::model::vo::job::{self, JobId};

#[rustfmt::skip]
pub use {
    glidein::GlideinStateServiceImpl,
    site::SiteStateServiceImpl,
};

/// Recover the scheduler id of a previously submitted job from its `jobid`
/// sidecar file.
pub(crate) async fn read_job_id(job_dir: &Path) -> GlideinResult<JobId> {
    let text = tokio::fs::read_to_string(job::job_id_file(job_dir)).await?;
    text.trim().parse()
}

/// Best-effort removal of a resource's working directory after deletion.
pub(crate) async fn remove_working_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(dir = %dir.display(), "unable to remove working directory: {e}");
        }
    }
}
