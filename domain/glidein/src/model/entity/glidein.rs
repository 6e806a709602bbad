use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transient compute-capacity job submitted to a remote scheduler on behalf
/// of a user. Once running it joins the user's Condor pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Glidein {
    pub id: Uuid,
    pub site_id: Uuid,
    pub state: GlideinState,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub owner: String,
    /// Central manager the glidein reports back to.
    pub condor_host: String,
    pub host_count: u32,
    pub process_count: u32,
    /// Maximum runtime in minutes.
    pub wall_time: u32,
    /// Idle minutes after which the glidein exits on its own.
    pub idle_time: Option<u32>,
    pub num_cpus: Option<u32>,
    pub condor_debug: Option<String>,
    /// Inline condor configuration overriding the service-wide default.
    pub condor_config: Option<String>,
    pub resubmit: bool,
    pub submits: u32,
    pub resubmits: u32,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GlideinState {
    #[default]
    New,
    /// Waiting for the site to become ready, or to be resubmitted.
    Waiting,
    /// Job submitted to the local scheduler.
    Submitted,
    /// Job queued remotely.
    Queued,
    /// Job running remotely.
    Running,
    /// Job is being cancelled.
    Removing,
    Finished,
    Failed,
    Deleted,
}

impl GlideinState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GlideinState::Finished | GlideinState::Failed | GlideinState::Deleted
        )
    }

    /// True while a scheduler job may exist for this glidein.
    pub fn has_job(&self) -> bool {
        matches!(
            self,
            GlideinState::Submitted | GlideinState::Queued | GlideinState::Running
        )
    }
}
