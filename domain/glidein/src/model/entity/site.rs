use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::vo::job::CondorGridType;

/// An execution environment installed on a remote resource. Glideins can only
/// run at a site once it has been staged and reaches `Ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub state: SiteState,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Authenticated subject of the user that created the site.
    pub owner: String,
    pub install_path: String,
    pub local_path: String,
    pub condor_version: Option<String>,
    pub condor_package: Option<String>,
    pub environment: BTreeMap<String, String>,
    /// Job manager used for the setup/teardown jobs.
    pub staging_service: ExecutionService,
    /// Job manager used for the glidein jobs themselves.
    pub glidein_service: ExecutionService,
    pub resubmit: bool,
    pub submits: u32,
    pub resubmits: u32,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SiteState {
    /// Created, nothing submitted yet.
    #[default]
    New,
    /// Waiting to be resubmitted.
    Waiting,
    /// Setup jobs running remotely.
    Staging,
    /// Installed and able to host glideins.
    Ready,
    /// Waiting for owned glideins to drain before uninstalling.
    Exiting,
    /// Uninstall job running.
    Removing,
    Failed,
    Deleted,
}

impl SiteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SiteState::Failed | SiteState::Deleted)
    }
}

/// A remote job-manager endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionService {
    pub service_type: CondorGridType,
    pub service_contact: String,
    pub project: Option<String>,
    pub queue: Option<String>,
}

impl ExecutionService {
    /// The scheduler reports empty strings for unset fields; treat them as
    /// absent so they never reach a submit description.
    pub fn normalize(&mut self) {
        if self.project.as_deref() == Some("") {
            self.project = None;
        }
        if self.queue.as_deref() == Some("") {
            self.queue = None;
        }
    }
}
