use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain-level lifecycle event, addressed to exactly one resource and
/// consumed exactly once by that resource's state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResourceEvent {
    Site(SiteEvent),
    Glidein(GlideinEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Site,
    Glidein,
}

impl ResourceEvent {
    /// Dispatch key: events sharing a key are applied strictly in order.
    pub fn lane_key(&self) -> (ResourceKind, Uuid) {
        match self {
            ResourceEvent::Site(e) => (ResourceKind::Site, e.site_id),
            ResourceEvent::Glidein(e) => (ResourceKind::Glidein, e.glidein_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteEvent {
    pub site_id: Uuid,
    pub code: SiteEventCode,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub props: EventProps,
}

impl SiteEvent {
    pub fn new(code: SiteEventCode, time: DateTime<Utc>, site_id: Uuid) -> Self {
        Self {
            site_id,
            code,
            time,
            props: EventProps::default(),
        }
    }

    pub fn with_props(mut self, props: EventProps) -> Self {
        self.props = props;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlideinEvent {
    pub glidein_id: Uuid,
    pub code: GlideinEventCode,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub props: EventProps,
}

impl GlideinEvent {
    pub fn new(code: GlideinEventCode, time: DateTime<Utc>, glidein_id: Uuid) -> Self {
        Self {
            glidein_id,
            code,
            time,
            props: EventProps::default(),
        }
    }

    pub fn with_props(mut self, props: EventProps) -> Self {
        self.props = props;
        self
    }
}

/// Human-readable payload carried by failure events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventProps {
    pub message: Option<String>,
    pub detail: Option<String>,
}

impl EventProps {
    pub fn failure(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            message: Some(message.into()),
            detail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteEventCode {
    /// User requested submit.
    Submit,
    /// Worker software installed successfully.
    InstallSuccess,
    InstallFailed,
    /// Site data staged successfully.
    StageSuccess,
    StageFailed,
    /// User requested remove.
    Remove,
    UninstallSuccess,
    UninstallFailed,
    /// One of the site's glideins was deleted.
    GlideinDeleted,
    /// User requested immediate delete.
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlideinEventCode {
    /// Submit requested.
    Submit,
    /// Owning site entered the ready state.
    SiteReady,
    /// Owning site failed.
    SiteFailed,
    /// Glidein job queued remotely.
    Queued,
    /// Glidein job running remotely.
    Running,
    /// Glidein job exited successfully.
    JobSuccess,
    JobFailure,
    JobAborted,
    /// Remove requested.
    Remove,
    /// Delete requested.
    Delete,
}
