mod glidein;
mod site;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[rustfmt::skip]
pub use {
    glidein::GlideinRepo,
    site::SiteRepo,
};

/// Criteria for listing resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilter {
    /// Restrict to resources owned by this subject.
    pub owner: Option<String>,
    /// Restrict glideins to one site.
    pub site_id: Option<Uuid>,
}
