use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ListFilter;
use crate::model::entity::site::{Site, SiteState};

#[async_trait::async_trait]
pub trait SiteRepo: Send + Sync {
    /// Persist a new site and return it with its stored timestamps.
    async fn create(&self, site: Site) -> anyhow::Result<Site>;
    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Site>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn update_state(
        &self,
        id: Uuid,
        state: SiteState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn increment_submits(&self, id: Uuid) -> anyhow::Result<()>;
    async fn increment_resubmits(&self, id: Uuid) -> anyhow::Result<()>;
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Site>>;
    /// Whether the site still owns glideins that have not reached a terminal
    /// state.
    async fn has_active_glideins(&self, site_id: Uuid) -> anyhow::Result<bool>;
    async fn glidein_ids(&self, site_id: Uuid) -> anyhow::Result<Vec<Uuid>>;
}
