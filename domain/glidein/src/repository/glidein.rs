use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ListFilter;
use crate::model::entity::glidein::{Glidein, GlideinState};

#[async_trait::async_trait]
pub trait GlideinRepo: Send + Sync {
    /// Persist a new glidein and return it with its stored timestamps.
    async fn create(&self, glidein: Glidein) -> anyhow::Result<Glidein>;
    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Glidein>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn update_state(
        &self,
        id: Uuid,
        state: GlideinState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn increment_submits(&self, id: Uuid) -> anyhow::Result<()>;
    async fn increment_resubmits(&self, id: Uuid) -> anyhow::Result<()>;
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Glidein>>;
}
