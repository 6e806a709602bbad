use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::{
    exception::GlideinResult,
    model::{
        entity::{
            glidein::{Glidein, GlideinState},
            site::{Site, SiteState},
        },
        vo::job::{JobHandle, JobId, JobSpec},
    },
    repository::{GlideinRepo, ListFilter, SiteRepo},
    service::{CondorService, JobEventListener},
};

mock! {
    pub SiteRepo {}
    #[async_trait]
    impl SiteRepo for SiteRepo {
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
        async fn has_active_glideins(&self, site_id: Uuid) -> anyhow::Result<bool>;
        async fn glidein_ids(&self, site_id: Uuid) -> anyhow::Result<Vec<Uuid>>;
    }
}

mock! {
    pub GlideinRepo {}
    #[async_trait]
    impl GlideinRepo for GlideinRepo {
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
}

mock! {
    pub CondorService {}
    #[async_trait]
    impl CondorService for CondorService {
        async fn submit_job(
            &self,
            spec: JobSpec,
            listeners: Vec<Arc<dyn JobEventListener>>,
        ) -> GlideinResult<JobHandle>;
        async fn cancel_job(&self, job_id: &JobId) -> GlideinResult<()>;
    }
}
