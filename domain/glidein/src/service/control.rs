use uuid::Uuid;

use crate::exception::GlideinResult;
use crate::model::entity::{Glidein, Site};
use crate::model::vo::request::{CreateGlideinRequest, CreateSiteRequest};
use crate::repository::ListFilter;

/// Request-level operations on sites: create records, trigger submission and
/// removal, and answer queries. State transitions themselves happen in the
/// site state machine.
#[async_trait::async_trait]
pub trait SiteControlService: Send + Sync {
    async fn create(&self, request: CreateSiteRequest) -> GlideinResult<Site>;
    /// Store the delegated credential and queue a submit event.
    async fn submit(&self, id: Uuid, credential: &str) -> GlideinResult<()>;
    /// Queue a remove event; `force` skips the uninstall job. A credential is
    /// required unless forcing, because removal submits an uninstall job.
    async fn remove(&self, id: Uuid, force: bool, credential: Option<&str>) -> GlideinResult<()>;
    async fn get(&self, id: Uuid) -> GlideinResult<Site>;
    async fn list(&self, filter: ListFilter) -> GlideinResult<Vec<Site>>;
}

#[async_trait::async_trait]
pub trait GlideinControlService: Send + Sync {
    async fn create(&self, request: CreateGlideinRequest) -> GlideinResult<Glidein>;
    async fn submit(&self, id: Uuid, credential: &str) -> GlideinResult<()>;
    async fn remove(&self, id: Uuid, force: bool) -> GlideinResult<()>;
    async fn get(&self, id: Uuid) -> GlideinResult<Glidein>;
    async fn list(&self, filter: ListFilter) -> GlideinResult<Vec<Glidein>>;
}
