use crate::exception::GlideinResult;
use crate::model::vo::msg::{GlideinEvent, SiteEvent};

/// State machine of one site resource. `handle` is the single mutation entry
/// point; the event queue guarantees per-site serialization.
#[async_trait::async_trait]
pub trait SiteStateService: Send + Sync {
    async fn handle(&self, event: SiteEvent) -> GlideinResult<()>;
}

/// State machine of one glidein resource.
#[async_trait::async_trait]
pub trait GlideinStateService: Send + Sync {
    async fn handle(&self, event: GlideinEvent) -> GlideinResult<()>;
}
