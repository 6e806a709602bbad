use std::sync::Arc;

use chrono::Utc;
use domain_glidein::config::ServiceConfiguration;
use domain_glidein::exception::{GlideinException, GlideinResult};
use domain_glidein::model::entity::glidein::{Glidein, GlideinState};
use domain_glidein::model::entity::site::{Site, SiteState};
use domain_glidein::model::vo::msg::{
    GlideinEvent, GlideinEventCode, ResourceEvent, SiteEvent, SiteEventCode,
};
use domain_glidein::model::vo::request::{CreateGlideinRequest, CreateSiteRequest};
use domain_glidein::repository::{GlideinRepo, ListFilter, SiteRepo};
use domain_glidein::service::{GlideinControlService, SiteControlService};
use uuid::Uuid;

use crate::credential;
use crate::event_queue::EventQueue;

/// Create/submit/remove entry points for sites. These only stage credentials
/// and enqueue events; the state machines do the rest.
pub struct SiteControlServiceImpl {
    site_repo: Arc<dyn SiteRepo>,
    queue: EventQueue,
    config: Arc<ServiceConfiguration>,
}

impl SiteControlServiceImpl {
    pub fn new(
        site_repo: Arc<dyn SiteRepo>,
        queue: EventQueue,
        config: Arc<ServiceConfiguration>,
    ) -> Self {
        Self {
            site_repo,
            queue,
            config,
        }
    }
}

#[async_trait::async_trait]
impl SiteControlService for SiteControlServiceImpl {
    async fn create(&self, request: CreateSiteRequest) -> GlideinResult<Site> {
        tracing::info!("creating site '{}'", request.name);

        let mut staging_service = request.staging_service;
        staging_service.normalize();
        let mut glidein_service = request.glidein_service;
        glidein_service.normalize();

        // Empty strings mean unset; when neither a version nor a package is
        // given, install a known-good default version.
        let condor_version = request.condor_version.filter(|v| !v.is_empty());
        let condor_package = request.condor_package.filter(|p| !p.is_empty());
        let condor_version = match (&condor_version, &condor_package) {
            (None, None) => Some("7.0.0".to_string()),
            _ => condor_version,
        };

        let now = Utc::now();
        let site = Site {
            id: Uuid::new_v4(),
            name: request.name,
            state: SiteState::New,
            short_message: "Created".to_string(),
            long_message: None,
            created: now,
            last_update: now,
            owner: request.owner,
            install_path: request.install_path,
            local_path: request.local_path,
            condor_version,
            condor_package,
            environment: request.environment,
            staging_service,
            glidein_service,
            resubmit: request.resubmit,
            submits: 0,
            resubmits: 0,
            until: request.until,
        };
        self.site_repo.create(site).await.map_err(GlideinException::database)
    }

    async fn submit(&self, id: Uuid, credential: &str) -> GlideinResult<()> {
        tracing::info!(site_id = %id, "queueing site submit");
        let site = self.site_repo.get_by_id(id).await.map_err(GlideinException::database)?;
        // Stored now because the event that needs it may run much later.
        credential::store(&self.config.site_working_dir(site.id), credential).await?;
        self.queue
            .add(ResourceEvent::Site(SiteEvent::new(SiteEventCode::Submit, Utc::now(), site.id)));
        Ok(())
    }

    async fn remove(&self, id: Uuid, force: bool, credential: Option<&str>) -> GlideinResult<()> {
        tracing::info!(site_id = %id, force, "queueing site remove");
        let site = self.site_repo.get_by_id(id).await.map_err(GlideinException::database)?;
        if force {
            if self
                .site_repo
                .has_active_glideins(site.id)
                .await
                .map_err(GlideinException::database)?
            {
                return Err(GlideinException::PolicyDenied {
                    reason: "site still owns active glideins".to_string(),
                });
            }
            self.queue.add(ResourceEvent::Site(SiteEvent::new(
                SiteEventCode::Delete,
                Utc::now(),
                site.id,
            )));
        } else {
            let credential = credential.ok_or_else(|| GlideinException::PolicyDenied {
                reason: "site removal requires a delegated credential".to_string(),
            })?;
            credential::store(&self.config.site_working_dir(site.id), credential).await?;
            self.queue.add(ResourceEvent::Site(SiteEvent::new(
                SiteEventCode::Remove,
                Utc::now(),
                site.id,
            )));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GlideinResult<Site> {
        self.site_repo.get_by_id(id).await.map_err(GlideinException::database)
    }

    async fn list(&self, filter: ListFilter) -> GlideinResult<Vec<Site>> {
        self.site_repo.list(&filter).await.map_err(GlideinException::database)
    }
}

/// Create/submit/remove entry points for glideins.
pub struct GlideinControlServiceImpl {
    glidein_repo: Arc<dyn GlideinRepo>,
    site_repo: Arc<dyn SiteRepo>,
    queue: EventQueue,
    config: Arc<ServiceConfiguration>,
}

impl GlideinControlServiceImpl {
    pub fn new(
        glidein_repo: Arc<dyn GlideinRepo>,
        site_repo: Arc<dyn SiteRepo>,
        queue: EventQueue,
        config: Arc<ServiceConfiguration>,
    ) -> Self {
        Self {
            glidein_repo,
            site_repo,
            queue,
            config,
        }
    }
}

#[async_trait::async_trait]
impl GlideinControlService for GlideinControlServiceImpl {
    async fn create(&self, request: CreateGlideinRequest) -> GlideinResult<Glidein> {
        tracing::info!(site_id = %request.site_id, "creating glidein");
        // The owning site must exist; its readiness is checked at submit
        // time by the state machine.
        self.site_repo
            .get_by_id(request.site_id)
            .await
            .map_err(GlideinException::database)?;

        let now = Utc::now();
        let glidein = Glidein {
            id: Uuid::new_v4(),
            site_id: request.site_id,
            state: GlideinState::New,
            short_message: "Created".to_string(),
            long_message: None,
            created: now,
            last_update: now,
            owner: request.owner,
            condor_host: request.condor_host,
            host_count: request.host_count,
            process_count: request.process_count,
            wall_time: request.wall_time,
            idle_time: request.idle_time,
            num_cpus: request.num_cpus,
            condor_debug: request.condor_debug,
            condor_config: request.condor_config,
            resubmit: request.resubmit,
            submits: 0,
            resubmits: 0,
            until: request.until,
        };
        self.glidein_repo.create(glidein).await.map_err(GlideinException::database)
    }

    async fn submit(&self, id: Uuid, credential: &str) -> GlideinResult<()> {
        tracing::info!(glidein_id = %id, "queueing glidein submit");
        let glidein =
            self.glidein_repo.get_by_id(id).await.map_err(GlideinException::database)?;
        credential::store(&self.config.glidein_working_dir(glidein.id), credential).await?;
        self.queue.add(ResourceEvent::Glidein(GlideinEvent::new(
            GlideinEventCode::Submit,
            Utc::now(),
            glidein.id,
        )));
        Ok(())
    }

    async fn remove(&self, id: Uuid, force: bool) -> GlideinResult<()> {
        tracing::info!(glidein_id = %id, force, "queueing glidein remove");
        let glidein =
            self.glidein_repo.get_by_id(id).await.map_err(GlideinException::database)?;
        let code = if force {
            GlideinEventCode::Delete
        } else {
            GlideinEventCode::Remove
        };
        self.queue
            .add(ResourceEvent::Glidein(GlideinEvent::new(code, Utc::now(), glidein.id)));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GlideinResult<Glidein> {
        self.glidein_repo.get_by_id(id).await.map_err(GlideinException::database)
    }

    async fn list(&self, filter: ListFilter) -> GlideinResult<Vec<Glidein>> {
        self.glidein_repo.list(&filter).await.map_err(GlideinException::database)
    }
}
