use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain_glidein::config::ServiceConfiguration;
use domain_glidein::exception::{GlideinException, GlideinResult};
use domain_glidein::model::entity::site::{Site, SiteState};
use domain_glidein::model::vo::job::{JobSpec, STATUS_FILE};
use domain_glidein::model::vo::msg::{
    GlideinEvent, GlideinEventCode, ResourceEvent, SiteEvent, SiteEventCode,
};
use domain_glidein::repository::SiteRepo;
use domain_glidein::service::{CondorService, SiteStateService};

use crate::credential;
use crate::event_queue::EventQueue;
use crate::listener::{InstallSiteListener, StageSiteListener, UninstallSiteListener};
use crate::status::{read_job_id, remove_working_dir};

/// State machine of the site resources. Site setup runs as two scheduler
/// jobs: an install job that puts the worker software in place, then a
/// staging job that transfers the site's data; stage success makes the site
/// ready. Removal drains the site's glideins first, then runs an uninstall
/// job.
pub struct SiteStateServiceImpl {
    site_repo: Arc<dyn SiteRepo>,
    condor: Arc<dyn CondorService>,
    queue: EventQueue,
    config: Arc<ServiceConfiguration>,
}

#[async_trait::async_trait]
impl SiteStateService for SiteStateServiceImpl {
    async fn handle(&self, event: SiteEvent) -> GlideinResult<()> {
        let mut site = match self.site_repo.get_by_id(event.site_id).await {
            Ok(site) => site,
            Err(e) => {
                tracing::warn!(
                    site_id = %event.site_id,
                    "unable to process event {:?}: {e:#}",
                    event.code
                );
                return Ok(());
            }
        };
        // A deleted site may still be referenced by queued events.
        if site.state == SiteState::Deleted {
            tracing::warn!(site_id = %site.id, "unable to process event {:?}: site has been deleted", event.code);
            return Ok(());
        }

        match event.code {
            SiteEventCode::Submit => {
                if matches!(site.state, SiteState::New | SiteState::Waiting) {
                    if let Err(e) = self.start_setup(&mut site, event.time).await {
                        self.fail_quietly(
                            &mut site,
                            "Unable to submit install job",
                            Some(format!("{e:#}")),
                            event.time,
                        )
                        .await;
                    }
                } else {
                    self.wrong_state(&site, SiteState::New, event.code);
                }
            }

            SiteEventCode::InstallSuccess => {
                if site.state == SiteState::Staging {
                    if let Err(e) = self.start_staging(&mut site, event.time).await {
                        self.fail_quietly(
                            &mut site,
                            "Unable to submit staging job",
                            Some(format!("{e:#}")),
                            event.time,
                        )
                        .await;
                    }
                } else {
                    self.wrong_state(&site, SiteState::Staging, event.code);
                }
            }

            SiteEventCode::StageSuccess => {
                if site.state == SiteState::Staging {
                    self.update_state(&mut site, SiteState::Ready, "Site ready", None, event.time)
                        .await?;
                    // Glideins waiting on this site can submit now.
                    if let Err(e) = self.notify_glideins(&site, GlideinEventCode::SiteReady, event.time).await
                    {
                        tracing::warn!(site_id = %site.id, "unable to notify glideins: {e:#}");
                    }
                } else {
                    self.wrong_state(&site, SiteState::Staging, event.code);
                }
            }

            SiteEventCode::InstallFailed | SiteEventCode::StageFailed => {
                if site.state == SiteState::Staging {
                    self.handle_failure(&mut site, &event, SiteEventCode::Submit).await?;
                } else {
                    self.wrong_state(&site, SiteState::Staging, event.code);
                }
            }

            SiteEventCode::Remove => {
                if site.state == SiteState::Removing {
                    tracing::warn!(site_id = %site.id, "already removing site");
                    return Ok(());
                }
                if site.state == SiteState::Staging {
                    // Cancellation failure is tolerated here: the setup job
                    // may have finished while the event was queued.
                    if let Err(e) = self.cancel_setup_job(&site).await {
                        tracing::error!(site_id = %site.id, "unable to cancel setup job: {e:#}");
                    }
                }
                let has_glideins = match self.site_repo.has_active_glideins(site.id).await {
                    Ok(has) => has,
                    Err(e) => {
                        self.fail_quietly(
                            &mut site,
                            "Unable to determine glidein state",
                            Some(format!("{e:#}")),
                            event.time,
                        )
                        .await;
                        return Ok(());
                    }
                };
                if has_glideins {
                    self.update_state(
                        &mut site,
                        SiteState::Exiting,
                        "Waiting for glideins",
                        None,
                        event.time,
                    )
                    .await?;
                    self.notify_glideins(&site, GlideinEventCode::Remove, event.time).await?;
                } else {
                    self.start_uninstall(&mut site, event.time).await;
                }
            }

            SiteEventCode::GlideinDeleted => {
                // Expected to fire often while draining; only the last one
                // matters.
                if site.state == SiteState::Exiting
                    && !self
                        .site_repo
                        .has_active_glideins(site.id)
                        .await
                        .map_err(GlideinException::database)?
                {
                    self.start_uninstall(&mut site, event.time).await;
                }
            }

            SiteEventCode::UninstallSuccess => {
                if site.state == SiteState::Removing {
                    self.update_state(&mut site, SiteState::Deleted, "Site deleted", None, event.time)
                        .await?;
                    self.delete(&site).await?;
                } else {
                    self.wrong_state(&site, SiteState::Removing, event.code);
                }
            }

            SiteEventCode::UninstallFailed => {
                if site.state == SiteState::Removing {
                    self.handle_failure(&mut site, &event, SiteEventCode::Remove).await?;
                } else {
                    self.wrong_state(&site, SiteState::Removing, event.code);
                }
            }

            SiteEventCode::Delete => {
                if self
                    .site_repo
                    .has_active_glideins(site.id)
                    .await
                    .map_err(GlideinException::database)?
                {
                    tracing::warn!(
                        site_id = %site.id,
                        "refusing to delete a site that still owns active glideins"
                    );
                    return Ok(());
                }
                self.update_state(&mut site, SiteState::Deleted, "Site deleted", None, event.time)
                    .await?;
                self.delete(&site).await?;
            }
        }
        Ok(())
    }
}

impl SiteStateServiceImpl {
    pub fn new(
        site_repo: Arc<dyn SiteRepo>,
        condor: Arc<dyn CondorService>,
        queue: EventQueue,
        config: Arc<ServiceConfiguration>,
    ) -> Self {
        Self {
            site_repo,
            condor,
            queue,
            config,
        }
    }

    fn install_dir(&self, site: &Site) -> PathBuf {
        self.config.site_working_dir(site.id).join("install")
    }

    fn stage_dir(&self, site: &Site) -> PathBuf {
        self.config.site_working_dir(site.id).join("stage")
    }

    fn uninstall_dir(&self, site: &Site) -> PathBuf {
        self.config.site_working_dir(site.id).join("uninstall")
    }

    async fn update_state(
        &self,
        site: &mut Site,
        state: SiteState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "changing state to {state:?}: {short_message}");
        site.state = state;
        site.short_message = short_message.to_string();
        site.long_message = long_message;
        site.last_update = time;
        self.site_repo
            .update_state(site.id, state, short_message, site.long_message.clone(), time)
            .await
            .map_err(GlideinException::database)
    }

    async fn fail(
        &self,
        site: &mut Site,
        message: &str,
        detail: Option<String>,
        time: DateTime<Utc>,
    ) -> GlideinResult<()> {
        tracing::error!(site_id = %site.id, "failure: {message}");
        self.update_state(site, SiteState::Failed, message, detail, time).await?;
        // Glideins of a failed site can never run.
        self.notify_glideins(site, GlideinEventCode::SiteFailed, time).await
    }

    async fn fail_quietly(
        &self,
        site: &mut Site,
        message: &str,
        detail: Option<String>,
        time: DateTime<Utc>,
    ) {
        if let Err(e) = self.fail(site, message, detail, time).await {
            tracing::error!(site_id = %site.id, "unable to change state to Failed: {e:#}");
        }
    }

    fn wrong_state(&self, site: &Site, required: SiteState, code: SiteEventCode) {
        tracing::warn!(
            site_id = %site.id,
            "state was not {required:?} when event {code:?} was received"
        );
    }

    async fn start_setup(&self, site: &mut Site, time: DateTime<Utc>) -> GlideinResult<()> {
        self.update_state(site, SiteState::Staging, "Installing worker software", None, time)
            .await?;
        self.submit_install_job(site).await
    }

    async fn start_staging(&self, site: &mut Site, time: DateTime<Utc>) -> GlideinResult<()> {
        self.update_state(site, SiteState::Staging, "Staging site data", None, time).await?;
        self.submit_stage_job(site).await
    }

    async fn start_uninstall(&self, site: &mut Site, time: DateTime<Utc>) {
        if let Err(e) = self
            .update_state(site, SiteState::Removing, "Removing site", None, time)
            .await
        {
            tracing::error!(site_id = %site.id, "unable to change state to Removing: {e:#}");
            return;
        }
        if let Err(e) = self.submit_uninstall_job(site).await {
            self.fail_quietly(site, "Unable to submit uninstall job", Some(format!("{e:#}")), time)
                .await;
        }
    }

    async fn submit_install_job(&self, site: &Site) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "submitting install job");

        let mut arguments = vec![format!("-installPath {}", site.install_path)];
        match &site.condor_package {
            Some(package) => arguments.push(format!("-condorPackage {package}")),
            None => arguments.push(format!(
                "-condorVersion {}",
                site.condor_version.as_deref().unwrap_or("7.0.0")
            )),
        }
        for url in &self.config.staging_urls {
            arguments.push(format!("-url {url}"));
        }

        let service = &site.staging_service;
        let spec = JobSpec::builder()
            .job_dir(self.install_dir(site))
            .grid_type(Some(service.service_type))
            .grid_contact(Some(service.service_contact.clone()))
            .project(service.project.clone())
            .queue(service.queue.clone())
            .executable(self.config.install_executable.clone())
            .local_executable(true)
            .max_wall_time(300)
            .environment(site.environment.clone())
            .arguments(arguments)
            .output_files(vec![STATUS_FILE.to_string()])
            .credential(Some(
                credential::load(&self.config.site_working_dir(site.id)).await?,
            ))
            .build();

        let listener = Arc::new(InstallSiteListener::new(
            site.id,
            self.queue.clone(),
            self.condor.clone(),
        ));
        self.condor.submit_job(spec, vec![listener]).await?;
        self.site_repo
            .increment_submits(site.id)
            .await
            .map_err(GlideinException::database)
    }

    async fn submit_stage_job(&self, site: &Site) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "submitting staging job");

        let service = &site.staging_service;
        let spec = JobSpec::builder()
            .job_dir(self.stage_dir(site))
            .grid_type(Some(service.service_type))
            .grid_contact(Some(service.service_contact.clone()))
            .project(service.project.clone())
            .queue(service.queue.clone())
            .executable(self.config.stage_executable.clone())
            .local_executable(true)
            .max_wall_time(300)
            .environment(site.environment.clone())
            .arguments(vec![
                format!("-installPath {}", site.install_path),
                format!("-localPath {}", site.local_path),
            ])
            .credential(Some(
                credential::load(&self.config.site_working_dir(site.id)).await?,
            ))
            .build();

        let listener = Arc::new(StageSiteListener::new(
            site.id,
            self.queue.clone(),
            self.condor.clone(),
        ));
        self.condor.submit_job(spec, vec![listener]).await?;
        self.site_repo
            .increment_submits(site.id)
            .await
            .map_err(GlideinException::database)
    }

    async fn submit_uninstall_job(&self, site: &Site) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "submitting uninstall job");

        let service = &site.staging_service;
        let spec = JobSpec::builder()
            .job_dir(self.uninstall_dir(site))
            .grid_type(Some(service.service_type))
            .grid_contact(Some(service.service_contact.clone()))
            .project(service.project.clone())
            .queue(service.queue.clone())
            .executable(self.config.uninstall_executable.clone())
            .local_executable(true)
            .max_wall_time(300)
            .environment(site.environment.clone())
            .arguments(vec![format!("-installPath {}", site.install_path)])
            .output_files(vec![STATUS_FILE.to_string()])
            .credential(Some(
                credential::load(&self.config.site_working_dir(site.id)).await?,
            ))
            .build();

        let listener = Arc::new(UninstallSiteListener::new(
            site.id,
            self.queue.clone(),
            self.condor.clone(),
        ));
        self.condor.submit_job(spec, vec![listener]).await?;
        self.site_repo
            .increment_submits(site.id)
            .await
            .map_err(GlideinException::database)
    }

    /// Cancel whichever setup job is currently in flight. The staging phase
    /// runs after the install phase, so look for its job first.
    async fn cancel_setup_job(&self, site: &Site) -> GlideinResult<()> {
        for dir in [self.stage_dir(site), self.install_dir(site)] {
            match read_job_id(&dir).await {
                Ok(job_id) => return self.condor.cancel_job(&job_id).await,
                Err(GlideinException::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        // No job id on record: the setup job was never submitted.
        tracing::warn!(site_id = %site.id, "no setup job to cancel");
        Ok(())
    }

    async fn notify_glideins(
        &self,
        site: &Site,
        code: GlideinEventCode,
        time: DateTime<Utc>,
    ) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "notifying site glideins: {code:?}");
        let ids = self
            .site_repo
            .glidein_ids(site.id)
            .await
            .map_err(GlideinException::database)?;
        for id in ids {
            self.queue.add(ResourceEvent::Glidein(GlideinEvent::new(code, time, id)));
        }
        Ok(())
    }

    /// Apply the resubmit policy to a failed site job. Within policy the site
    /// goes back to Waiting and the operation's trigger event is queued
    /// again; otherwise the site fails with the event's diagnosis.
    async fn handle_failure(
        &self,
        site: &mut Site,
        event: &SiteEvent,
        retrigger: SiteEventCode,
    ) -> GlideinResult<()> {
        if self.should_resubmit(site) {
            self.site_repo
                .increment_resubmits(site.id)
                .await
                .map_err(GlideinException::database)?;
            site.resubmits += 1;
            self.update_state(site, SiteState::Waiting, "Resubmitting", None, event.time).await?;
            self.queue
                .add(ResourceEvent::Site(SiteEvent::new(retrigger, event.time, site.id)));
            Ok(())
        } else {
            let message = event
                .props
                .message
                .clone()
                .unwrap_or_else(|| "Site job failed".to_string());
            self.fail(site, &message, event.props.detail.clone(), event.time).await
        }
    }

    fn should_resubmit(&self, site: &Site) -> bool {
        site.resubmit
            && site.resubmits < self.config.max_resubmits
            && site.until.map_or(true, |until| until > Utc::now())
    }

    async fn delete(&self, site: &Site) -> GlideinResult<()> {
        tracing::info!(site_id = %site.id, "deleting site");
        self.site_repo.delete(site.id).await.map_err(GlideinException::database)?;
        remove_working_dir(&self.config.site_working_dir(site.id)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use domain_glidein::mock::{MockCondorService, MockSiteRepo};
    use domain_glidein::model::entity::site::ExecutionService;
    use domain_glidein::model::vo::job::{CondorGridType, JobHandle, JobId};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    fn test_site(state: SiteState) -> Site {
        let now = Utc::now();
        Site {
            id: Uuid::new_v4(),
            name: "sdsc".to_string(),
            state,
            short_message: "Created".to_string(),
            long_message: None,
            created: now,
            last_update: now,
            owner: "/O=Grid/CN=juve".to_string(),
            install_path: "/home/juve/glidein".to_string(),
            local_path: "/tmp/glidein".to_string(),
            condor_version: Some("7.0.0".to_string()),
            condor_package: None,
            environment: BTreeMap::new(),
            staging_service: ExecutionService {
                service_type: CondorGridType::Gt2,
                service_contact: "sdsc.example.org/jobmanager-fork".to_string(),
                project: None,
                queue: None,
            },
            glidein_service: ExecutionService {
                service_type: CondorGridType::Gt2,
                service_contact: "sdsc.example.org/jobmanager-pbs".to_string(),
                project: None,
                queue: None,
            },
            resubmit: false,
            submits: 0,
            resubmits: 0,
            until: None,
        }
    }

    fn config_with_workdir(dir: &TempDir) -> Arc<ServiceConfiguration> {
        Arc::new(ServiceConfiguration {
            working_directory: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        })
    }

    async fn seed_credential(config: &ServiceConfiguration, site_id: Uuid) {
        let dir = config.site_working_dir(site_id);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("credential"), "proxy").await.unwrap();
    }

    fn submitted_handle() -> JobHandle {
        JobHandle::new(JobId { cluster: 32, proc: 0 }, "/tmp/job")
    }

    #[tokio::test]
    async fn submit_stages_site_and_submits_install_job() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::New);
        seed_credential(&config, site.id).await;

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| {
                *state == SiteState::Staging && short == "Installing worker software"
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_increment_submits().times(1).returning(|_| Ok(()));

        let install = config.install_executable.clone();
        let mut condor = MockCondorService::new();
        condor
            .expect_submit_job()
            .withf(move |spec, listeners| {
                spec.executable == install
                    && spec.local_executable
                    && spec.arguments.contains(&"-condorVersion 7.0.0".to_string())
                    && listeners.len() == 1
            })
            .times(1)
            .returning(|_, _| Ok(submitted_handle()));

        let (queue, _rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(Arc::new(repo), Arc::new(condor), queue, config);
        service
            .handle(SiteEvent::new(SiteEventCode::Submit, Utc::now(), site.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn install_success_submits_stage_job() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Staging);
        seed_credential(&config, site.id).await;

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| {
                *state == SiteState::Staging && short == "Staging site data"
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_increment_submits().times(1).returning(|_| Ok(()));

        let stage = config.stage_executable.clone();
        let mut condor = MockCondorService::new();
        condor
            .expect_submit_job()
            .withf(move |spec, _| {
                spec.executable == stage
                    && spec.arguments.contains(&"-localPath /tmp/glidein".to_string())
            })
            .times(1)
            .returning(|_, _| Ok(submitted_handle()));

        let (queue, _rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(Arc::new(repo), Arc::new(condor), queue, config);
        service
            .handle(SiteEvent::new(SiteEventCode::InstallSuccess, Utc::now(), site.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stage_success_makes_site_ready_and_notifies_glideins() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Staging);
        let glidein_id = Uuid::new_v4();

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| *state == SiteState::Ready && short == "Site ready")
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_glidein_ids().returning(move |_| Ok(vec![glidein_id]));

        let (queue, rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        service
            .handle(SiteEvent::new(SiteEventCode::StageSuccess, Utc::now(), site.id))
            .await
            .unwrap();

        let Ok(ResourceEvent::Glidein(event)) = rx.try_recv() else {
            panic!("expected a glidein notification");
        };
        assert_eq!(event.code, GlideinEventCode::SiteReady);
        assert_eq!(event.glidein_id, glidein_id);
    }

    #[tokio::test]
    async fn setup_failure_within_policy_goes_back_to_waiting() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let mut site = test_site(SiteState::Staging);
        site.resubmit = true;
        site.resubmits = 0;

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_increment_resubmits().times(1).returning(|_| Ok(()));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| *state == SiteState::Waiting && short == "Resubmitting")
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        let (queue, rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        service
            .handle(
                SiteEvent::new(SiteEventCode::InstallFailed, Utc::now(), site.id)
                    .with_props(domain_glidein::model::vo::msg::EventProps::failure(
                        "Install job failed",
                        None,
                    )),
            )
            .await
            .unwrap();

        let Ok(ResourceEvent::Site(event)) = rx.try_recv() else {
            panic!("expected a resubmit trigger");
        };
        assert_eq!(event.code, SiteEventCode::Submit);
    }

    #[tokio::test]
    async fn setup_failure_beyond_policy_fails_the_site() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let mut site = test_site(SiteState::Staging);
        site.resubmit = true;
        site.resubmits = config.max_resubmits;

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| {
                *state == SiteState::Failed && short == "Install job failed"
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_glidein_ids().returning(|_| Ok(Vec::new()));

        let (queue, _rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        service
            .handle(
                SiteEvent::new(SiteEventCode::InstallFailed, Utc::now(), site.id).with_props(
                    domain_glidein::model::vo::msg::EventProps::failure("Install job failed", None),
                ),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_with_live_glideins_drains_them_first() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Ready);
        let glidein_id = Uuid::new_v4();

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_has_active_glideins().returning(|_| Ok(true));
        repo.expect_update_state()
            .withf(|_, state, short, _, _| {
                *state == SiteState::Exiting && short == "Waiting for glideins"
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_glidein_ids().returning(move |_| Ok(vec![glidein_id]));

        let (queue, rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        service
            .handle(SiteEvent::new(SiteEventCode::Remove, Utc::now(), site.id))
            .await
            .unwrap();

        let Ok(ResourceEvent::Glidein(event)) = rx.try_recv() else {
            panic!("expected a glidein remove");
        };
        assert_eq!(event.code, GlideinEventCode::Remove);
    }

    #[tokio::test]
    async fn uninstall_success_deletes_the_site() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Removing);

        let mut repo = MockSiteRepo::new();
        let loaded = site.clone();
        repo.expect_get_by_id().returning(move |_| Ok(loaded.clone()));
        repo.expect_update_state()
            .withf(|_, state, _, _, _| *state == SiteState::Deleted)
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        repo.expect_delete().times(1).returning(|_| Ok(()));

        let (queue, _rx) = EventQueue::new();
        let service = SiteStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        service
            .handle(SiteEvent::new(SiteEventCode::UninstallSuccess, Utc::now(), site.id))
            .await
            .unwrap();
    }
}
