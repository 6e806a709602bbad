use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain_glidein::config::ServiceConfiguration;
use domain_glidein::exception::{GlideinException, GlideinResult};
use domain_glidein::model::entity::glidein::{Glidein, GlideinState};
use domain_glidein::model::entity::site::{Site, SiteState};
use domain_glidein::model::vo::job::{JobSpec, STATUS_FILE};
use domain_glidein::model::vo::msg::{
    GlideinEvent, GlideinEventCode, ResourceEvent, SiteEvent, SiteEventCode,
};
use domain_glidein::repository::{GlideinRepo, SiteRepo};
use domain_glidein::service::{CondorService, GlideinStateService};

use crate::credential;
use crate::event_queue::EventQueue;
use crate::listener::GlideinJobListener;
use crate::status::{read_job_id, remove_working_dir};

/// State machine of the glidein resources. A glidein waits for its site to
/// become ready, submits one scheduler job, follows the job's remote
/// progress, and applies the resubmit policy when the job fails.
pub struct GlideinStateServiceImpl {
    glidein_repo: Arc<dyn GlideinRepo>,
    site_repo: Arc<dyn SiteRepo>,
    condor: Arc<dyn CondorService>,
    queue: EventQueue,
    config: Arc<ServiceConfiguration>,
}

#[async_trait::async_trait]
impl GlideinStateService for GlideinStateServiceImpl {
    async fn handle(&self, event: GlideinEvent) -> GlideinResult<()> {
        let mut glidein = match self.glidein_repo.get_by_id(event.glidein_id).await {
            Ok(glidein) => glidein,
            Err(e) => {
                tracing::warn!(
                    glidein_id = %event.glidein_id,
                    "unable to process event {:?}: {e:#}",
                    event.code
                );
                return Ok(());
            }
        };
        if glidein.state == GlideinState::Deleted {
            tracing::warn!(
                glidein_id = %glidein.id,
                "unable to process event {:?}: glidein has been deleted",
                event.code
            );
            return Ok(());
        }

        match event.code {
            GlideinEventCode::Submit => {
                if matches!(glidein.state, GlideinState::New | GlideinState::Waiting) {
                    self.try_submit(&mut glidein, event.time).await?;
                } else {
                    self.wrong_state(&glidein, GlideinState::New, event.code);
                }
            }

            GlideinEventCode::SiteReady => {
                if glidein.state == GlideinState::Waiting {
                    self.try_submit(&mut glidein, event.time).await?;
                }
            }

            GlideinEventCode::SiteFailed => {
                if glidein.state.has_job() {
                    // Log only; the glidein is going to fail either way.
                    if let Err(e) = self.cancel_glidein_job(&glidein).await {
                        tracing::error!(glidein_id = %glidein.id, "unable to cancel glidein job: {e:#}");
                    }
                }
                self.fail_quietly(&mut glidein, "Site failed", None, event.time).await;
            }

            GlideinEventCode::Queued => {
                if glidein.state == GlideinState::Submitted {
                    self.update_state(
                        &mut glidein,
                        GlideinState::Queued,
                        "Glidein job queued",
                        None,
                        event.time,
                    )
                    .await?;
                } else {
                    self.wrong_state(&glidein, GlideinState::Submitted, event.code);
                }
            }

            GlideinEventCode::Running => {
                if matches!(glidein.state, GlideinState::Submitted | GlideinState::Queued) {
                    self.update_state(
                        &mut glidein,
                        GlideinState::Running,
                        "Glidein job running",
                        None,
                        event.time,
                    )
                    .await?;
                }
            }

            GlideinEventCode::JobSuccess => {
                if glidein.state == GlideinState::Running {
                    self.update_state(
                        &mut glidein,
                        GlideinState::Finished,
                        "Glidein finished",
                        None,
                        event.time,
                    )
                    .await?;
                } else {
                    self.wrong_state(&glidein, GlideinState::Running, event.code);
                }
            }

            GlideinEventCode::JobFailure => {
                self.handle_job_failure(&mut glidein, &event).await?;
            }

            GlideinEventCode::JobAborted => {
                if glidein.state == GlideinState::Removing {
                    // The abort we asked for; deletion can complete now.
                    self.update_state(
                        &mut glidein,
                        GlideinState::Deleted,
                        "Glidein deleted",
                        None,
                        event.time,
                    )
                    .await?;
                    self.delete(&glidein, event.time).await?;
                } else {
                    // Keep the long message: it may hold the original error.
                    let long_message = glidein.long_message.clone();
                    self.update_state(
                        &mut glidein,
                        GlideinState::Failed,
                        "Glidein aborted",
                        long_message,
                        event.time,
                    )
                    .await?;
                }
            }

            GlideinEventCode::Remove => {
                if glidein.state.has_job() {
                    self.update_state(
                        &mut glidein,
                        GlideinState::Removing,
                        "Cancelling job",
                        None,
                        event.time,
                    )
                    .await?;
                    // The cancellation produces an abort event, which
                    // completes the deletion.
                    if let Err(e) = self.cancel_glidein_job(&glidein).await {
                        self.fail_quietly(
                            &mut glidein,
                            "Unable to cancel glidein job",
                            Some(format!("{e:#}")),
                            event.time,
                        )
                        .await;
                    }
                } else {
                    self.update_state(
                        &mut glidein,
                        GlideinState::Deleted,
                        "Glidein deleted",
                        None,
                        event.time,
                    )
                    .await?;
                    self.delete(&glidein, event.time).await?;
                }
            }

            GlideinEventCode::Delete => {
                self.update_state(
                    &mut glidein,
                    GlideinState::Deleted,
                    "Glidein deleted",
                    None,
                    event.time,
                )
                .await?;
                self.delete(&glidein, event.time).await?;
            }
        }
        Ok(())
    }
}

impl GlideinStateServiceImpl {
    pub fn new(
        glidein_repo: Arc<dyn GlideinRepo>,
        site_repo: Arc<dyn SiteRepo>,
        condor: Arc<dyn CondorService>,
        queue: EventQueue,
        config: Arc<ServiceConfiguration>,
    ) -> Self {
        Self {
            glidein_repo,
            site_repo,
            condor,
            queue,
            config,
        }
    }

    async fn update_state(
        &self,
        glidein: &mut Glidein,
        state: GlideinState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> GlideinResult<()> {
        tracing::info!(glidein_id = %glidein.id, "changing state to {state:?}: {short_message}");
        glidein.state = state;
        glidein.short_message = short_message.to_string();
        glidein.long_message = long_message;
        glidein.last_update = time;
        self.glidein_repo
            .update_state(glidein.id, state, short_message, glidein.long_message.clone(), time)
            .await
            .map_err(GlideinException::database)
    }

    async fn fail(
        &self,
        glidein: &mut Glidein,
        message: &str,
        detail: Option<String>,
        time: DateTime<Utc>,
    ) -> GlideinResult<()> {
        tracing::error!(glidein_id = %glidein.id, "failure: {message}");
        self.update_state(glidein, GlideinState::Failed, message, detail, time).await
    }

    async fn fail_quietly(
        &self,
        glidein: &mut Glidein,
        message: &str,
        detail: Option<String>,
        time: DateTime<Utc>,
    ) {
        if let Err(e) = self.fail(glidein, message, detail, time).await {
            tracing::error!(glidein_id = %glidein.id, "unable to change state to Failed: {e:#}");
        }
    }

    fn wrong_state(&self, glidein: &Glidein, required: GlideinState, code: GlideinEventCode) {
        tracing::warn!(
            glidein_id = %glidein.id,
            "state was not {required:?} when event {code:?} was received"
        );
    }

    /// Submit the glidein job if the site is ready, otherwise wait for its
    /// ready notification.
    async fn try_submit(&self, glidein: &mut Glidein, time: DateTime<Utc>) -> GlideinResult<()> {
        let site = match self.site_repo.get_by_id(glidein.site_id).await {
            Ok(site) => site,
            Err(e) => {
                self.fail_quietly(
                    glidein,
                    "Unable to check for site ready state",
                    Some(format!("{e:#}")),
                    time,
                )
                .await;
                return Ok(());
            }
        };
        if site.state == SiteState::Ready {
            self.update_state(glidein, GlideinState::Submitted, "Local job submitted", None, time)
                .await?;
            if let Err(e) = self.submit_glidein_job(glidein, &site).await {
                self.fail_quietly(glidein, "Unable to submit job", Some(format!("{e:#}")), time)
                    .await;
            }
        } else {
            self.update_state(
                glidein,
                GlideinState::Waiting,
                "Waiting for site to be Ready",
                None,
                time,
            )
            .await?;
        }
        Ok(())
    }

    async fn submit_glidein_job(&self, glidein: &Glidein, site: &Site) -> GlideinResult<()> {
        tracing::info!(glidein_id = %glidein.id, "submitting glidein job");

        let working_dir = self.config.glidein_working_dir(glidein.id);

        let mut arguments = vec![
            format!("-installPath {}", site.install_path),
            format!("-localPath {}", site.local_path),
            format!("-condorHost {}", glidein.condor_host),
            // One minute less than the reservation so the glidein can exit
            // on its own before the scheduler kills it.
            format!("-wallTime {}", glidein.wall_time.saturating_sub(1).max(1)),
        ];
        if let Some(idle_time) = glidein.idle_time.filter(|t| *t > 0) {
            arguments.push(format!("-idleTime {idle_time}"));
        }
        if let Some(debug) = &glidein.condor_debug {
            for level in debug.split([' ', ',', ';', ':']).filter(|s| !s.is_empty()) {
                arguments.push(format!("-debug {level}"));
            }
        }
        if let Some(num_cpus) = glidein.num_cpus.filter(|n| *n > 0) {
            arguments.push(format!("-numCpus {num_cpus}"));
        }

        let mut environment: BTreeMap<String, String> = site.environment.clone();
        environment.insert("GLIDEIN_SITE_ID".to_string(), site.id.to_string());
        environment.insert("GLIDEIN_SITE_NAME".to_string(), site.name.clone());
        environment.insert("GLIDEIN_ID".to_string(), glidein.id.to_string());
        environment.insert("GLIDEIN_OWNER".to_string(), glidein.owner.clone());

        // A glidein may carry its own condor configuration; otherwise the
        // service-wide file is transferred.
        let condor_config = match &glidein.condor_config {
            Some(content) => {
                let path = working_dir.join("glidein_condor_config");
                tokio::fs::create_dir_all(&working_dir).await?;
                tokio::fs::write(&path, content).await?;
                path.to_string_lossy().into_owned()
            }
            None => self.config.glidein_condor_config.clone(),
        };

        let service = &site.glidein_service;
        let spec = JobSpec::builder()
            .job_dir(working_dir.join("job"))
            .grid_type(Some(service.service_type))
            .grid_contact(Some(service.service_contact.clone()))
            .project(service.project.clone())
            .queue(service.queue.clone())
            .executable(self.config.run_executable.clone())
            .local_executable(true)
            .host_count(glidein.host_count)
            .process_count(glidein.process_count)
            .max_wall_time(glidein.wall_time)
            .arguments(arguments)
            .environment(environment)
            .input_files(vec![condor_config])
            .output_files(vec![STATUS_FILE.to_string()])
            .credential(Some(credential::load(&working_dir).await?))
            .build();

        let listener = Arc::new(GlideinJobListener::new(
            glidein.id,
            self.queue.clone(),
            self.condor.clone(),
        ));
        self.condor.submit_job(spec, vec![listener]).await?;
        self.glidein_repo
            .increment_submits(glidein.id)
            .await
            .map_err(GlideinException::database)
    }

    async fn cancel_glidein_job(&self, glidein: &Glidein) -> GlideinResult<()> {
        tracing::info!(glidein_id = %glidein.id, "cancelling glidein job");
        let job_dir = self.config.glidein_working_dir(glidein.id).join("job");
        let job_id = read_job_id(&job_dir).await?;
        self.condor.cancel_job(&job_id).await
    }

    /// Apply the resubmit policy to a failed glidein job.
    async fn handle_job_failure(
        &self,
        glidein: &mut Glidein,
        event: &GlideinEvent,
    ) -> GlideinResult<()> {
        if self.should_resubmit(glidein) {
            self.glidein_repo
                .increment_resubmits(glidein.id)
                .await
                .map_err(GlideinException::database)?;
            glidein.resubmits += 1;
            self.update_state(
                glidein,
                GlideinState::Waiting,
                "Resubmitting glidein",
                None,
                event.time,
            )
            .await?;
            self.queue.add(ResourceEvent::Glidein(GlideinEvent::new(
                GlideinEventCode::Submit,
                event.time,
                glidein.id,
            )));
            Ok(())
        } else {
            let message = event
                .props
                .message
                .clone()
                .unwrap_or_else(|| "Glidein job failed".to_string());
            self.fail(glidein, &message, event.props.detail.clone(), event.time).await
        }
    }

    fn should_resubmit(&self, glidein: &Glidein) -> bool {
        glidein.resubmit
            && glidein.resubmits < self.config.max_resubmits
            && glidein.until.map_or(true, |until| until > Utc::now())
    }

    async fn delete(&self, glidein: &Glidein, time: DateTime<Utc>) -> GlideinResult<()> {
        tracing::info!(glidein_id = %glidein.id, "deleting glidein");
        self.glidein_repo.delete(glidein.id).await.map_err(GlideinException::database)?;
        // The site may be waiting for its glideins to drain.
        self.queue.add(ResourceEvent::Site(SiteEvent::new(
            SiteEventCode::GlideinDeleted,
            time,
            glidein.site_id,
        )));
        remove_working_dir(&self.config.glidein_working_dir(glidein.id)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use domain_glidein::mock::{MockCondorService, MockGlideinRepo, MockSiteRepo};
    use domain_glidein::model::entity::site::ExecutionService;
    use domain_glidein::model::vo::job::{CondorGridType, JobHandle, JobId};
    use domain_glidein::model::vo::msg::EventProps;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    fn test_site(state: SiteState) -> Site {
        let now = Utc::now();
        Site {
            id: Uuid::new_v4(),
            name: "sdsc".to_string(),
            state,
            short_message: "Site ready".to_string(),
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
                project: Some("CSB246".to_string()),
                queue: Some("dque".to_string()),
            },
            resubmit: false,
            submits: 0,
            resubmits: 0,
            until: None,
        }
    }

    fn test_glidein(site_id: Uuid, state: GlideinState) -> Glidein {
        let now = Utc::now();
        Glidein {
            id: Uuid::new_v4(),
            site_id,
            state,
            short_message: "Created".to_string(),
            long_message: None,
            created: now,
            last_update: now,
            owner: "/O=Grid/CN=juve".to_string(),
            condor_host: "corbusier.example.org".to_string(),
            host_count: 1,
            process_count: 2,
            wall_time: 60,
            idle_time: None,
            num_cpus: None,
            condor_debug: None,
            condor_config: None,
            resubmit: false,
            submits: 0,
            resubmits: 0,
            until: None,
        }
    }

    /// Repo backed by one shared glidein so state survives across events.
    fn stateful_repo(store: Arc<Mutex<Glidein>>) -> MockGlideinRepo {
        let mut repo = MockGlideinRepo::new();
        let s = store.clone();
        repo.expect_get_by_id().returning(move |_| Ok(s.lock().unwrap().clone()));
        let s = store.clone();
        repo.expect_update_state().returning(move |_, state, short, long, time| {
            let mut glidein = s.lock().unwrap();
            glidein.state = state;
            glidein.short_message = short.to_string();
            glidein.long_message = long;
            glidein.last_update = time;
            Ok(())
        });
        let s = store.clone();
        repo.expect_increment_submits().returning(move |_| {
            s.lock().unwrap().submits += 1;
            Ok(())
        });
        let s = store;
        repo.expect_increment_resubmits().returning(move |_| {
            s.lock().unwrap().resubmits += 1;
            Ok(())
        });
        repo
    }

    fn ready_site_repo(site: Site) -> MockSiteRepo {
        let mut repo = MockSiteRepo::new();
        repo.expect_get_by_id().returning(move |_| Ok(site.clone()));
        repo
    }

    fn config_with_workdir(dir: &TempDir) -> Arc<ServiceConfiguration> {
        Arc::new(ServiceConfiguration {
            working_directory: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        })
    }

    async fn seed_credential(config: &ServiceConfiguration, glidein_id: Uuid) {
        let dir = config.glidein_working_dir(glidein_id);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("credential"), "proxy").await.unwrap();
    }

    fn submitted_handle() -> JobHandle {
        JobHandle::new(JobId { cluster: 32, proc: 0 }, "/tmp/job")
    }

    #[tokio::test]
    async fn lifecycle_reaches_finished_with_monotonic_timestamps() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Ready);
        let glidein = test_glidein(site.id, GlideinState::New);
        let glidein_id = glidein.id;
        seed_credential(&config, glidein_id).await;

        let store = Arc::new(Mutex::new(glidein));
        let mut condor = MockCondorService::new();
        condor
            .expect_submit_job()
            .withf(|spec, _| {
                spec.arguments.contains(&"-wallTime 59".to_string())
                    && spec.output_files == vec!["status".to_string()]
            })
            .times(1)
            .returning(|_, _| Ok(submitted_handle()));

        let (queue, _rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(stateful_repo(store.clone())),
            Arc::new(ready_site_repo(site)),
            Arc::new(condor),
            queue,
            config,
        );

        let base = Utc::now();
        let steps = [
            (GlideinEventCode::Submit, GlideinState::Submitted),
            (GlideinEventCode::Queued, GlideinState::Queued),
            (GlideinEventCode::Running, GlideinState::Running),
            (GlideinEventCode::JobSuccess, GlideinState::Finished),
        ];
        for (i, (code, expected)) in steps.into_iter().enumerate() {
            let time = base + chrono::Duration::seconds(i as i64 + 1);
            service.handle(GlideinEvent::new(code, time, glidein_id)).await.unwrap();
            let current = store.lock().unwrap().clone();
            assert_eq!(current.state, expected);
            assert_eq!(current.last_update, time);
        }
        assert_eq!(store.lock().unwrap().submits, 1);
    }

    #[tokio::test]
    async fn job_failures_resubmit_until_the_limit_then_fail() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Ready);
        let mut glidein = test_glidein(site.id, GlideinState::Running);
        glidein.resubmit = true;
        let glidein_id = glidein.id;

        let store = Arc::new(Mutex::new(glidein));
        let (queue, rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(stateful_repo(store.clone())),
            Arc::new(ready_site_repo(site)),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );

        for expected_resubmits in 1..=3u32 {
            service
                .handle(
                    GlideinEvent::new(GlideinEventCode::JobFailure, Utc::now(), glidein_id)
                        .with_props(EventProps::failure("Glidein job failed", None)),
                )
                .await
                .unwrap();
            let current = store.lock().unwrap().clone();
            assert_eq!(current.state, GlideinState::Waiting);
            assert_eq!(current.resubmits, expected_resubmits);
        }

        // Limit reached: the fourth failure is terminal.
        service
            .handle(
                GlideinEvent::new(GlideinEventCode::JobFailure, Utc::now(), glidein_id)
                    .with_props(EventProps::failure("Glidein job failed", None)),
            )
            .await
            .unwrap();
        let current = store.lock().unwrap().clone();
        assert_eq!(current.state, GlideinState::Failed);
        assert_eq!(current.resubmits, 3);

        let mut submits = 0;
        while let Ok(ResourceEvent::Glidein(event)) = rx.try_recv() {
            assert_eq!(event.code, GlideinEventCode::Submit);
            submits += 1;
        }
        assert_eq!(submits, 3);
    }

    #[tokio::test]
    async fn submit_waits_when_site_is_not_ready() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Staging);
        let glidein = test_glidein(site.id, GlideinState::New);
        let glidein_id = glidein.id;

        let store = Arc::new(Mutex::new(glidein));
        let (queue, _rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(stateful_repo(store.clone())),
            Arc::new(ready_site_repo(site)),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );

        service
            .handle(GlideinEvent::new(GlideinEventCode::Submit, Utc::now(), glidein_id))
            .await
            .unwrap();
        let current = store.lock().unwrap().clone();
        assert_eq!(current.state, GlideinState::Waiting);
        assert_eq!(current.short_message, "Waiting for site to be Ready");
    }

    #[tokio::test]
    async fn remove_cancels_the_job_and_abort_completes_deletion() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Ready);
        let glidein = test_glidein(site.id, GlideinState::Running);
        let glidein_id = glidein.id;
        let site_id = glidein.site_id;

        // A submitted job leaves its id on record.
        let job_dir = config.glidein_working_dir(glidein_id).join("job");
        tokio::fs::create_dir_all(&job_dir).await.unwrap();
        tokio::fs::write(job_dir.join("jobid"), "32.0\n").await.unwrap();

        let store = Arc::new(Mutex::new(glidein));
        let mut repo = stateful_repo(store.clone());
        repo.expect_delete().times(1).returning(|_| Ok(()));

        let mut condor = MockCondorService::new();
        condor
            .expect_cancel_job()
            .withf(|id| id.to_string() == "32.0")
            .times(1)
            .returning(|_| Ok(()));

        let (queue, rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(ready_site_repo(site)),
            Arc::new(condor),
            queue,
            config,
        );

        service
            .handle(GlideinEvent::new(GlideinEventCode::Remove, Utc::now(), glidein_id))
            .await
            .unwrap();
        assert_eq!(store.lock().unwrap().state, GlideinState::Removing);

        service
            .handle(GlideinEvent::new(GlideinEventCode::JobAborted, Utc::now(), glidein_id))
            .await
            .unwrap();
        assert_eq!(store.lock().unwrap().state, GlideinState::Deleted);

        let Ok(ResourceEvent::Site(event)) = rx.try_recv() else {
            panic!("expected the site to be notified");
        };
        assert_eq!(event.code, SiteEventCode::GlideinDeleted);
        assert_eq!(event.site_id, site_id);
    }

    #[tokio::test]
    async fn aborted_outside_removal_fails_and_keeps_the_long_message() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let site = test_site(SiteState::Ready);
        let mut glidein = test_glidein(site.id, GlideinState::Running);
        glidein.long_message = Some("original error".to_string());
        let glidein_id = glidein.id;

        let store = Arc::new(Mutex::new(glidein));
        let (queue, _rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(stateful_repo(store.clone())),
            Arc::new(ready_site_repo(site)),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );

        service
            .handle(GlideinEvent::new(GlideinEventCode::JobAborted, Utc::now(), glidein_id))
            .await
            .unwrap();
        let current = store.lock().unwrap().clone();
        assert_eq!(current.state, GlideinState::Failed);
        assert_eq!(current.short_message, "Glidein aborted");
        assert_eq!(current.long_message.as_deref(), Some("original error"));
    }

    #[tokio::test]
    async fn events_for_unknown_glideins_are_ignored() {
        let workdir = TempDir::new().unwrap();
        let config = config_with_workdir(&workdir);
        let mut repo = MockGlideinRepo::new();
        repo.expect_get_by_id().returning(|_| Err(anyhow::anyhow!("no such glidein")));

        let (queue, _rx) = EventQueue::new();
        let service = GlideinStateServiceImpl::new(
            Arc::new(repo),
            Arc::new(MockSiteRepo::new()),
            Arc::new(MockCondorService::new()),
            queue,
            config,
        );
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            service.handle(GlideinEvent::new(
                GlideinEventCode::Running,
                Utc::now(),
                Uuid::new_v4(),
            )),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }
}
