use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use domain_glidein::config::ServiceConfiguration;
use domain_glidein::exception::{GlideinException, GlideinResult};
use domain_glidein::model::vo::job::{self, JobHandle, JobId, JobSpec};
use domain_glidein::service::{CondorService, JobEventListener};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::generator::{CondorEventGenerator, GeneratorHandle};
use crate::submit::submit_description;

/// The submit binary prints the assigned id as `** Proc <cluster>.<proc>:`.
static PROC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{2} Proc (\d+)\.(\d+):").unwrap());

/// Interface to the local Condor scheduler through its command-line binaries.
/// Keeps one log watcher per in-flight job.
pub struct CondorClient {
    config: Arc<ServiceConfiguration>,
    watchers: DashMap<JobId, GeneratorHandle>,
}

impl CondorClient {
    pub fn new(config: Arc<ServiceConfiguration>) -> GlideinResult<Self> {
        if config.poll_interval == 0 {
            return Err(GlideinException::InvalidSpec {
                reason: "the poll interval must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            config,
            watchers: DashMap::new(),
        })
    }

    fn condor_bin(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.config.condor_home).join("bin").join(name)
    }

    /// Run one scheduler binary with the condor environment set and capture
    /// its output. Non-zero exit is a failure carrying both streams.
    async fn run_command(
        &self,
        binary: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> GlideinResult<std::process::Output> {
        let program = self.condor_bin(binary);
        let mut command = Command::new(&program);
        command
            .args(args)
            .env("CONDOR_HOME", &self.config.condor_home)
            .env("CONDOR_CONFIG", &self.config.condor_config);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let out = command.output().await?;
        if !out.status.success() {
            return Err(GlideinException::ProcessFailed {
                command: binary.to_string(),
                code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        Ok(out)
    }

    async fn prepare_job_dir(&self, spec: &JobSpec) -> GlideinResult<()> {
        // Job directories are never reused; a leftover from an earlier
        // attempt would mix its log with ours.
        if tokio::fs::try_exists(&spec.job_dir).await? {
            tokio::fs::remove_dir_all(&spec.job_dir).await?;
        }
        tokio::fs::create_dir_all(&spec.job_dir).await?;

        if let Some(credential) = &spec.credential {
            let path = spec.job_dir.join(job::CREDENTIAL_FILE);
            tokio::fs::write(&path, credential).await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
            }
        }

        let script = submit_description(spec)?;
        tokio::fs::write(spec.job_dir.join(job::SUBMIT_FILE), script).await?;
        Ok(())
    }

    async fn do_submit(
        &self,
        spec: &JobSpec,
        listeners: Vec<Arc<dyn JobEventListener>>,
    ) -> GlideinResult<JobHandle> {
        self.prepare_job_dir(spec).await?;

        let submit_file = spec.job_dir.join(job::SUBMIT_FILE);
        let out = self
            .run_command(
                "condor_submit",
                &["-verbose", &submit_file.to_string_lossy()],
                Some(&spec.job_dir),
            )
            .await?;

        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let job_id = parse_submit_output(&stdout).ok_or_else(|| {
            GlideinException::UnparsableJobId {
                stdout,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }
        })?;

        // Recorded so the job can be cancelled after a restart.
        tokio::fs::write(job::job_id_file(&spec.job_dir), format!("{job_id}\n")).await?;

        let handle = JobHandle::new(job_id, spec.job_dir.clone());
        let generator = CondorEventGenerator::new(
            handle.clone(),
            listeners,
            Duration::from_secs(self.config.poll_interval),
        )?;
        self.watchers.insert(job_id, generator.spawn());
        tracing::info!(%job_id, dir = %spec.job_dir.display(), "job submitted");
        Ok(handle)
    }

    /// Stop the log watcher of a job, if one is still running.
    pub fn terminate_watcher(&self, job_id: &JobId) {
        if let Some((_, watcher)) = self.watchers.remove(job_id) {
            watcher.terminate();
        }
    }
}

#[async_trait::async_trait]
impl CondorService for CondorClient {
    async fn submit_job(
        &self,
        spec: JobSpec,
        listeners: Vec<Arc<dyn JobEventListener>>,
    ) -> GlideinResult<JobHandle> {
        spec.validate()?;
        match self.do_submit(&spec, listeners).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                // Failed submissions leave nothing behind.
                let _ = tokio::fs::remove_dir_all(&spec.job_dir).await;
                Err(e)
            }
        }
    }

    async fn cancel_job(&self, job_id: &JobId) -> GlideinResult<()> {
        self.run_command("condor_rm", &[&job_id.to_string()], None).await?;
        tracing::info!(%job_id, "job cancelled");
        Ok(())
    }
}

fn parse_submit_output(stdout: &str) -> Option<JobId> {
    let captures = PROC_LINE.captures(stdout)?;
    Some(JobId {
        cluster: captures[1].parse().ok()?,
        proc: captures[2].parse().ok()?,
    })
}
