use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::exception::{GlideinException, GlideinResult};

pub const SUBMIT_FILE: &str = "submit";
pub const LOG_FILE: &str = "log";
pub const OUTPUT_FILE: &str = "output";
pub const ERROR_FILE: &str = "error";
pub const CREDENTIAL_FILE: &str = "credential";
pub const STATUS_FILE: &str = "status";
pub const JOB_ID_FILE: &str = "jobid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CondorUniverse {
    #[default]
    Grid,
    Vanilla,
    Standard,
    Scheduler,
    Local,
}

impl CondorUniverse {
    pub fn type_str(&self) -> &'static str {
        match self {
            CondorUniverse::Grid => "grid",
            CondorUniverse::Vanilla => "vanilla",
            CondorUniverse::Standard => "standard",
            CondorUniverse::Scheduler => "scheduler",
            CondorUniverse::Local => "local",
        }
    }
}

/// Remote job-management protocol spoken under the grid universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CondorGridType {
    Gt2,
    Gt4,
    Gt5,
    Condor,
}

impl CondorGridType {
    pub fn type_str(&self) -> &'static str {
        match self {
            CondorGridType::Gt2 => "gt2",
            CondorGridType::Gt4 => "gt4",
            CondorGridType::Gt5 => "gt5",
            CondorGridType::Condor => "condor",
        }
    }

    /// GT2 and GT5 both describe resource requirements with globus_rsl; GT4
    /// uses the XML form.
    pub fn uses_rsl(&self) -> bool {
        matches!(self, CondorGridType::Gt2 | CondorGridType::Gt5)
    }
}

/// Scheduler-assigned job identity, a cluster/process pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId {
    pub cluster: u32,
    pub proc: u32,
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cluster, self.proc)
    }
}

impl FromStr for JobId {
    type Err = GlideinException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GlideinException::MalformedEvent {
            reason: format!("invalid job id: {s}"),
        };
        let (cluster, proc) = s.split_once('.').ok_or_else(malformed)?;
        Ok(Self {
            cluster: cluster.parse().map_err(|_| malformed())?,
            proc: proc.parse().map_err(|_| malformed())?,
        })
    }
}

/// Declarative description of a job to hand to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct JobSpec {
    pub job_dir: PathBuf,
    #[builder(default)]
    pub universe: CondorUniverse,
    #[builder(default)]
    pub grid_type: Option<CondorGridType>,
    #[builder(default)]
    pub grid_contact: Option<String>,
    pub executable: String,
    /// Whether the executable lives on the submit machine (and must be
    /// transferred) or already exists remotely.
    #[builder(default = false)]
    pub local_executable: bool,
    #[builder(default)]
    pub arguments: Vec<String>,
    #[builder(default)]
    pub environment: BTreeMap<String, String>,
    #[builder(default)]
    pub requirements: Option<String>,
    #[builder(default)]
    pub project: Option<String>,
    #[builder(default)]
    pub queue: Option<String>,
    #[builder(default = 1)]
    pub host_count: u32,
    #[builder(default = 1)]
    pub process_count: u32,
    /// Maximum runtime in minutes.
    #[builder(default = 1)]
    pub max_wall_time: u32,
    #[builder(default)]
    pub remote_dir: Option<String>,
    #[builder(default)]
    pub input_files: Vec<String>,
    #[builder(default)]
    pub output_files: Vec<String>,
    /// Delegated credential contents, persisted next to the submit script.
    #[builder(default)]
    pub credential: Option<String>,
}

impl JobSpec {
    pub fn validate(&self) -> GlideinResult<()> {
        if self.universe == CondorUniverse::Grid {
            if self.grid_type.is_none() {
                return Err(GlideinException::InvalidSpec {
                    reason: "grid universe requires a grid type".to_string(),
                });
            }
            if self.grid_contact.as_deref().map_or(true, str::is_empty) {
                return Err(GlideinException::InvalidSpec {
                    reason: "grid universe requires a grid contact".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Identity and file locations of a submitted job. The job id is assigned
/// exactly once, when the submit call succeeds, and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: JobId,
    pub job_dir: PathBuf,
}

impl JobHandle {
    pub fn new(job_id: JobId, job_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_id,
            job_dir: job_dir.into(),
        }
    }

    pub fn submit_file(&self) -> PathBuf {
        self.job_dir.join(SUBMIT_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.job_dir.join(LOG_FILE)
    }

    pub fn output_file(&self) -> PathBuf {
        self.job_dir.join(OUTPUT_FILE)
    }

    pub fn error_file(&self) -> PathBuf {
        self.job_dir.join(ERROR_FILE)
    }

    pub fn credential_file(&self) -> PathBuf {
        self.job_dir.join(CREDENTIAL_FILE)
    }

    /// Conventional output file remote jobs write their own error report to.
    pub fn status_file(&self) -> PathBuf {
        self.job_dir.join(STATUS_FILE)
    }

    pub fn job_id_file(&self) -> PathBuf {
        self.job_dir.join(JOB_ID_FILE)
    }
}

/// Path of the `jobid` sidecar for a job directory that may not have a
/// handle yet.
pub fn job_id_file(job_dir: &Path) -> PathBuf {
    job_dir.join(JOB_ID_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_round_trips() {
        let id: JobId = "32.0".parse().unwrap();
        assert_eq!(id, JobId { cluster: 32, proc: 0 });
        assert_eq!(id.to_string(), "32.0");
    }

    #[test]
    fn job_id_rejects_garbage() {
        assert!("32".parse::<JobId>().is_err());
        assert!("a.b".parse::<JobId>().is_err());
    }

    #[test]
    fn grid_spec_requires_contact() {
        let spec = JobSpec::builder()
            .job_dir("/tmp/job".into())
            .executable("/bin/hostname".to_string())
            .grid_type(Some(CondorGridType::Gt2))
            .build();
        assert!(matches!(
            spec.validate(),
            Err(GlideinException::InvalidSpec { .. })
        ));
    }
}
