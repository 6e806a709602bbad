use chrono::{DateTime, Utc};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::exception::{GlideinException, GlideinResult};
use crate::model::vo::job::JobId;

/// Event codes of the scheduler's user job log, plus a synthetic `Exception`
/// code the log watcher uses to report its own failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum LogEventCode {
    Submit = 0,
    Execute = 1,
    ExecutableError = 2,
    Checkpointed = 3,
    JobEvicted = 4,
    JobTerminated = 5,
    ImageSize = 6,
    ShadowException = 7,
    Generic = 8,
    JobAborted = 9,
    JobSuspended = 10,
    JobUnsuspended = 11,
    JobHeld = 12,
    JobReleased = 13,
    NodeExecute = 14,
    NodeTerminated = 15,
    PostScriptTerminated = 16,
    GlobusSubmit = 17,
    GlobusSubmitFailed = 18,
    GlobusResourceUp = 19,
    GlobusResourceDown = 20,
    RemoteError = 21,
    JobDisconnected = 22,
    JobReconnected = 23,
    JobReconnectFailed = 24,
    GridResourceUp = 25,
    GridResourceDown = 26,
    GridSubmit = 27,
    JobAdInformation = 28,
    Exception = 999,
}

impl LogEventCode {
    pub fn from_code(code: u64) -> GlideinResult<Self> {
        Self::from_u64(code).ok_or(GlideinException::UnrecognizedEventCode { code })
    }

    pub fn description(&self) -> &'static str {
        match self {
            LogEventCode::Submit => "Job submitted",
            LogEventCode::Execute => "Job now running",
            LogEventCode::ExecutableError => "Error in executable",
            LogEventCode::Checkpointed => "Job was checkpointed",
            LogEventCode::JobEvicted => "Job evicted from machine",
            LogEventCode::JobTerminated => "Job terminated",
            LogEventCode::ImageSize => "Image size of job updated",
            LogEventCode::ShadowException => "Shadow threw an exception",
            LogEventCode::Generic => "Generic log event",
            LogEventCode::JobAborted => "Job aborted",
            LogEventCode::JobSuspended => "Job was suspended",
            LogEventCode::JobUnsuspended => "Job was unsuspended",
            LogEventCode::JobHeld => "Job was held",
            LogEventCode::JobReleased => "Job was released",
            LogEventCode::NodeExecute => "Parallel node executed",
            LogEventCode::NodeTerminated => "Parallel node terminated",
            LogEventCode::PostScriptTerminated => "POST script terminated",
            LogEventCode::GlobusSubmit => "Job submitted to Globus",
            LogEventCode::GlobusSubmitFailed => "Globus submit failed",
            LogEventCode::GlobusResourceUp => "Globus resource up",
            LogEventCode::GlobusResourceDown => "Globus resource down",
            LogEventCode::RemoteError => "Remote error",
            LogEventCode::JobDisconnected => "Job disconnected",
            LogEventCode::JobReconnected => "Job reconnected",
            LogEventCode::JobReconnectFailed => "Job reconnect failed",
            LogEventCode::GridResourceUp => "Grid resource up",
            LogEventCode::GridResourceDown => "Grid resource down",
            LogEventCode::GridSubmit => "Job submitted remotely",
            LogEventCode::JobAdInformation => "Report job ad information",
            LogEventCode::Exception => "Log parser threw an exception",
        }
    }
}

/// One parsed record of the user job log. Produced by the log watcher,
/// consumed by the job listeners, never persisted.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub code: LogEventCode,
    pub job_id: JobId,
    pub time: DateTime<Utc>,
    pub message: String,
    /// Full text of the log block the event was parsed from.
    pub details: String,
}

impl JobEvent {
    /// Synthetic event the watcher delivers when tailing itself fails, so no
    /// error is ever dropped on the floor.
    pub fn exception(job_id: JobId, error: &GlideinException) -> Self {
        Self {
            code: LogEventCode::Exception,
            job_id,
            time: Utc::now(),
            message: error.to_string(),
            details: format!("{error:#}"),
        }
    }
}
