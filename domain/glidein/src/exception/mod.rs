use thiserror::Error;

pub type GlideinResult<T> = Result<T, GlideinException>;

#[derive(Error, Debug)]
pub enum GlideinException {
    #[error("Invalid job specification: {reason}.")]
    InvalidSpec { reason: String },

    #[error(
        "{command} failed with code {code}:\n\nStandard out:\n{stdout}\nStandard error:\n{stderr}"
    )]
    ProcessFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error(
        "Unable to parse cluster and job id\n\nStandard out:\n{stdout}\nStandard error:\n{stderr}"
    )]
    UnparsableJobId { stdout: String, stderr: String },

    #[error("Error parsing event: {reason}.")]
    MalformedEvent { reason: String },

    #[error("Unrecognized event code: {code}.")]
    UnrecognizedEventCode { code: u64 },

    #[error("Job id mismatch: got {got}, expected {expected}.")]
    JobIdMismatch { got: String, expected: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation denied by policy: {reason}.")]
    PolicyDenied { reason: String },

    #[error("Repository failure: {source}")]
    Database {
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {source}")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for GlideinException {
    fn from(e: anyhow::Error) -> Self {
        GlideinException::Internal { source: e }
    }
}

impl GlideinException {
    /// Wraps a repository error so callers can tell persistence failures
    /// apart from internal ones.
    pub fn database(source: anyhow::Error) -> Self {
        GlideinException::Database { source }
    }
}
