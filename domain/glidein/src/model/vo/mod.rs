pub mod event;
pub mod job;
pub mod msg;
pub mod request;

#[rustfmt::skip]
pub use {
    event::{JobEvent, LogEventCode},
    job::{CondorGridType, CondorUniverse, JobHandle, JobId, JobSpec},
    msg::{EventProps, GlideinEvent, GlideinEventCode, ResourceEvent, SiteEvent, SiteEventCode},
};
