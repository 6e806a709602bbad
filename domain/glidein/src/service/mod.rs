mod condor;
mod control;
mod listener;
mod status;

#[rustfmt::skip]
pub use {
    condor::CondorService,
    control::{GlideinControlService, SiteControlService},
    listener::{JobEventListener, ListenerFlow},
    status::{GlideinStateService, SiteStateService},
};
