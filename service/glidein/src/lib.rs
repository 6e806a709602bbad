mod control;
mod credential;
mod event_queue;
mod listener;
mod status;

#[rustfmt::skip]
pub use {
    control::{GlideinControlServiceImpl, SiteControlServiceImpl},
    event_queue::{EventQueue, EventQueueRunner},
    listener::{GlideinJobListener, InstallSiteListener, StageSiteListener, UninstallSiteListener},
    status::{GlideinStateServiceImpl, SiteStateServiceImpl},
};
