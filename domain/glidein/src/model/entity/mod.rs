pub mod glidein;
pub mod site;

#[rustfmt::skip]
pub use {
    glidein::{Glidein, GlideinState},
    site::{ExecutionService, Site, SiteState},
};
