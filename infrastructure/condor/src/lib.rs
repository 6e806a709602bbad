pub mod client;
pub mod generator;
pub mod submit;

#[rustfmt::skip]
pub use {
    client::CondorClient,
    generator::{CondorEventGenerator, GeneratorHandle},
    submit::submit_description,
};
