use domain_glidein::config::ServiceConfiguration;
use tracing_subscriber::EnvFilter;

/// Build the service configuration from the optional `glidein-service.yaml`
/// next to the binary, overridden by `GLIDEIN_*` environment variables.
pub fn build_config() -> anyhow::Result<ServiceConfiguration> {
    let config = ::config::Config::builder()
        .add_source(::config::File::with_name("glidein-service").required(false))
        .add_source(::config::Environment::with_prefix("GLIDEIN"))
        .build()?;
    Ok(config.try_deserialize()?)
}

pub fn initialize_telemetry() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().map_err(|e| anyhow::anyhow!(e))
}
