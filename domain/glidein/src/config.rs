use std::path::PathBuf;

use serde::*;
use uuid::Uuid;

/// Service-wide settings, built once at startup and passed by `Arc` to every
/// component that needs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(default = "ServiceConfiguration::default_working_directory")]
    pub working_directory: String,
    #[serde(default = "ServiceConfiguration::default_condor_home")]
    pub condor_home: String,
    #[serde(default = "ServiceConfiguration::default_condor_config")]
    pub condor_config: String,
    #[serde(default = "ServiceConfiguration::default_install_executable")]
    pub install_executable: String,
    #[serde(default = "ServiceConfiguration::default_stage_executable")]
    pub stage_executable: String,
    #[serde(default = "ServiceConfiguration::default_uninstall_executable")]
    pub uninstall_executable: String,
    #[serde(default = "ServiceConfiguration::default_run_executable")]
    pub run_executable: String,
    #[serde(default = "Default::default")]
    pub staging_urls: Vec<String>,
    #[serde(default = "ServiceConfiguration::default_glidein_condor_config")]
    pub glidein_condor_config: String,
    /// Log poll interval in seconds. Must be greater than zero.
    #[serde(default = "ServiceConfiguration::default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "ServiceConfiguration::default_max_resubmits")]
    pub max_resubmits: u32,
    #[serde(default = "ServiceConfiguration::default_repository_path")]
    pub repository_path: String,
}

impl Default for ServiceConfiguration {
    fn default() -> Self {
        Self {
            working_directory: Self::default_working_directory(),
            condor_home: Self::default_condor_home(),
            condor_config: Self::default_condor_config(),
            install_executable: Self::default_install_executable(),
            stage_executable: Self::default_stage_executable(),
            uninstall_executable: Self::default_uninstall_executable(),
            run_executable: Self::default_run_executable(),
            staging_urls: Default::default(),
            glidein_condor_config: Self::default_glidein_condor_config(),
            poll_interval: Self::default_poll_interval(),
            max_resubmits: Self::default_max_resubmits(),
            repository_path: Self::default_repository_path(),
        }
    }
}

impl ServiceConfiguration {
    pub fn default_working_directory() -> String {
        "/var/glidein".to_string()
    }
    pub fn default_condor_home() -> String {
        "/usr/local/condor".to_string()
    }
    pub fn default_condor_config() -> String {
        "/usr/local/condor/etc/condor_config".to_string()
    }
    pub fn default_install_executable() -> String {
        "/usr/local/glidein/bin/glidein_install".to_string()
    }
    pub fn default_stage_executable() -> String {
        "/usr/local/glidein/bin/glidein_stage".to_string()
    }
    pub fn default_uninstall_executable() -> String {
        "/usr/local/glidein/bin/glidein_uninstall".to_string()
    }
    pub fn default_run_executable() -> String {
        "/usr/local/glidein/bin/glidein_run".to_string()
    }
    pub fn default_glidein_condor_config() -> String {
        "/usr/local/glidein/etc/glidein_condor_config".to_string()
    }
    pub fn default_poll_interval() -> u64 {
        10
    }
    pub fn default_max_resubmits() -> u32 {
        3
    }
    pub fn default_repository_path() -> String {
        "/var/glidein/resources.json".to_string()
    }

    pub fn site_working_dir(&self, site_id: Uuid) -> PathBuf {
        PathBuf::from(&self.working_directory).join(format!("site-{site_id}"))
    }

    pub fn glidein_working_dir(&self, glidein_id: Uuid) -> PathBuf {
        PathBuf::from(&self.working_directory).join(format!("glidein-{glidein_id}"))
    }
}
