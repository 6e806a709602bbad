use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::site::ExecutionService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub owner: String,
    pub install_path: String,
    pub local_path: String,
    #[serde(default)]
    pub condor_version: Option<String>,
    #[serde(default)]
    pub condor_package: Option<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub staging_service: ExecutionService,
    pub glidein_service: ExecutionService,
    #[serde(default)]
    pub resubmit: bool,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGlideinRequest {
    pub site_id: Uuid,
    pub owner: String,
    pub condor_host: String,
    pub host_count: u32,
    pub process_count: u32,
    /// Maximum runtime in minutes.
    pub wall_time: u32,
    #[serde(default)]
    pub idle_time: Option<u32>,
    #[serde(default)]
    pub num_cpus: Option<u32>,
    #[serde(default)]
    pub condor_debug: Option<String>,
    #[serde(default)]
    pub condor_config: Option<String>,
    #[serde(default)]
    pub resubmit: bool,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}
