use std::path::PathBuf;

use chrono::{DateTime, Utc};
use domain_glidein::model::entity::glidein::{Glidein, GlideinState};
use domain_glidein::model::entity::site::{Site, SiteState};
use domain_glidein::repository::{GlideinRepo, ListFilter, SiteRepo};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Resources {
    sites: Vec<Site>,
    glideins: Vec<Glidein>,
}

/// Resource store kept in memory and mirrored to one JSON file, so state
/// survives service restarts without a database server.
pub struct JsonRepository {
    resources: Mutex<Resources>,
    save_path: PathBuf,
}

impl JsonRepository {
    pub async fn load_or_create(save_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let save_path = save_path.into();
        let resources = match tokio::fs::read(&save_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = save_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Resources::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            resources: Mutex::new(resources),
            save_path,
        })
    }

    async fn save(&self, resources: &Resources) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(resources)?;
        tokio::fs::write(&self.save_path, bytes).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SiteRepo for JsonRepository {
    async fn create(&self, site: Site) -> anyhow::Result<Site> {
        let mut resources = self.resources.lock().await;
        if resources.sites.iter().any(|s| s.id == site.id) {
            anyhow::bail!("Site id already exists.");
        }
        resources.sites.push(site.clone());
        self.save(&resources).await?;
        Ok(site)
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Site> {
        let resources = self.resources.lock().await;
        resources
            .sites
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(anyhow::anyhow!("No such site id."))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let index = resources
            .sites
            .iter()
            .position(|s| s.id == id)
            .ok_or(anyhow::anyhow!("No such site id."))?;
        resources.sites.remove(index);
        self.save(&resources).await
    }

    async fn update_state(
        &self,
        id: Uuid,
        state: SiteState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let site = resources
            .sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(anyhow::anyhow!("No such site id."))?;
        site.state = state;
        site.short_message = short_message.to_string();
        site.long_message = long_message;
        site.last_update = time;
        self.save(&resources).await
    }

    async fn increment_submits(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let site = resources
            .sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(anyhow::anyhow!("No such site id."))?;
        site.submits += 1;
        self.save(&resources).await
    }

    async fn increment_resubmits(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let site = resources
            .sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(anyhow::anyhow!("No such site id."))?;
        site.resubmits += 1;
        self.save(&resources).await
    }

    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Site>> {
        let resources = self.resources.lock().await;
        Ok(resources
            .sites
            .iter()
            .filter(|s| filter.owner.as_ref().map_or(true, |owner| &s.owner == owner))
            .cloned()
            .collect())
    }

    async fn has_active_glideins(&self, site_id: Uuid) -> anyhow::Result<bool> {
        let resources = self.resources.lock().await;
        Ok(resources
            .glideins
            .iter()
            .any(|g| g.site_id == site_id && !g.state.is_terminal()))
    }

    async fn glidein_ids(&self, site_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let resources = self.resources.lock().await;
        Ok(resources
            .glideins
            .iter()
            .filter(|g| g.site_id == site_id)
            .map(|g| g.id)
            .collect())
    }
}

#[async_trait::async_trait]
impl GlideinRepo for JsonRepository {
    async fn create(&self, glidein: Glidein) -> anyhow::Result<Glidein> {
        let mut resources = self.resources.lock().await;
        if resources.glideins.iter().any(|g| g.id == glidein.id) {
            anyhow::bail!("Glidein id already exists.");
        }
        resources.glideins.push(glidein.clone());
        self.save(&resources).await?;
        Ok(glidein)
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Glidein> {
        let resources = self.resources.lock().await;
        resources
            .glideins
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(anyhow::anyhow!("No such glidein id."))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let index = resources
            .glideins
            .iter()
            .position(|g| g.id == id)
            .ok_or(anyhow::anyhow!("No such glidein id."))?;
        resources.glideins.remove(index);
        self.save(&resources).await
    }

    async fn update_state(
        &self,
        id: Uuid,
        state: GlideinState,
        short_message: &str,
        long_message: Option<String>,
        time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let glidein = resources
            .glideins
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(anyhow::anyhow!("No such glidein id."))?;
        glidein.state = state;
        glidein.short_message = short_message.to_string();
        glidein.long_message = long_message;
        glidein.last_update = time;
        self.save(&resources).await
    }

    async fn increment_submits(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let glidein = resources
            .glideins
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(anyhow::anyhow!("No such glidein id."))?;
        glidein.submits += 1;
        self.save(&resources).await
    }

    async fn increment_resubmits(&self, id: Uuid) -> anyhow::Result<()> {
        let mut resources = self.resources.lock().await;
        let glidein = resources
            .glideins
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(anyhow::anyhow!("No such glidein id."))?;
        glidein.resubmits += 1;
        self.save(&resources).await
    }

    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Glidein>> {
        let resources = self.resources.lock().await;
        Ok(resources
            .glideins
            .iter()
            .filter(|g| filter.owner.as_ref().map_or(true, |owner| &g.owner == owner))
            .filter(|g| filter.site_id.map_or(true, |site_id| g.site_id == site_id))
            .cloned()
            .collect())
    }
}
