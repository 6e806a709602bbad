use std::sync::Arc;

use colored::Colorize;
use domain_glidein::config::ServiceConfiguration;
use infrastructure_condor::CondorClient;
use service_glidein::{EventQueue, EventQueueRunner, GlideinStateServiceImpl, SiteStateServiceImpl};
use tokio::task::JoinHandle;

use crate::background_service::BackgroundService;
use crate::infrastructure::repository::JsonRepository;

pub async fn run(config: ServiceConfiguration) {
    let tasks = match build_services(Arc::new(config)).await {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {e:#}", "Cannot build service components".red());
        }
    };
    let handles = tasks
        .into_iter()
        .map(|task| {
            tokio::spawn(async move {
                task.run().await;
            })
        })
        .collect::<Vec<JoinHandle<()>>>();
    println!("Glidein service started.");
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Stopping services (ctrl-c handling).");
    for handle in handles {
        handle.abort();
    }
    std::process::exit(0);
}

async fn build_services(
    config: Arc<ServiceConfiguration>,
) -> anyhow::Result<Vec<Arc<dyn BackgroundService>>> {
    let repository = Arc::new(JsonRepository::load_or_create(&config.repository_path).await?);
    let condor = Arc::new(CondorClient::new(config.clone())?);
    let (queue, rx) = EventQueue::new();

    let site_state = Arc::new(SiteStateServiceImpl::new(
        repository.clone(),
        condor.clone(),
        queue.clone(),
        config.clone(),
    ));
    let glidein_state = Arc::new(GlideinStateServiceImpl::new(
        repository.clone(),
        repository.clone(),
        condor,
        queue,
        config,
    ));

    Ok(vec![Arc::new(EventQueueRunner::new(rx, site_state, glidein_state))])
}
