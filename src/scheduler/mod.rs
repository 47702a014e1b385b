use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::stats::Stats;

/// Cron-driven liveness log with the current message count
pub struct Heartbeat {
    scheduler: JobScheduler,
}

impl Heartbeat {
    /// Build the heartbeat job; nothing runs until [`Heartbeat::start`].
    pub async fn new(cron_expr: &str, stats: Arc<Stats>) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let stats = Arc::clone(&stats);
            Box::pin(async move {
                info!(
                    "Heartbeat: bot is alive, {} messages seen",
                    stats.total_messages()
                );
            })
        })
        .with_context(|| format!("Invalid heartbeat cron expression: {}", cron_expr))?;

        scheduler
            .add(job)
            .await
            .context("Failed to add heartbeat job")?;
        info!("Heartbeat scheduled with cron: {}", cron_expr);

        Ok(Self { scheduler })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .context("Failed to start scheduler")
    }

    pub async fn stop(mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Heartbeat stopped");
        Ok(())
    }
}
