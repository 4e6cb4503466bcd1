use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{debug, error};

use crate::storage::Storage;

use super::builder::CrlBuilder;
use super::errors::CrlResult;

/// Configuration for CRL scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct CrlSchedulerConfig {
    /// How often to check whether the CRL needs rebuilding (in seconds)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_check_interval() -> u64 {
    300
}

impl Default for CrlSchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
        }
    }
}

/// Background task rebuilding the CRL when revocations are pending or the
/// current list is about to expire.
pub struct CrlScheduler<S: Storage> {
    config: CrlSchedulerConfig,
    builder: Arc<CrlBuilder<S>>,
}

impl<S: Storage> CrlScheduler<S> {
    pub fn new(config: CrlSchedulerConfig, builder: Arc<CrlBuilder<S>>) -> Self {
        Self { config, builder }
    }

    /// Perform a single check (used at startup and by the background loop)
    pub async fn run_once(&self) -> CrlResult<bool> {
        self.builder.rebuild_if_needed().await
    }

    /// Start the scheduler (spawns background task)
    pub fn start(self) -> JoinHandle<()> {
        let check_interval = Duration::from_secs(self.config.check_interval_secs.max(1));
        debug!(
            "Starting CRL scheduler with interval of {} seconds",
            check_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut ticker = interval(check_interval);
            ticker.tick().await; // First tick completes immediately

            loop {
                tokio::select! {
                    _ = ticker.tick() => debug!("Running scheduled CRL check"),
                    _ = self.builder.wait_for_rebuild_request() => debug!("CRL rebuild requested"),
                }

                match self.run_once().await {
                    Ok(true) => debug!("Scheduled CRL check rebuilt the CRL"),
                    Ok(false) => debug!("Scheduled CRL check: CRL is up to date"),
                    Err(e) => error!("Scheduled CRL check failed: {}", e),
                }
            }
        })
    }
}
