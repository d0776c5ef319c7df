use std::time::Duration;

use apisign_engine::{DynamicSaltApi, SecretBackend};
use log::*;
use tokio::task::JoinHandle;

/// Starts the salt purge worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Consumed and expired salts no longer validate, so purging only keeps the ledger from growing.
pub fn start_salt_purge_worker(salts: DynamicSaltApi<SecretBackend>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        info!("🕰️ Salt purge worker started. Running every {}s", every.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running salt purge job");
            match salts.purge_expired().await {
                Ok(0) => trace!("🕰️ No expired salts to purge"),
                Ok(n) => info!("🕰️ {n} expired salts purged"),
                Err(e) if e.is_retryable() => warn!("🕰️ Salt purge job failed. Will retry on the next run. {e}"),
                Err(e) => error!("🕰️ Error running salt purge job: {e}"),
            }
        }
    })
}
