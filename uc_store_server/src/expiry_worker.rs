use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

use crate::routes::DepositApi;

/// Starts the stale top-up sweep. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_expiry_worker(api: DepositApi, lifetime: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        info!("🕰️ Stale top-up expiry worker started");
        loop {
            timer.tick().await;
            match api.expire_stale(lifetime).await {
                Ok(result) if result.deleted > 0 => {
                    info!("🕰️ {} stale top-up requests deleted", result.deleted);
                },
                Ok(_) => trace!("🕰️ No stale top-up requests to delete"),
                Err(e) => {
                    error!("🕰️ Error running the top-up expiry job: {e}");
                },
            }
        }
    })
}
