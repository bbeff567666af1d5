//! Background scheduler for periodic provider health sweeps.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::main_lib::AppState;

/// Starts the health sweep. The first sweep runs immediately, then every
/// `period` until the state's shutdown token is cancelled.
pub fn start_health_refresh_scheduler(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Health refresh scheduler started ({:?} interval)", period);

        let mut refresh_interval = interval(period);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => {
                    info!("Health refresh scheduler stopped");
                    return;
                }
                _ = refresh_interval.tick() => {
                    debug!("Running scheduled health refresh");
                    state.registry.refresh_health(&state.shutdown).await;
                }
            }
        }
    })
}
