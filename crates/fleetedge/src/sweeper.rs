//! Background expiry of JIT grants.
//!
//! Reads never depend on the sweeper: an elapsed grant is inactive as soon
//! as its window closes. The sweeper only materialises the `Expired` status
//! and its audit entry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleetedge_config::JitConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::authorizer::Authorizer;

/// Handle to a running sweeper task.
pub struct ExpirySweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Spawns a sweep every `period` on the current runtime.
    ///
    /// The first sweep runs immediately.
    pub fn spawn(authorizer: Arc<Authorizer>, period: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "Expiry sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match authorizer.sweep_expired(Utc::now()) {
                            Ok(expired) if !expired.is_empty() => {
                                info!(count = expired.len(), "Expired JIT grants swept");
                            }
                            Ok(_) => debug!("Sweep found nothing to expire"),
                            Err(e) => warn!(error = %e, "Expiry sweep failed"),
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        });

        Self { shutdown, handle }
    }

    /// Signals the task to stop and waits for it.
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already exited.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Expiry sweeper task panicked");
        }
    }

    /// Spawns a sweep every `jit.sweep_interval_secs`.
    pub fn from_config(authorizer: Arc<Authorizer>, config: &JitConfig) -> Self {
        Self::spawn(authorizer, Duration::from_secs(config.sweep_interval_secs))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
