//! Background tasks
//!
//! Only the overdue sweep runs in-process. Deployments that prefer an
//! external scheduler disable it and call `POST /api/admin/sweep` instead.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::orders::OrderService;

/// Periodic overdue sweep
pub struct SweepScheduler {
    orders: OrderService,
    interval: Duration,
    shutdown: CancellationToken,
}

impl SweepScheduler {
    pub fn new(orders: OrderService, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            orders,
            interval,
            shutdown,
        }
    }

    /// Sweep every `interval` until shutdown
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweep scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Sweep scheduler received shutdown signal");
                    break;
                }
            }

            match self.orders.sweep_overdue().await {
                Ok(swept) if !swept.is_empty() => {
                    tracing::info!(count = swept.len(), "Overdue sweep promoted orders");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Overdue sweep failed"),
            }
        }

        tracing::info!("Sweep scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::MemoryStore;
    use crate::menu::{FeedError, MenuCache, MenuFeed};
    use crate::telegram::RecordingNotifier;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoFeed;

    #[async_trait]
    impl MenuFeed for NoFeed {
        async fn fetch(&self) -> Result<String, FeedError> {
            Err(FeedError::NotConfigured)
        }
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let clock = Arc::new(SystemClock);
        let orders = OrderService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            MenuCache::new(Arc::new(NoFeed), clock.clone(), Duration::from_secs(60)),
            clock,
            None,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            SweepScheduler::new(orders, Duration::from_millis(10), shutdown.clone()).run(),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
