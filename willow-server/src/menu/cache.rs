//! Time-bounded menu cache
//!
//! Snapshots are replaced whole, never edited. Concurrent refreshes may
//! both hit the feed; whichever finishes last wins, which only costs
//! freshness. A failed refresh keeps serving the previous snapshot and
//! holds off the feed for [`RETRY_BACKOFF_SECS`].

use chrono::{DateTime, Utc};
use shared::models::MenuSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::feed::{FeedError, MenuFeed};
use super::parser;
use crate::clock::Clock;

/// Pause between refresh attempts while the feed is failing
pub const RETRY_BACKOFF_SECS: i64 = 10;

struct CachedMenu {
    /// Serve from cache until then
    refresh_at: DateTime<Utc>,
    snapshot: Arc<MenuSnapshot>,
}

/// Menu cache shared across requests
#[derive(Clone)]
pub struct MenuCache {
    feed: Arc<dyn MenuFeed>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    cached: Arc<RwLock<Option<CachedMenu>>>,
}

impl MenuCache {
    pub fn new(feed: Arc<dyn MenuFeed>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            feed,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60)),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Current menu: cached if younger than the TTL, otherwise refreshed
    ///
    /// Errors only when the feed fails and nothing was ever cached.
    pub async fn get(&self) -> Result<Arc<MenuSnapshot>, FeedError> {
        let now = self.clock.now();
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref()
                && now < entry.refresh_at
            {
                return Ok(entry.snapshot.clone());
            }
        }

        match self.refresh(now).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.cached.write().await.as_mut() {
                Some(stale) => {
                    let backoff = chrono::Duration::seconds(RETRY_BACKOFF_SECS).min(self.ttl);
                    stale.refresh_at = now + backoff;
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = backoff.num_seconds(),
                        "Menu refresh failed, serving stale snapshot"
                    );
                    Ok(stale.snapshot.clone())
                }
                None => {
                    tracing::error!(error = %e, "Menu refresh failed with nothing cached");
                    Err(e)
                }
            },
        }
    }

    /// Last snapshot regardless of age, without touching the feed
    pub async fn peek(&self) -> Option<Arc<MenuSnapshot>> {
        self.cached
            .read()
            .await
            .as_ref()
            .map(|entry| entry.snapshot.clone())
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    async fn refresh(&self, now: DateTime<Utc>) -> Result<Arc<MenuSnapshot>, FeedError> {
        let body = self.feed.fetch().await?;
        let snapshot = Arc::new(parser::parse_menu(&body, now)?);
        tracing::info!(
            items = snapshot.items.len(),
            categories = snapshot.categories.len(),
            "Menu refreshed"
        );

        *self.cached.write().await = Some(CachedMenu {
            refresh_at: now + self.ttl,
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }
}
