//! Application state

use std::sync::Arc;

use crate::BoxError;
use crate::auth::InitDataVerifier;
use crate::cards::CardSink;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{LedgerStore, MemoryStore, PgStore};
use crate::ledger::LedgerService;
use crate::menu::{HttpMenuFeed, MenuCache, MenuFeed};
use crate::orders::OrderService;
use crate::telegram::{BotApiClient, Notifier};

/// Shared application state
///
/// Cheap to clone; every field is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn LedgerStore>,
    pub menu: MenuCache,
    pub verifier: InitDataVerifier,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub ledger: LedgerService,
    pub orders: OrderService,
}

impl AppState {
    /// Wire up production collaborators from configuration
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let store: Arc<dyn LedgerStore> = match config.database_url.as_deref() {
            Some(url) => {
                let store = PgStore::connect(url).await?;
                tracing::info!("Connected to PostgreSQL, migrations applied");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let feed = HttpMenuFeed::new(config.sheets_csv_url.clone(), config.menu_fetch_timeout)?;
        let notifier = BotApiClient::new(&config.bot_token, config.menu_fetch_timeout)?;
        let card_sink = config
            .sheets_cards_webhook_url
            .as_deref()
            .map(|url| CardSink::new(url, config.menu_fetch_timeout))
            .transpose()?;

        Ok(Self::from_parts(
            config,
            store,
            Arc::new(feed),
            Arc::new(notifier),
            Arc::new(SystemClock),
            card_sink,
        ))
    }

    /// Assemble state from explicit collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn LedgerStore>,
        feed: Arc<dyn MenuFeed>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        card_sink: Option<CardSink>,
    ) -> Self {
        let menu = MenuCache::new(feed, clock.clone(), config.menu_cache_ttl);
        let verifier = InitDataVerifier::new(
            config.bot_token.clone(),
            config.auth_test_mode && !config.is_production(),
        );
        let ledger = LedgerService::new(store.clone(), clock.clone(), card_sink);
        let orders = OrderService::new(
            store.clone(),
            notifier.clone(),
            menu.clone(),
            clock.clone(),
            config.admin_channel_id.clone(),
        );

        Self {
            config: Arc::new(config),
            store,
            menu,
            verifier,
            notifier,
            clock,
            ledger,
            orders,
        }
    }
}
