//! Market data orchestrator.
//!
//! Owns the feed, the subscription hub, the freshness caches, and the
//! transport manager, and drives the periodic tasks: the price-tick
//! driver, the cache sweep, and per-topic polling fallbacks. Public
//! methods never propagate errors to subscribers; failure surfaces as
//! absence, a transport state transition, or a degraded contract.

use crate::cache::TtlCache;
use crate::error::{MarketDataError, Result};
use crate::feed::{DataFeed, SimulatedFeed};
use crate::hub::{FeedCommand, MarketUpdate, SubscriptionHub, SubscriptionId, TopicKey, TopicKind};
use crate::transport::{SimulatedTransport, Transport, TransportManager};
use chrono::Utc;
use common::{InstrumentQuote, Mode, OptionChain, TransportState};
use config::EngineConfig;
use parking_lot::{Mutex, RwLock};
use simulation::{MarketHours, TrendLabel};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn quote_key(symbol: &str) -> String {
    format!("quote:{symbol}")
}

fn chain_key(underlying: &str) -> String {
    format!("chain:{underlying}")
}

struct ServiceInner {
    config: EngineConfig,
    hub: SubscriptionHub,
    quote_cache: TtlCache<InstrumentQuote>,
    chain_cache: TtlCache<OptionChain>,
    /// Active data source; swapped wholesale by `switch_mode`
    feed: RwLock<Arc<dyn DataFeed>>,
    /// The in-process simulator, kept for demo mode and trend overrides
    simulated: Arc<SimulatedFeed>,
    /// Live adapter, registered by the embedder
    live_feed: Mutex<Option<Arc<dyn DataFeed>>>,
    mode: Mutex<Mode>,
    transport: TransportManager,
    hours: MarketHours,
    pollers: Mutex<HashMap<TopicKey, CancellationToken>>,
    /// Topics that received a push update since the transport last
    /// connected; their polling fallback has been cancelled
    push_seen: Mutex<HashSet<TopicKey>>,
    shutdown_tx: watch::Sender<bool>,
}

/// The engine's public face: subscriptions, current-value reads, mode
/// switching, and lifecycle.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct MarketDataService {
    inner: Arc<ServiceInner>,
    commands: Arc<Mutex<Option<mpsc::UnboundedReceiver<FeedCommand>>>>,
}

impl MarketDataService {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_transport(config, Arc::new(SimulatedTransport))
    }

    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let (hub, command_rx) = SubscriptionHub::new();

        let simulated = Arc::new(SimulatedFeed::new(
            config.instruments.clone(),
            config.simulation.clone(),
            &config.market_hours,
            config.chain.clone(),
            Mode::Demo,
        ));

        let mode = match config.engine.mode {
            Mode::Live => {
                warn!("Configured for live mode but no feed adapter registered yet, starting in demo");
                Mode::Demo
            }
            Mode::Demo => Mode::Demo,
        };

        let (shutdown_tx, _) = watch::channel(false);

        let inner = Arc::new(ServiceInner {
            hub,
            quote_cache: TtlCache::new(
                config.cache.max_entries,
                Duration::from_millis(config.cache.quote_ttl_ms),
            ),
            chain_cache: TtlCache::new(
                config.cache.max_entries,
                Duration::from_millis(config.cache.chain_ttl_ms),
            ),
            feed: RwLock::new(simulated.clone() as Arc<dyn DataFeed>),
            simulated,
            live_feed: Mutex::new(None),
            mode: Mutex::new(mode),
            transport: TransportManager::new(transport, config.transport.reconnect.clone()),
            hours: MarketHours::from_config(&config.market_hours),
            pollers: Mutex::new(HashMap::new()),
            push_seen: Mutex::new(HashSet::new()),
            shutdown_tx,
            config,
        });

        Self {
            inner,
            commands: Arc::new(Mutex::new(Some(command_rx))),
        }
    }

    /// Register the live feed adapter used when switching to
    /// [`Mode::Live`]
    pub fn register_live_feed(&self, feed: Arc<dyn DataFeed>) {
        *self.inner.live_feed.lock() = Some(feed);
    }

    /// Spawn the periodic tasks. Call once.
    pub async fn start(&self) {
        let Some(command_rx) = self.commands.lock().take() else {
            warn!("Service already started");
            return;
        };

        if self.inner.config.transport.push_enabled {
            if let Err(e) = self.inner.transport.connect().await {
                warn!(error = %e, "Initial transport connect failed");
            }
        }

        tokio::spawn(Self::command_loop(self.inner.clone(), command_rx));
        tokio::spawn(Self::tick_driver(self.inner.clone()));
        tokio::spawn(Self::sweep_loop(self.inner.clone()));
        tokio::spawn(Self::transport_watcher(self.inner.clone()));

        info!(mode = ?*self.inner.mode.lock(), "Market data service started");
    }

    // ---- public surface ----------------------------------------------------

    /// Subscribe to per-tick quotes for `symbols`
    pub fn subscribe_to_prices(
        &self,
        symbols: Vec<String>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<MarketUpdate>) {
        self.inner.hub.subscribe(TopicKind::Quotes, symbols)
    }

    /// Subscribe to option chain snapshots for one underlying
    pub fn subscribe_to_option_chain(
        &self,
        underlying: impl Into<String>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<MarketUpdate>) {
        self.inner.hub.subscribe(TopicKind::Chain, vec![underlying.into()])
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.hub.unsubscribe(id)
    }

    /// Freshest cached quote, or `None`. Never fetches.
    pub fn current_price(&self, symbol: &str) -> Option<InstrumentQuote> {
        self.inner.quote_cache.get(&quote_key(symbol))
    }

    /// Freshest cached option chain, or `None`. Never fetches.
    pub fn current_option_chain(&self, underlying: &str) -> Option<OptionChain> {
        self.inner.chain_cache.get(&chain_key(underlying))
    }

    pub fn connection_status(&self) -> TransportState {
        self.inner.transport.state()
    }

    pub fn watch_connection_status(&self) -> watch::Receiver<TransportState> {
        self.inner.transport.watch_state()
    }

    pub fn is_market_open(&self) -> bool {
        self.inner.hours.is_open(Utc::now())
    }

    pub fn mode(&self) -> Mode {
        *self.inner.mode.lock()
    }

    /// Force a trend regime on the demo simulator
    pub fn set_trend(&self, symbol: &str, label: TrendLabel, strength: f64) {
        self.inner.simulated.set_trend(symbol, label, strength);
    }

    /// Re-arm a transport that has settled in `Error`
    pub async fn reset_transport(&self) -> Result<()> {
        self.inner.transport.reset().await
    }

    /// Swap the data source. Existing subscription ids and their
    /// receivers survive; only the upstream changes.
    pub async fn switch_mode(&self, mode: Mode) -> Result<()> {
        if *self.inner.mode.lock() == mode {
            return Ok(());
        }

        let new_feed: Arc<dyn DataFeed> = match mode {
            Mode::Demo => self.inner.simulated.clone(),
            Mode::Live => self
                .inner
                .live_feed
                .lock()
                .clone()
                .ok_or_else(|| MarketDataError::NoFeedForMode("live".to_string()))?,
        };

        info!(?mode, "Switching data source");
        *self.inner.feed.write() = new_feed;
        *self.inner.mode.lock() = mode;

        // Everything cached came from the old source
        self.inner.quote_cache.invalidate_prefix("");
        self.inner.chain_cache.invalidate_prefix("");

        // Warm the cache back up for every active topic
        for key in self.inner.hub.active_topics() {
            Self::populate(&self.inner, &key).await;
        }

        Ok(())
    }

    /// Stop all periodic tasks and tear down the transport
    pub async fn shutdown(&self) {
        info!("Market data service shutting down");
        let _ = self.inner.shutdown_tx.send(true);

        let pollers: Vec<CancellationToken> =
            self.inner.pollers.lock().drain().map(|(_, t)| t).collect();
        for token in pollers {
            token.cancel();
        }

        self.inner.transport.shutdown().await;
    }

    // ---- periodic tasks ----------------------------------------------------

    async fn command_loop(
        inner: Arc<ServiceInner>,
        mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    ) {
        let mut shutdown = inner.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(FeedCommand::Start(key)) => {
                            debug!(?key, "Topic activated");
                            Self::populate(&inner, &key).await;
                            Self::maybe_spawn_poller(&inner, key);
                        }
                        Some(FeedCommand::Stop(key)) => {
                            debug!(?key, "Topic deactivated");
                            Self::cancel_poller(&inner, &key);
                            inner.push_seen.lock().remove(&key);
                        }
                        None => return,
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn tick_driver(inner: Arc<ServiceInner>) {
        let mut shutdown = inner.shutdown_tx.subscribe();
        let mut timer =
            tokio::time::interval(Duration::from_millis(inner.config.simulation.tick_interval_ms));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    Self::run_tick(&inner).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn run_tick(inner: &Arc<ServiceInner>) {
        let now = Utc::now();
        let feed = inner.feed.read().clone();
        let quotes = feed.tick(now).await;

        let push_active = inner.config.transport.push_enabled
            && inner.transport.state() == TransportState::Connected;

        for quote in quotes {
            inner.quote_cache.set(quote_key(&quote.symbol), quote.clone());

            let key = TopicKey::quotes(&quote.symbol);
            if inner.hub.is_active(&key) && push_active {
                inner.hub.publish(&MarketUpdate::Quote(quote));
                Self::mark_push_seen(inner, key);
            }
        }

        // Rebuild chains for every active chain topic off the same tick
        for key in inner.hub.active_topics() {
            if key.kind != TopicKind::Chain {
                continue;
            }
            if let Some(chain) = feed.option_chain(&key.symbol, now).await {
                inner
                    .chain_cache
                    .set(chain_key(&key.symbol), chain.clone());
                if push_active {
                    inner.hub.publish(&MarketUpdate::Chain(chain));
                    Self::mark_push_seen(inner, key);
                }
            }
        }
    }

    /// First push delivery for a topic supersedes its polling fallback
    fn mark_push_seen(inner: &Arc<ServiceInner>, key: TopicKey) {
        if inner.push_seen.lock().insert(key.clone()) {
            Self::cancel_poller(inner, &key);
        }
    }

    async fn sweep_loop(inner: Arc<ServiceInner>) {
        let mut shutdown = inner.shutdown_tx.subscribe();
        let mut timer =
            tokio::time::interval(Duration::from_millis(inner.config.cache.sweep_interval_ms));
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let removed = inner.quote_cache.sweep() + inner.chain_cache.sweep();
                    if removed > 0 {
                        debug!(removed, "Cache sweep complete");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// Re-arms polling fallbacks whenever the transport leaves
    /// `Connected`
    async fn transport_watcher(inner: Arc<ServiceInner>) {
        let mut shutdown = inner.shutdown_tx.subscribe();
        let mut state_rx = inner.transport.watch_state();

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let state = *state_rx.borrow();
                    if state != TransportState::Connected {
                        inner.push_seen.lock().clear();
                        for key in inner.hub.active_topics() {
                            Self::maybe_spawn_poller(&inner, key);
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    // ---- helpers -----------------------------------------------------------

    /// Seed the cache for a newly activated topic
    async fn populate(inner: &Arc<ServiceInner>, key: &TopicKey) {
        let feed = inner.feed.read().clone();
        match key.kind {
            TopicKind::Quotes => {
                if !inner.quote_cache.has(&quote_key(&key.symbol)) {
                    if let Some(quote) = feed.latest_quote(&key.symbol).await {
                        inner.quote_cache.set(quote_key(&key.symbol), quote);
                    }
                }
            }
            TopicKind::Chain => {
                if !inner.chain_cache.has(&chain_key(&key.symbol)) {
                    if let Some(chain) = feed.option_chain(&key.symbol, Utc::now()).await {
                        inner.chain_cache.set(chain_key(&key.symbol), chain);
                    }
                }
            }
        }
    }

    /// Whether this topic needs a polling fallback right now
    fn should_poll(inner: &Arc<ServiceInner>, key: &TopicKey) -> bool {
        let transport_cfg = &inner.config.transport;
        if !transport_cfg.push_enabled {
            // Polling is the sole delivery mode
            return transport_cfg.fallback_to_polling;
        }
        if !transport_cfg.fallback_to_polling {
            return false;
        }
        // Push is enabled: poll until this topic has actually seen a
        // push update on the current connection
        !inner.push_seen.lock().contains(key)
    }

    fn maybe_spawn_poller(inner: &Arc<ServiceInner>, key: TopicKey) {
        if *inner.shutdown_tx.borrow() || !Self::should_poll(inner, &key) {
            return;
        }

        let mut pollers = inner.pollers.lock();
        if pollers.contains_key(&key) {
            return;
        }

        let token = CancellationToken::new();
        pollers.insert(key.clone(), token.clone());
        drop(pollers);

        debug!(?key, "Starting polling fallback");
        tokio::spawn(Self::poll_loop(inner.clone(), key, token));
    }

    fn cancel_poller(inner: &Arc<ServiceInner>, key: &TopicKey) {
        if let Some(token) = inner.pollers.lock().remove(key) {
            debug!(?key, "Cancelling polling fallback");
            token.cancel();
        }
    }

    async fn poll_loop(inner: Arc<ServiceInner>, key: TopicKey, token: CancellationToken) {
        let mut shutdown = inner.shutdown_tx.subscribe();
        let mut timer =
            tokio::time::interval(Duration::from_millis(inner.config.transport.poll_interval_ms));
        timer.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = timer.tick() => {
                    if !inner.hub.is_active(&key) {
                        inner.pollers.lock().remove(&key);
                        return;
                    }
                    let feed = inner.feed.read().clone();
                    match key.kind {
                        TopicKind::Quotes => {
                            if let Some(quote) = feed.latest_quote(&key.symbol).await {
                                inner.quote_cache.set(quote_key(&key.symbol), quote.clone());
                                inner.hub.publish(&MarketUpdate::Quote(quote));
                            }
                        }
                        TopicKind::Chain => {
                            if let Some(chain) = feed.option_chain(&key.symbol, Utc::now()).await {
                                inner.chain_cache.set(chain_key(&key.symbol), chain.clone());
                                inner.hub.publish(&MarketUpdate::Chain(chain));
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::parser::generate_default_config;
    use config::EngineMeta;

    /// Always-open session so tests are independent of wall-clock time
    fn test_config() -> EngineConfig {
        let mut config = generate_default_config();
        config.engine = EngineMeta {
            name: "test".to_string(),
            version: "0.0.0".to_string(),
            mode: Mode::Demo,
        };
        config.market_hours.open = "00:00".to_string();
        config.market_hours.close = "23:59".to_string();
        config.market_hours.timezone_offset_minutes = 0;
        config.market_hours.weekends_closed = false;
        config.simulation.tick_interval_ms = 100;
        config.transport.poll_interval_ms = 500;
        config
    }

    fn live_adapter(config: &EngineConfig) -> Arc<SimulatedFeed> {
        Arc::new(SimulatedFeed::new(
            config.instruments.clone(),
            config.simulation.clone(),
            &config.market_hours,
            config.chain.clone(),
            Mode::Live,
        ))
    }

    async fn next_quote(rx: &mut mpsc::UnboundedReceiver<MarketUpdate>) -> InstrumentQuote {
        loop {
            match rx.recv().await.expect("channel open") {
                MarketUpdate::Quote(q) => return q,
                MarketUpdate::Chain(_) => continue,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_receives_push_updates() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let (_id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);

        let quote = next_quote(&mut rx).await;
        assert_eq!(quote.symbol, "NIFTY");
        assert!(quote.price > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_price_serves_cache_only() {
        let service = MarketDataService::new(test_config());
        // Not started: no ticks have run, nothing cached
        assert!(service.current_price("NIFTY").is_none());

        service.start().await;
        let (_id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);
        next_quote(&mut rx).await;

        let quote = service.current_price("NIFTY").expect("cached after tick");
        assert_eq!(quote.symbol, "NIFTY");
        assert!(service.current_price("UNKNOWN").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_option_chain_subscription() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let (_id, mut rx) = service.subscribe_to_option_chain("NIFTY");

        let update = rx.recv().await.expect("channel open");
        let MarketUpdate::Chain(chain) = update else {
            panic!("expected chain update");
        };
        assert_eq!(chain.underlying, "NIFTY");
        assert!(!chain.strikes.is_empty());

        let cached = service
            .current_option_chain("NIFTY")
            .expect("chain cached");
        assert_eq!(cached.underlying, "NIFTY");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_delivery_and_pollers() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let (id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);
        next_quote(&mut rx).await;

        assert!(service.unsubscribe(id));
        // Give the command loop a chance to tear the topic down
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(service.inner.pollers.lock().is_empty());
        assert!(!service.inner.hub.is_active(&TopicKey::quotes("NIFTY")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_fallback_when_push_disabled() {
        let mut config = test_config();
        config.transport.push_enabled = false;
        let service = MarketDataService::new(config);
        service.start().await;

        let (_id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);

        // Push never delivers; the poller must
        let quote = next_quote(&mut rx).await;
        assert_eq!(quote.symbol, "NIFTY");
        assert!(!service.inner.pollers.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_update_cancels_poller() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let (_id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);
        next_quote(&mut rx).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Push is flowing, so the fallback has been cancelled
        assert!(service.inner.pollers.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_preserves_subscription() {
        let config = test_config();
        let service = MarketDataService::new(config.clone());
        service.register_live_feed(live_adapter(&config));
        service.start().await;

        let (id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);
        next_quote(&mut rx).await;

        service.switch_mode(Mode::Live).await.expect("switch works");
        assert_eq!(service.mode(), Mode::Live);

        // Same id, same receiver, updates keep flowing
        let quote = next_quote(&mut rx).await;
        assert_eq!(quote.symbol, "NIFTY");
        assert!(service.unsubscribe(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_live_without_adapter_fails() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let err = service.switch_mode(Mode::Live).await.unwrap_err();
        assert_matches::assert_matches!(err, MarketDataError::NoFeedForMode(_));
        assert_eq!(service.mode(), Mode::Demo);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticks() {
        let service = MarketDataService::new(test_config());
        service.start().await;

        let (_id, mut rx) = service.subscribe_to_prices(vec!["NIFTY".to_string()]);
        next_quote(&mut rx).await;

        service.shutdown().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Drain anything that was in flight, then expect silence
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_status_surface() {
        let service = MarketDataService::new(test_config());
        let mut status = service.watch_connection_status();
        assert_eq!(*status.borrow(), TransportState::Disconnected);

        service.start().await;
        status
            .wait_for(|s| *s == TransportState::Connected)
            .await
            .expect("channel open");
        assert_eq!(service.connection_status(), TransportState::Connected);
    }
}
