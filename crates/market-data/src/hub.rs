//! Subscription hub: topic-keyed fanout to channel consumers.
//!
//! Each subscription is a channel consumer rather than a callback, so
//! delivery is safe under concurrent subscribe/unsubscribe. The hub
//! tracks a refcount per topic and tells the orchestrator when a
//! topic's upstream feed should start (first subscriber) or stop
//! (last unsubscribe).

use common::{InstrumentQuote, OptionChain};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Kind of data a topic carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    Quotes,
    Chain,
}

/// One upstream feed per (kind, symbol)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub kind: TopicKind,
    pub symbol: String,
}

impl TopicKey {
    pub fn quotes(symbol: impl Into<String>) -> Self {
        Self {
            kind: TopicKind::Quotes,
            symbol: symbol.into(),
        }
    }

    pub fn chain(symbol: impl Into<String>) -> Self {
        Self {
            kind: TopicKind::Chain,
            symbol: symbol.into(),
        }
    }
}

/// A single update fanned out to subscribers
#[derive(Debug, Clone)]
pub enum MarketUpdate {
    Quote(InstrumentQuote),
    Chain(OptionChain),
}

impl MarketUpdate {
    pub fn symbol(&self) -> &str {
        match self {
            MarketUpdate::Quote(q) => &q.symbol,
            MarketUpdate::Chain(c) => &c.underlying,
        }
    }

    pub fn kind(&self) -> TopicKind {
        match self {
            MarketUpdate::Quote(_) => TopicKind::Quotes,
            MarketUpdate::Chain(_) => TopicKind::Chain,
        }
    }
}

/// Instruction to the orchestrator about a topic's upstream feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Start(TopicKey),
    Stop(TopicKey),
}

pub type SubscriptionId = Uuid;

struct SubEntry {
    kind: TopicKind,
    symbols: HashSet<String>,
    tx: mpsc::UnboundedSender<MarketUpdate>,
}

struct HubInner {
    subscriptions: HashMap<SubscriptionId, SubEntry>,
    refcounts: HashMap<TopicKey, usize>,
}

/// Topic-keyed fanout with per-topic upstream refcounting.
///
/// All mutations to the subscriber set are serialized behind one lock;
/// update rates are low enough (about one tick per second per
/// instrument) that contention is a non-issue.
pub struct SubscriptionHub {
    inner: Mutex<HubInner>,
    commands: mpsc::UnboundedSender<FeedCommand>,
}

impl SubscriptionHub {
    /// Returns the hub and the command stream the orchestrator drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FeedCommand>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Mutex::new(HubInner {
                    subscriptions: HashMap::new(),
                    refcounts: HashMap::new(),
                }),
                commands,
            },
            command_rx,
        )
    }

    /// Register a consumer for `symbols` under the given topic kind.
    ///
    /// Emits `FeedCommand::Start` for every symbol going from zero to
    /// one subscriber.
    pub fn subscribe(
        &self,
        kind: TopicKind,
        symbols: Vec<String>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<MarketUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let symbols: HashSet<String> = symbols.into_iter().collect();

        let mut inner = self.inner.lock();
        for symbol in &symbols {
            let key = TopicKey {
                kind,
                symbol: symbol.clone(),
            };
            let count = inner.refcounts.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                debug!(?key, "First subscriber, starting upstream feed");
                let _ = self.commands.send(FeedCommand::Start(key));
            }
        }
        inner
            .subscriptions
            .insert(id, SubEntry { kind, symbols, tx });

        (id, rx)
    }

    /// Remove a subscription. Emits `FeedCommand::Stop` for every
    /// symbol whose refcount reaches zero. Returns false for unknown
    /// ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.subscriptions.remove(&id) else {
            return false;
        };
        Self::release_topics(&mut inner, entry.kind, &entry.symbols, &self.commands);
        true
    }

    fn release_topics(
        inner: &mut HubInner,
        kind: TopicKind,
        symbols: &HashSet<String>,
        commands: &mpsc::UnboundedSender<FeedCommand>,
    ) {
        for symbol in symbols {
            let key = TopicKey {
                kind,
                symbol: symbol.clone(),
            };
            if let Some(count) = inner.refcounts.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    inner.refcounts.remove(&key);
                    debug!(?key, "Last subscriber gone, stopping upstream feed");
                    let _ = commands.send(FeedCommand::Stop(key));
                }
            }
        }
    }

    /// Fan an update out to every subscription whose symbol set
    /// contains the update's symbol.
    ///
    /// Consumers whose channel has closed are logged, dropped, and
    /// never block delivery to the others. Returns how many consumers
    /// received the update.
    pub fn publish(&self, update: &MarketUpdate) -> usize {
        let kind = update.kind();
        let symbol = update.symbol();

        let mut inner = self.inner.lock();
        let mut delivered = 0;
        let mut dead: Vec<SubscriptionId> = Vec::new();

        for (id, entry) in &inner.subscriptions {
            if entry.kind != kind || !entry.symbols.contains(symbol) {
                continue;
            }
            if entry.tx.send(update.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!(subscription = %id, symbol, "Consumer channel closed, dropping subscription");
                dead.push(*id);
            }
        }

        for id in dead {
            if let Some(entry) = inner.subscriptions.remove(&id) {
                Self::release_topics(&mut inner, entry.kind, &entry.symbols, &self.commands);
            }
        }

        delivered
    }

    /// Whether any subscription is active for this topic
    pub fn is_active(&self, key: &TopicKey) -> bool {
        self.inner.lock().refcounts.contains_key(key)
    }

    /// Every topic with at least one subscriber
    pub fn active_topics(&self) -> Vec<TopicKey> {
        self.inner.lock().refcounts.keys().cloned().collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(symbol: &str, price: f64) -> MarketUpdate {
        MarketUpdate::Quote(InstrumentQuote {
            symbol: symbol.to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            volume: 1000,
            bid: price - 0.05,
            ask: price + 0.05,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_subscribe_starts_feed_once() {
        let (hub, mut commands) = SubscriptionHub::new();

        let (_a, _rx_a) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);
        let (_b, _rx_b) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);

        assert_eq!(
            commands.try_recv().ok(),
            Some(FeedCommand::Start(TopicKey::quotes("NIFTY")))
        );
        // Second subscriber does not restart the feed
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn test_last_unsubscribe_stops_feed() {
        let (hub, mut commands) = SubscriptionHub::new();

        let (a, _rx_a) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);
        let (b, _rx_b) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);
        let _ = commands.try_recv();

        assert!(hub.unsubscribe(a));
        assert!(commands.try_recv().is_err());

        assert!(hub.unsubscribe(b));
        assert_eq!(
            commands.try_recv().ok(),
            Some(FeedCommand::Stop(TopicKey::quotes("NIFTY")))
        );
        assert!(!hub.is_active(&TopicKey::quotes("NIFTY")));
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let (hub, _commands) = SubscriptionHub::new();
        assert!(!hub.unsubscribe(Uuid::new_v4()));
    }

    #[test]
    fn test_publish_filters_by_symbol_and_kind() {
        let (hub, _commands) = SubscriptionHub::new();

        let (_a, mut rx_nifty) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);
        let (_b, mut rx_bank) = hub.subscribe(TopicKind::Quotes, vec!["BANKNIFTY".to_string()]);
        let (_c, mut rx_chain) = hub.subscribe(TopicKind::Chain, vec!["NIFTY".to_string()]);

        let delivered = hub.publish(&quote("NIFTY", 19500.0));
        assert_eq!(delivered, 1);

        assert!(rx_nifty.try_recv().is_ok());
        assert!(rx_bank.try_recv().is_err());
        assert!(rx_chain.try_recv().is_err());
    }

    #[test]
    fn test_closed_consumer_does_not_block_others() {
        let (hub, _commands) = SubscriptionHub::new();

        let (_a, rx_broken) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);
        let (_b, mut rx_ok) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);

        // A consumer that dropped its receiver simulates a broken callback
        drop(rx_broken);

        let delivered = hub.publish(&quote("NIFTY", 19500.0));
        assert_eq!(delivered, 1);
        assert!(rx_ok.try_recv().is_ok());

        // The broken subscription was removed; the healthy one remains
        assert_eq!(hub.subscription_count(), 1);

        let delivered = hub.publish(&quote("NIFTY", 19510.0));
        assert_eq!(delivered, 1);
        assert!(rx_ok.try_recv().is_ok());
    }

    #[test]
    fn test_unsubscribed_consumer_receives_nothing_further() {
        let (hub, _commands) = SubscriptionHub::new();
        let (id, mut rx) = hub.subscribe(TopicKind::Quotes, vec!["NIFTY".to_string()]);

        hub.publish(&quote("NIFTY", 19500.0));
        assert!(rx.try_recv().is_ok());

        hub.unsubscribe(id);
        hub.publish(&quote("NIFTY", 19510.0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_multi_symbol_subscription_refcounts() {
        let (hub, mut commands) = SubscriptionHub::new();
        let (id, _rx) = hub.subscribe(
            TopicKind::Quotes,
            vec!["NIFTY".to_string(), "BANKNIFTY".to_string()],
        );

        let mut started = HashSet::new();
        while let Ok(FeedCommand::Start(key)) = commands.try_recv() {
            started.insert(key.symbol);
        }
        assert!(started.contains("NIFTY"));
        assert!(started.contains("BANKNIFTY"));

        hub.unsubscribe(id);
        let mut stopped = 0;
        while let Ok(FeedCommand::Stop(_)) = commands.try_recv() {
            stopped += 1;
        }
        assert_eq!(stopped, 2);
    }
}
