use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::types::{Event, MarketCreated, MarketId, TextPost, Trade};

// ---------------------------------------------------------------------------
// MarketAggregate: everything folded so far for one market id
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MarketAggregate {
    /// Last MarketCreated seen; a later one overwrites it.
    created: Option<MarketCreated>,
    /// Append-only, in arrival order.
    trades: Vec<Trade>,
    comments: Vec<TextPost>,
    danmaku: Vec<TextPost>,
}

impl MarketAggregate {
    fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            created: self.created.clone(),
            comments: self.comments.clone(),
            danmaku: self.danmaku.clone(),
            trades: self.trades.clone(),
        }
    }
}

/// Deep copy of one market's state. Later folds never show through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<MarketCreated>,
    pub comments: Vec<TextPost>,
    pub danmaku: Vec<TextPost>,
    pub trades: Vec<Trade>,
}

// ---------------------------------------------------------------------------
// MarketStore
// ---------------------------------------------------------------------------

/// market_id → aggregate. Each fold runs under the owning shard's write lock
/// and each read under its read lock, so a reader sees an event entirely or not at all.
pub struct MarketStore {
    markets: DashMap<MarketId, MarketAggregate>,
}

impl MarketStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Applies one decoded event to its market, creating the aggregate on first sight.
    pub fn fold(&self, event: Event) {
        match event {
            Event::MarketCreated(e) => self.fold_market_created(e),
            Event::SharesTraded(t) => self.fold_trade(t),
            Event::Comment(p) => self.fold_comment(p),
            Event::Danmaku(p) => self.fold_danmaku(p),
        }
    }

    /// Last write wins: a repeated MarketCreated replaces the previous one.
    pub fn fold_market_created(&self, event: MarketCreated) {
        let market_id = event.market_id.clone();
        let replaced = self
            .markets
            .entry(market_id.clone())
            .or_default()
            .created
            .replace(event)
            .is_some();
        if replaced {
            debug!(market_id = %market_id, "MarketCreated replaced an earlier creation record");
        }
    }

    pub fn fold_trade(&self, trade: Trade) {
        self.markets
            .entry(trade.market_id.clone())
            .or_default()
            .trades
            .push(trade);
    }

    pub fn fold_comment(&self, post: TextPost) {
        self.markets
            .entry(post.market_id.clone())
            .or_default()
            .comments
            .push(post);
    }

    pub fn fold_danmaku(&self, post: TextPost) {
        self.markets
            .entry(post.market_id.clone())
            .or_default()
            .danmaku
            .push(post);
    }

    /// Current state of `market_id`. An unseen id yields an empty snapshot.
    pub fn snapshot(&self, market_id: &MarketId) -> MarketSnapshot {
        self.markets
            .get(market_id)
            .map(|agg| agg.snapshot())
            .unwrap_or_default()
    }

    pub fn created(&self, market_id: &MarketId) -> Option<MarketCreated> {
        self.markets.get(market_id)?.created.clone()
    }

    /// Every creation record currently held, in no particular order.
    pub fn list_created(&self) -> Vec<MarketCreated> {
        self.markets
            .iter()
            .filter_map(|entry| entry.value().created.clone())
            .collect()
    }

    /// Number of market ids that have received any event.
    pub fn market_count(&self) -> usize {
        self.markets.len()
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self {
            markets: DashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{decode, test_logs, EventRegistry};
    use crate::types::{EventMeta, Fill, Side};
    use alloy_primitives::{Address, B256, U256};

    fn id(raw: &str) -> MarketId {
        MarketId::parse(raw).unwrap()
    }

    fn meta() -> EventMeta {
        EventMeta {
            tx_id: B256::repeat_byte(0x11),
            block_number: 7,
            observed_at: test_logs::observed_at(),
        }
    }

    fn trade(market: &str, n: u64) -> Trade {
        Trade {
            fill: Fill::Buy { pred_in: U256::from(n), shares_out: U256::from(n) },
            market_id: id(market),
            user: Address::repeat_byte(0xde),
            side: Side::Yes,
            meta: meta(),
        }
    }

    fn post(market: &str, text: &str) -> TextPost {
        TextPost {
            market_id: id(market),
            user: Address::repeat_byte(0x01),
            text: text.to_string(),
            meta: meta(),
        }
    }

    fn created(market: &str, question: &str) -> MarketCreated {
        MarketCreated {
            market_id: id(market),
            creator: Address::repeat_byte(0xab),
            question: question.to_string(),
            end_time: U256::from(100u64),
            initial_yes_odds: U256::from(50u64),
            initial_no_odds: U256::from(50u64),
            meta: meta(),
        }
    }

    #[test]
    fn created_then_buy_scenario() {
        let reg = EventRegistry::prediction_market().unwrap();
        let store = MarketStore::new();
        let creator = Address::repeat_byte(0xab);
        let user = Address::repeat_byte(0xde);

        store.fold(decode(&reg, &test_logs::market_created(&reg, 1, creator, "Will it rain?", 100, 50, 50)).unwrap());
        store.fold(decode(&reg, &test_logs::shares_bought(&reg, 1, user, true, 10, 9)).unwrap());

        let snap = store.snapshot(&id("1"));
        let created = snap.created.expect("created populated");
        assert_eq!(created.question, "Will it rain?");
        assert_eq!(created.creator, creator);
        assert_eq!(snap.trades.len(), 1);
        assert_eq!(snap.trades[0].user, user);
        assert_eq!(snap.trades[0].side, Side::Yes);
        assert_eq!(
            snap.trades[0].fill,
            Fill::Buy { pred_in: U256::from(10u64), shares_out: U256::from(9u64) }
        );
        assert!(snap.comments.is_empty());
        assert!(snap.danmaku.is_empty());

        let unseen = store.snapshot(&id("2"));
        assert_eq!(unseen, MarketSnapshot::default());
    }

    #[test]
    fn duplicate_creation_last_write_wins() {
        let store = MarketStore::new();
        store.fold_market_created(created("1", "first?"));
        store.fold_market_created(created("1", "second?"));

        assert_eq!(store.snapshot(&id("1")).created.unwrap().question, "second?");
        assert_eq!(store.list_created().len(), 1);
    }

    #[test]
    fn sequences_keep_arrival_order() {
        let store = MarketStore::new();
        store.fold_trade(trade("1", 3));
        store.fold_comment(post("1", "a"));
        store.fold_trade(trade("1", 1));
        store.fold_danmaku(post("1", "x"));
        store.fold_comment(post("1", "b"));
        store.fold_trade(trade("1", 2));

        let snap = store.snapshot(&id("1"));
        let amounts: Vec<U256> = snap.trades.iter().map(|t| t.fill.amount_in()).collect();
        assert_eq!(amounts, vec![U256::from(3u64), U256::from(1u64), U256::from(2u64)]);
        let comments: Vec<&str> = snap.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(comments, vec!["a", "b"]);
        assert_eq!(snap.danmaku.len(), 1);
    }

    #[test]
    fn duplicate_tx_ids_are_not_deduplicated() {
        let store = MarketStore::new();
        store.fold_comment(post("1", "same"));
        store.fold_comment(post("1", "same"));
        assert_eq!(store.snapshot(&id("1")).comments.len(), 2);
    }

    #[test]
    fn activity_without_creation_is_kept() {
        let store = MarketStore::new();
        store.fold_danmaku(post("9", "hello"));

        let snap = store.snapshot(&id("9"));
        assert!(snap.created.is_none());
        assert_eq!(snap.danmaku.len(), 1);
        assert!(store.list_created().is_empty());
        assert!(store.created(&id("9")).is_none());
        assert_eq!(store.market_count(), 1);
    }

    #[test]
    fn markets_do_not_bleed_into_each_other() {
        let store = MarketStore::new();
        store.fold_trade(trade("1", 1));
        store.fold_comment(post("2", "other"));

        assert_eq!(store.snapshot(&id("1")).comments.len(), 0);
        assert_eq!(store.snapshot(&id("2")).trades.len(), 0);
    }

    #[test]
    fn snapshot_is_detached_from_later_folds() {
        let store = MarketStore::new();
        store.fold_market_created(created("1", "before"));
        store.fold_trade(trade("1", 1));
        let snap = store.snapshot(&id("1"));

        store.fold_market_created(created("1", "after"));
        store.fold_trade(trade("1", 2));

        assert_eq!(snap.created.as_ref().unwrap().question, "before");
        assert_eq!(snap.trades.len(), 1);
        assert_eq!(store.snapshot(&id("1")).trades.len(), 2);
    }

    #[test]
    fn list_created_returns_every_created_market() {
        let store = MarketStore::new();
        store.fold_market_created(created("1", "a"));
        store.fold_market_created(created("2", "b"));
        store.fold_comment(post("3", "no creation"));

        let mut ids: Vec<String> = store.list_created().into_iter().map(|c| c.market_id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn concurrent_readers_never_see_partial_appends() {
        const N: u64 = 500;
        let store = MarketStore::new();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..N {
                    store.fold_trade(trade("1", n));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut last_len = 0;
                    loop {
                        let snap = store.snapshot(&id("1"));
                        // Every snapshot is a complete prefix of the write sequence.
                        for (i, t) in snap.trades.iter().enumerate() {
                            assert_eq!(t.fill.amount_in(), U256::from(i as u64));
                        }
                        assert!(snap.trades.len() >= last_len);
                        last_len = snap.trades.len();
                        if last_len as u64 == N {
                            break;
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
