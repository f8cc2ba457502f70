use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// MarketId
// ---------------------------------------------------------------------------

/// Market identifier in canonical decimal form (no sign, no leading zeros).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    /// Parses a decimal market id, canonicalizing it: `"007"` → `"7"`.
    /// Returns None for anything that is not a non-negative decimal integer.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(raw, 10).ok().map(Self::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<U256> for MarketId {
    fn from(value: U256) -> Self {
        Self(value.to_string())
    }
}

/// Numeric order: canonical ids compare by length first, then digit by digit.
impl Ord for MarketId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (a, b) = (self.as_str(), other.as_str());
        (a.len(), a).cmp(&(b.len(), b))
    }
}

impl PartialOrd for MarketId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw log record, as delivered by the log source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// topics[0] is the event signature; the rest are indexed argument values.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Bytes,
    pub tx_hash: B256,
    pub block_number: u64,
    /// Wall-clock time the source received this record.
    pub observed_at: DateTime<Utc>,
}

impl RawLog {
    pub fn signature(&self) -> Option<&B256> {
        self.topics.first()
    }

    pub fn indexed_topics(&self) -> &[B256] {
        self.topics.get(1..).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Typed events
// ---------------------------------------------------------------------------

/// Fields every decoded event carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub tx_id: B256,
    pub block_number: u64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCreated {
    pub market_id: MarketId,
    #[serde(serialize_with = "checksummed")]
    pub creator: Address,
    pub question: String,
    #[serde(serialize_with = "decimal")]
    pub end_time: U256,
    #[serde(serialize_with = "decimal")]
    pub initial_yes_odds: U256,
    #[serde(serialize_with = "decimal")]
    pub initial_no_odds: U256,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn from_is_yes(is_yes: bool) -> Self {
        if is_yes {
            Side::Yes
        } else {
            Side::No
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

/// Direction-specific amounts of a trade. A buy never carries sell amounts and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fill {
    Buy {
        #[serde(rename = "predIn", serialize_with = "decimal")]
        pred_in: U256,
        #[serde(rename = "sharesOut", serialize_with = "decimal")]
        shares_out: U256,
    },
    Sell {
        #[serde(rename = "sharesIn", serialize_with = "decimal")]
        shares_in: U256,
        #[serde(rename = "predOut", serialize_with = "decimal")]
        pred_out: U256,
    },
}

impl Fill {
    pub fn direction(&self) -> &'static str {
        match self {
            Fill::Buy { .. } => "buy",
            Fill::Sell { .. } => "sell",
        }
    }

    pub fn amount_in(&self) -> U256 {
        match self {
            Fill::Buy { pred_in, .. } => *pred_in,
            Fill::Sell { shares_in, .. } => *shares_in,
        }
    }

    pub fn amount_out(&self) -> U256 {
        match self {
            Fill::Buy { shares_out, .. } => *shares_out,
            Fill::Sell { pred_out, .. } => *pred_out,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(flatten)]
    pub fill: Fill,
    pub market_id: MarketId,
    #[serde(serialize_with = "checksummed")]
    pub user: Address,
    pub side: Side,
    #[serde(flatten)]
    pub meta: EventMeta,
}

/// A comment or a danmaku; both share this shape but live on separate timelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPost {
    pub market_id: MarketId,
    #[serde(serialize_with = "checksummed")]
    pub user: Address,
    pub text: String,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MarketCreated(MarketCreated),
    SharesTraded(Trade),
    Comment(TextPost),
    Danmaku(TextPost),
}

impl Event {
    pub fn market_id(&self) -> &MarketId {
        match self {
            Event::MarketCreated(e) => &e.market_id,
            Event::SharesTraded(t) => &t.market_id,
            Event::Comment(p) | Event::Danmaku(p) => &p.market_id,
        }
    }

    pub fn meta(&self) -> &EventMeta {
        match self {
            Event::MarketCreated(e) => &e.meta,
            Event::SharesTraded(t) => &t.meta,
            Event::Comment(p) | Event::Danmaku(p) => &p.meta,
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// uint256 values go out as decimal strings so clients never lose precision.
fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn checksummed<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}
