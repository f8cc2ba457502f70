use std::collections::HashMap;

use alloy_dyn_abi::{DynSolEvent, Specifier};
use alloy_json_abi::{Event, EventParam};
use alloy_primitives::B256;

// ---------------------------------------------------------------------------
// Declarative event table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MarketCreated,
    SharesBought,
    SharesSold,
    Comment,
    Danmaku,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::MarketCreated,
        EventKind::SharesBought,
        EventKind::SharesSold,
        EventKind::Comment,
        EventKind::Danmaku,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::MarketCreated => "MarketCreated",
            EventKind::SharesBought => "SharesBought",
            EventKind::SharesSold => "SharesSold",
            EventKind::Comment => "Comment",
            EventKind::Danmaku => "Danmaku",
        }
    }

    /// Solidity declaration, argument order as emitted by the contract.
    fn declaration(self) -> &'static str {
        match self {
            EventKind::MarketCreated => {
                "event MarketCreated(uint256 indexed marketId, address indexed creator, string question, \
                 uint256 endTime, uint256 initialYesPred, uint256 initialNoPred)"
            }
            EventKind::SharesBought => {
                "event SharesBought(uint256 indexed marketId, address indexed user, bool isYes, \
                 uint256 predIn, uint256 sharesOut)"
            }
            EventKind::SharesSold => {
                "event SharesSold(uint256 indexed marketId, address indexed user, bool isYes, \
                 uint256 sharesIn, uint256 predOut)"
            }
            EventKind::Comment => "event Comment(uint256 indexed marketId, address indexed user, string content)",
            EventKind::Danmaku => "event Danmaku(uint256 indexed marketId, address indexed user, string content)",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// EventSchema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EventSchema {
    pub kind: EventKind,
    /// Parsed declaration: parameter names, types and `indexed` flags.
    pub abi: Event,
    /// Resolved topic and payload types, used to decode logs.
    pub decoder: DynSolEvent,
    /// keccak256 of the canonical signature; matched against topics[0].
    pub signature: B256,
}

impl EventSchema {
    fn new(kind: EventKind) -> Result<Self, alloy_dyn_abi::Error> {
        let abi = Event::parse(kind.declaration())?;
        let decoder: DynSolEvent = abi.resolve()?;
        let signature = abi.selector();
        Ok(Self { kind, abi, decoder, signature })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// e.g. `Comment(uint256,address,string)`
    pub fn canonical_signature(&self) -> String {
        self.abi.signature()
    }

    /// Indexed arguments, in the order their values appear in topics[1..].
    pub fn indexed(&self) -> impl Iterator<Item = &EventParam> {
        self.abi.inputs.iter().filter(|p| p.indexed)
    }

    /// Non-indexed arguments, in payload order.
    pub fn payload(&self) -> impl Iterator<Item = &EventParam> {
        self.abi.inputs.iter().filter(|p| !p.indexed)
    }
}

// ---------------------------------------------------------------------------
// EventRegistry
// ---------------------------------------------------------------------------

/// Immutable signature → schema table. Built once at startup, then only read,
/// so it is shared across tasks behind a plain `Arc` with no locking.
#[derive(Debug)]
pub struct EventRegistry {
    by_signature: HashMap<B256, EventSchema>,
    by_kind: HashMap<EventKind, B256>,
}

impl EventRegistry {
    /// The PredictionMarket contract's five events.
    pub fn prediction_market() -> Result<Self, alloy_dyn_abi::Error> {
        Self::from_kinds(&EventKind::ALL)
    }

    fn from_kinds(kinds: &[EventKind]) -> Result<Self, alloy_dyn_abi::Error> {
        let mut by_signature = HashMap::with_capacity(kinds.len());
        let mut by_kind = HashMap::with_capacity(kinds.len());
        for &kind in kinds {
            let schema = EventSchema::new(kind)?;
            by_kind.insert(kind, schema.signature);
            by_signature.insert(schema.signature, schema);
        }
        Ok(Self { by_signature, by_kind })
    }

    pub fn lookup(&self, signature: &B256) -> Option<&EventSchema> {
        self.by_signature.get(signature)
    }

    pub fn schema(&self, kind: EventKind) -> Option<&EventSchema> {
        self.by_kind.get(&kind).and_then(|sig| self.by_signature.get(sig))
    }

    pub fn signature_of(&self, kind: EventKind) -> Option<B256> {
        self.by_kind.get(&kind).copied()
    }

    /// Names of `kind`'s indexed arguments in topic order. Empty if `kind` is not registered.
    pub fn indexed_arguments(&self, kind: EventKind) -> Vec<&str> {
        self.schema(kind)
            .map(|s| s.indexed().map(|p| p.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_signature.len()
    }
}
