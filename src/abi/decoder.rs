//! Raw log → typed [`Event`].
//!
//! Topics and payload are decoded by the schema's resolved [`DynSolEvent`]:
//! `topics[1..]` zip positionally with the indexed parameters, and the data
//! is the standard ABI encoding of the non-indexed ones. Decoded values are
//! then matched to their declared names and assembled into the domain type.

use alloy_dyn_abi::{DecodedEvent, DynSolEvent, DynSolValue};
use alloy_primitives::{Address, U256};

use crate::abi::registry::{EventKind, EventRegistry, EventSchema};
use crate::error::DecodeError;
use crate::types::{Event, EventMeta, Fill, MarketCreated, MarketId, RawLog, Side, TextPost, Trade};

/// Decodes one raw log. Pure: the same record always yields the same result.
pub fn decode(registry: &EventRegistry, log: &RawLog) -> Result<Event, DecodeError> {
    let signature = log.signature().ok_or(DecodeError::MissingSignature)?;
    let schema = registry
        .lookup(signature)
        .ok_or(DecodeError::UnknownEvent(*signature))?;

    let decoded = decode_parts(schema.name(), &schema.decoder, log)?;
    let meta = EventMeta {
        tx_id: log.tx_hash,
        block_number: log.block_number,
        observed_at: log.observed_at,
    };
    assemble(schema, Args::new(schema, decoded), meta)
}

/// Validating decode: topic count and topics[0] are checked before the payload is read.
fn decode_parts(event: &'static str, decoder: &DynSolEvent, log: &RawLog) -> Result<DecodedEvent, DecodeError> {
    decoder
        .decode_log_parts(log.topics.iter().copied(), &log.data, true)
        .map_err(|e| match e {
            alloy_dyn_abi::Error::TopicLengthMismatch { .. }
            | alloy_dyn_abi::Error::EventSignatureMismatch { .. } => DecodeError::TopicDecode {
                event,
                reason: e.to_string(),
            },
            other => DecodeError::PayloadDecode { event, reason: other.to_string() },
        })
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Decoded values keyed by their declared argument names.
struct Args<'a> {
    event: &'static str,
    values: Vec<(&'a str, DynSolValue)>,
}

impl<'a> Args<'a> {
    fn new(schema: &'a EventSchema, decoded: DecodedEvent) -> Self {
        let indexed = schema.indexed().zip(decoded.indexed);
        let payload = schema.payload().zip(decoded.body);
        Self {
            event: schema.name(),
            values: indexed
                .chain(payload)
                .map(|(param, value)| (param.name.as_str(), value))
                .collect(),
        }
    }

    fn take(&mut self, name: &str) -> Result<DynSolValue, DecodeError> {
        let pos = self
            .values
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| self.missing(name))?;
        Ok(self.values.swap_remove(pos).1)
    }

    fn uint(&mut self, name: &str) -> Result<U256, DecodeError> {
        match self.take(name)? {
            DynSolValue::Uint(v, 256) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    fn address(&mut self, name: &str) -> Result<Address, DecodeError> {
        match self.take(name)? {
            DynSolValue::Address(v) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    fn bool(&mut self, name: &str) -> Result<bool, DecodeError> {
        match self.take(name)? {
            DynSolValue::Bool(v) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    fn string(&mut self, name: &str) -> Result<String, DecodeError> {
        match self.take(name)? {
            DynSolValue::String(v) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    fn missing(&self, name: &str) -> DecodeError {
        DecodeError::PayloadDecode {
            event: self.event,
            reason: format!("argument {name} missing or mistyped"),
        }
    }
}

fn assemble(schema: &EventSchema, mut args: Args<'_>, meta: EventMeta) -> Result<Event, DecodeError> {
    let market_id = MarketId::from(args.uint("marketId")?);

    let event = match schema.kind {
        EventKind::MarketCreated => Event::MarketCreated(MarketCreated {
            market_id,
            creator: args.address("creator")?,
            question: args.string("question")?,
            end_time: args.uint("endTime")?,
            initial_yes_odds: args.uint("initialYesPred")?,
            initial_no_odds: args.uint("initialNoPred")?,
            meta,
        }),
        EventKind::SharesBought => Event::SharesTraded(Trade {
            market_id,
            user: args.address("user")?,
            side: Side::from_is_yes(args.bool("isYes")?),
            fill: Fill::Buy {
                pred_in: args.uint("predIn")?,
                shares_out: args.uint("sharesOut")?,
            },
            meta,
        }),
        EventKind::SharesSold => Event::SharesTraded(Trade {
            market_id,
            user: args.address("user")?,
            side: Side::from_is_yes(args.bool("isYes")?),
            fill: Fill::Sell {
                shares_in: args.uint("sharesIn")?,
                pred_out: args.uint("predOut")?,
            },
            meta,
        }),
        EventKind::Comment => Event::Comment(TextPost {
            market_id,
            user: args.address("user")?,
            text: args.string("content")?,
            meta,
        }),
        EventKind::Danmaku => Event::Danmaku(TextPost {
            market_id,
            user: args.address("user")?,
            text: args.string("content")?,
            meta,
        }),
    };
    Ok(event)
}
