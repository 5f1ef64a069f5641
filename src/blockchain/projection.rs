//! Read-only field views of transactions and blocks for logging and display.
//!
//! These never feed back into hashing or validation; the canonical encoding
//! lives in `pow`.

use serde::Serialize;
use serde_json::{json, Value};

use super::block::Block;
use super::ledger::TransactionLedger;
use super::transaction::Transaction;

/// Ordered `(name, value)` pairs with lower-cased field names
pub type Fields = Vec<(&'static str, Value)>;

pub trait FieldProjection: Serialize {
    fn fields(&self) -> Fields;

    /// Fields rendered as `name=value` separated by spaces
    fn describe(&self) -> String {
        self.fields()
            .iter()
            .map(|(name, value)| match value {
                Value::String(s) => format!("{}={}", name, s),
                other => format!("{}={}", name, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Indented JSON dump
    fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FieldProjection for Transaction {
    fn fields(&self) -> Fields {
        vec![
            ("id", json!(self.id.to_string())),
            ("timestamp", json!(self.timestamp.to_rfc3339())),
            ("sender", json!(self.sender)),
            ("receiver", json!(self.receiver)),
            ("amount", json!(self.amount)),
            ("tax", json!(self.tax)),
        ]
    }
}

impl FieldProjection for Block {
    fn fields(&self) -> Fields {
        vec![
            ("index", json!(self.index)),
            ("timestamp", json!(self.timestamp.to_rfc3339())),
            ("transactions", json!(self.transactions.size())),
            ("prevhash", json!(self.prev_hash.as_str())),
            ("nonce", json!(self.nonce())),
            ("difficulty", json!(self.difficulty())),
            ("hash", json!(self.hash().as_str())),
            ("reward", json!(self.reward)),
            ("cumulativedifficulty", json!(self.cumulative_difficulty)),
        ]
    }
}

impl TransactionLedger {
    /// Field views of every transaction, in id order
    pub fn info_list(&self) -> Vec<Fields> {
        self.iter().map(|tx| tx.fields()).collect()
    }
}
