use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use std::collections::BTreeMap;

use super::transaction::Transaction;

/// Errors that can occur during ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Ledger full: capacity {capacity} reached")]
    LedgerFull { capacity: usize },

    #[error("Failed to encode ledger: {0}")]
    Encoding(String),
}

/// A bounded collection of transactions keyed by id.
///
/// Transactions are kept in id order, so iteration and the canonical JSON
/// encoding do not depend on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LedgerRepr")]
pub struct TransactionLedger {
    /// Maximum number of transactions the ledger may hold
    capacity: usize,

    /// Transactions indexed by id
    transactions: BTreeMap<Uuid, Transaction>,
}

/// Unvalidated wire shape of a ledger
#[derive(Deserialize)]
struct LedgerRepr {
    capacity: usize,
    transactions: BTreeMap<Uuid, Transaction>,
}

impl TryFrom<LedgerRepr> for TransactionLedger {
    type Error = LedgerError;

    fn try_from(repr: LedgerRepr) -> Result<Self, Self::Error> {
        if repr.transactions.len() > repr.capacity {
            return Err(LedgerError::LedgerFull {
                capacity: repr.capacity,
            });
        }

        Ok(TransactionLedger {
            capacity: repr.capacity,
            transactions: repr.transactions,
        })
    }
}

impl TransactionLedger {
    /// Creates an empty ledger holding at most `capacity` transactions
    pub fn new(capacity: usize) -> Self {
        TransactionLedger {
            capacity,
            transactions: BTreeMap::new(),
        }
    }

    /// Adds a transaction keyed by its id.
    ///
    /// Reinserting an id that is already present overwrites the previous entry
    /// without error. The capacity check happens first, so a full ledger rejects
    /// even an overwrite.
    pub fn insert(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        if self.transactions.len() >= self.capacity {
            return Err(LedgerError::LedgerFull {
                capacity: self.capacity,
            });
        }

        self.transactions.insert(tx.id, tx);
        Ok(())
    }

    /// Removes a transaction; absent ids are a no-op
    pub fn remove(&mut self, id: &Uuid) -> Option<Transaction> {
        self.transactions.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn size(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Transactions in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.transactions.keys()
    }

    /// Deterministic JSON object of `id -> transaction`, keys ascending.
    ///
    /// This is the ledger's contribution to a block's hash pre-image.
    pub fn canonical_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string(&self.transactions).map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}
