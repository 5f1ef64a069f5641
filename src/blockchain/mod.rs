// Blockchain module
//
// This module contains the ledger core:
// - Hash values
// - Transactions and bounded transaction ledgers
// - Block structure
// - Proof of work engine
// - Blockchain with fork tracking
// - Field projections for display

pub mod block;
pub mod chain;
pub mod config;
pub mod hash;
pub mod ledger;
pub mod pow;
pub mod projection;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, Proof};
pub use chain::{Blockchain, BlockchainError, ChainStats};
pub use config::{ChainConfig, ConfigError};
pub use hash::{HashError, HashValue};
pub use ledger::{LedgerError, TransactionLedger};
pub use pow::{CancelToken, PowError, ProofOfWork};
pub use projection::FieldProjection;
pub use transaction::{Transaction, TransactionError};
