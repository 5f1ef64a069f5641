//! Single-node proof-of-work ledger core.
//!
//! Transactions are grouped into bounded ledgers, ledgers into blocks, and
//! blocks are mined against a difficulty score and chained by SHA-256 hash.
//! The [`Blockchain`] tracks every accepted block and every competing tip, and
//! picks the canonical chain by cumulative difficulty.
//!
//! Callers use only [`Blockchain::init_genesis`] (or
//! [`Blockchain::with_config`]), [`Blockchain::propose_block`],
//! [`Blockchain::insert`], [`Blockchain::lookup`],
//! [`Blockchain::choose_best_tip`] and [`Blockchain::canonical_chain`] to
//! read and grow the chain.

#![forbid(unsafe_code)]

pub mod blockchain;

pub use blockchain::{
    Block, Blockchain, BlockchainError, CancelToken, ChainConfig, FieldProjection, HashValue,
    ProofOfWork, Transaction, TransactionLedger,
};
