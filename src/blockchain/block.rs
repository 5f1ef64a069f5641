use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::hash::HashValue;
use super::ledger::TransactionLedger;
use super::pow::{self, PowError};

/// Unix time of the fixed genesis block (2025-10-23T15:00:56Z)
pub const GENESIS_TIMESTAMP_SECS: i64 = 1_761_231_656;

/// Proof-of-work payload of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Nonce that produced `hash`
    pub nonce: u64,

    /// Difficulty score of `hash`
    pub difficulty: u64,

    /// Digest of the block's canonical serialization
    pub hash: HashValue,
}

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Index of the block in the chain (genesis is 0)
    pub index: u64,

    /// Timestamp when the block was created
    pub timestamp: DateTime<Utc>,

    /// Transactions included in this block
    pub transactions: TransactionLedger,

    /// Hash of the parent block
    pub prev_hash: HashValue,

    /// Nonce, difficulty and hash found by mining
    pub proof_of_work: Proof,

    /// Reward attached to the block
    pub reward: f64,

    /// Sum of this block's difficulty and all of its ancestors'
    pub cumulative_difficulty: u64,
}

impl Block {
    /// Creates a new, not yet mined block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The ledger of transactions to include
    /// * `prev_hash` - The hash of the parent block
    /// * `reward` - The reward attached to the block
    ///
    /// # Returns
    ///
    /// A block carrying the digest of its nonce-0 serialization
    pub fn new(
        index: u64,
        transactions: TransactionLedger,
        prev_hash: HashValue,
        reward: f64,
    ) -> Result<Self, PowError> {
        Self::with_timestamp(index, Utc::now(), transactions, prev_hash, reward)
    }

    /// Same as [`Block::new`] with an explicit timestamp
    pub fn with_timestamp(
        index: u64,
        timestamp: DateTime<Utc>,
        transactions: TransactionLedger,
        prev_hash: HashValue,
        reward: f64,
    ) -> Result<Self, PowError> {
        let mut block = Block {
            index,
            timestamp,
            transactions,
            prev_hash,
            proof_of_work: Proof {
                nonce: 0,
                difficulty: 0,
                hash: HashValue::sentinel(),
            },
            reward,
            cumulative_difficulty: 0,
        };

        let hash = block.calculate_hash()?;
        block.proof_of_work.difficulty = pow::difficulty_of(&hash);
        block.proof_of_work.hash = hash;

        Ok(block)
    }

    /// Builds the fixed genesis block.
    ///
    /// Genesis is never mined: its hash is the digest of its fixed content and
    /// its difficulty is the seed, not a score derived from the hash.
    pub fn genesis(reward_seed: f64, difficulty_seed: u64) -> Result<Self, PowError> {
        let timestamp = Utc
            .timestamp_opt(GENESIS_TIMESTAMP_SECS, 0)
            .single()
            .unwrap_or_default();

        let mut genesis = Self::with_timestamp(
            0,
            timestamp,
            TransactionLedger::new(0),
            HashValue::sentinel(),
            reward_seed,
        )?;
        genesis.proof_of_work.difficulty = difficulty_seed;
        genesis.cumulative_difficulty = difficulty_seed;

        Ok(genesis)
    }

    /// Recomputes the SHA-256 digest of the block's canonical serialization
    pub fn calculate_hash(&self) -> Result<HashValue, PowError> {
        pow::digest(self)
    }

    pub fn hash(&self) -> &HashValue {
        &self.proof_of_work.hash
    }

    pub fn nonce(&self) -> u64 {
        self.proof_of_work.nonce
    }

    pub fn difficulty(&self) -> u64 {
        self.proof_of_work.difficulty
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash.is_sentinel()
    }
}
