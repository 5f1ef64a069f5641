//! Proof-of-work engine.
//!
//! A block's hash pre-image is the concatenation, separated by [`DELIMITER`], of
//! its index, its timestamp (RFC 3339, nanosecond precision, `Z` suffix), the
//! canonical JSON of its ledger, its parent hash and its nonce. Everything but
//! the nonce is fixed during a search, so the hasher is seeded with that prefix
//! once and cloned per attempt.
//!
//! Difficulty is scored from the leading hex characters of the hash rather than
//! compared against a numeric target, see [`difficulty_of`].

use chrono::SecondsFormat;
use log::{debug, info};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::block::{Block, Proof};
use super::config::ChainConfig;
use super::hash::HashValue;
use super::ledger::LedgerError;

/// Field separator in the hash pre-image
pub const DELIMITER: &str = r"\fh~8";

/// Errors that can occur while hashing or mining a block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowError {
    #[error("Failed to serialize block: {0}")]
    Serialization(#[from] LedgerError),

    #[error("Mining exhausted after {attempts} attempts")]
    MiningExhausted { attempts: u64 },

    #[error("Mining cancelled")]
    Cancelled,

    #[error("Failed to start mining workers: {0}")]
    WorkerPool(String),
}

/// Serializes everything in the pre-image except the nonce
pub fn preimage_prefix(block: &Block) -> Result<String, PowError> {
    let ledger = block.transactions.canonical_json()?;

    Ok(format!(
        "{index}{d}{timestamp}{d}{ledger}{d}{prev}{d}",
        index = block.index,
        timestamp = block.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        ledger = ledger,
        prev = block.prev_hash,
        d = DELIMITER,
    ))
}

/// Deterministic hash pre-image of a block
pub fn serialize(block: &Block) -> Result<String, PowError> {
    let mut preimage = preimage_prefix(block)?;
    preimage.push_str(&block.proof_of_work.nonce.to_string());
    Ok(preimage)
}

/// SHA-256 of [`serialize`], rendered as lowercase hex
pub fn digest(block: &Block) -> Result<HashValue, PowError> {
    let preimage = serialize(block)?;
    Ok(HashValue::from_digest(&Sha256::digest(preimage.as_bytes())))
}

fn hash_with_nonce(seeded: &Sha256, nonce: u64) -> HashValue {
    let mut hasher = seeded.clone();
    hasher.update(nonce.to_string().as_bytes());
    HashValue::from_digest(&hasher.finalize())
}

/// Points awarded for a single leading hex character
fn nibble_weight(c: char) -> Option<u64> {
    match c {
        '0' => Some(4),
        '1' => Some(3),
        '2' | '3' => Some(2),
        '4'..='7' => Some(1),
        _ => None,
    }
}

/// Scores a hash by its leading characters.
///
/// Every leading `'0'` is worth 4. The first character that is not `'0'` adds
/// its own weight (`'1'` = 3, `'2'`/`'3'` = 2, `'4'`..`'7'` = 1) and ends the
/// scan; any other character ends it without adding anything. This approximates
/// the number of leading zero bits of the digest.
pub fn difficulty_of(hash: &HashValue) -> u64 {
    let mut score = 0;

    for c in hash.as_str().chars() {
        match nibble_weight(c) {
            Some(weight) => {
                score += weight;
                if c != '0' {
                    break;
                }
            }
            None => break,
        }
    }

    score
}

/// Whether the block's recorded hash scores at least `target`
pub fn meets_target(block: &Block, target: u64) -> bool {
    difficulty_of(block.hash()) >= target
}

/// Cooperative cancellation flag shared between a miner and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every search holding this token to stop. Stays set.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Search {
    Found(Proof),
    Cancelled,
}

/// Nonce search over a candidate block
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    /// Upper bound on attempts; `None` searches the whole nonce space
    max_attempts: Option<u64>,

    /// Threads used by [`ProofOfWork::mine_parallel`]
    workers: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork {
            max_attempts: None,
            workers: 1,
        }
    }
}

impl ProofOfWork {
    pub fn new(max_attempts: Option<u64>, workers: usize) -> Self {
        ProofOfWork {
            max_attempts,
            workers: workers.max(1),
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        Self::new(config.max_mining_attempts, config.mining_workers)
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn nonce_range(&self) -> Option<RangeInclusive<u64>> {
        match self.max_attempts {
            Some(0) => None,
            Some(n) => Some(0..=n - 1),
            None => Some(0..=u64::MAX),
        }
    }

    fn exhausted(&self) -> PowError {
        PowError::MiningExhausted {
            attempts: self.max_attempts.unwrap_or(u64::MAX),
        }
    }

    /// Mines `block` until its hash scores at least `target_difficulty`.
    ///
    /// Nonces are tried in order starting from 0, so the result is the smallest
    /// winning nonce and is reproducible.
    pub fn mine(&self, block: Block, target_difficulty: u64) -> Result<Block, PowError> {
        self.mine_with_cancel(block, target_difficulty, &CancelToken::new())
    }

    /// [`ProofOfWork::mine`], checking `cancel` between attempts
    pub fn mine_with_cancel(
        &self,
        mut block: Block,
        target_difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Block, PowError> {
        let seeded = Sha256::new_with_prefix(preimage_prefix(&block)?.as_bytes());
        let range = self.nonce_range().ok_or_else(|| self.exhausted())?;

        for nonce in range {
            if cancel.is_cancelled() {
                debug!("Mining of block {} cancelled at nonce {}", block.index, nonce);
                return Err(PowError::Cancelled);
            }

            let hash = hash_with_nonce(&seeded, nonce);
            let difficulty = difficulty_of(&hash);

            if difficulty >= target_difficulty {
                info!(
                    "Mined block {} at nonce {} (difficulty {}, target {})",
                    block.index, nonce, difficulty, target_difficulty
                );
                block.proof_of_work = Proof {
                    nonce,
                    difficulty,
                    hash,
                };
                return Ok(block);
            }
        }

        Err(self.exhausted())
    }

    /// Splits the nonce space across a pool of `workers` threads.
    ///
    /// The first worker to find a winning nonce stops the others. Which nonce
    /// wins is not deterministic, but any result is valid.
    pub fn mine_parallel(
        &self,
        mut block: Block,
        target_difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Block, PowError> {
        let seeded = Sha256::new_with_prefix(preimage_prefix(&block)?.as_bytes());
        let range = self.nonce_range().ok_or_else(|| self.exhausted())?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| PowError::WorkerPool(e.to_string()))?;

        let outcome = pool.install(|| {
            range.into_par_iter().find_map_any(|nonce| {
                if cancel.is_cancelled() {
                    return Some(Search::Cancelled);
                }

                let hash = hash_with_nonce(&seeded, nonce);
                let difficulty = difficulty_of(&hash);
                (difficulty >= target_difficulty).then(|| {
                    Search::Found(Proof {
                        nonce,
                        difficulty,
                        hash,
                    })
                })
            })
        });

        match outcome {
            Some(Search::Found(proof)) => {
                info!(
                    "Mined block {} at nonce {} (difficulty {}, target {}, {} workers)",
                    block.index, proof.nonce, proof.difficulty, target_difficulty, self.workers
                );
                block.proof_of_work = proof;
                Ok(block)
            }
            Some(Search::Cancelled) => Err(PowError::Cancelled),
            None => Err(self.exhausted()),
        }
    }

    /// Runs the parallel search when more than one worker is configured
    pub fn solve(
        &self,
        block: Block,
        target_difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Block, PowError> {
        if self.workers > 1 {
            self.mine_parallel(block, target_difficulty, cancel)
        } else {
            self.mine_with_cancel(block, target_difficulty, cancel)
        }
    }
}
