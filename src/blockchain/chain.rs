use log::{debug, info, warn};
use parking_lot::RwLock;
use thiserror::Error;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::block::Block;
use super::config::ChainConfig;
use super::hash::HashValue;
use super::ledger::TransactionLedger;
use super::pow::{difficulty_of, CancelToken, PowError, ProofOfWork};

/// Errors that can occur during blockchain operations.
///
/// Every variant is a deterministic validation failure: retrying with the same
/// input fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockchainError {
    #[error("Unknown parent block: {0}")]
    UnknownParent(HashValue),

    #[error("Index mismatch: expected {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("Stale hash: block records {recorded}, content hashes to {computed}")]
    StaleHash {
        recorded: HashValue,
        computed: HashValue,
    },

    #[error("Difficulty mismatch: block records {recorded}, hash scores {actual}")]
    DifficultyMismatch { recorded: u64, actual: u64 },

    #[error("Insufficient difficulty: {actual} (minimum {minimum})")]
    InsufficientDifficulty { actual: u64, minimum: u64 },

    #[error("Cumulative difficulty mismatch: expected {expected}, got {actual}")]
    CumulativeDifficultyMismatch { expected: u64, actual: u64 },

    #[error("Block already in chain: {0}")]
    DuplicateBlock(HashValue),

    #[error("Broken chain: missing block {0}")]
    BrokenChain(HashValue),

    #[error("No chain tips")]
    EmptyTips,

    #[error("Proof of work error: {0}")]
    ProofOfWork(#[from] PowError),
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Summary of the chain's current shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    /// Number of accepted blocks, genesis included
    pub blocks: usize,
    /// Number of current tips
    pub tips: usize,
    /// Hash of the best tip
    pub best_hash: HashValue,
    /// Index of the best tip
    pub best_index: u64,
    /// Cumulative difficulty of the best tip
    pub best_cumulative_difficulty: u64,
}

/// Blocks and tips, always updated together
#[derive(Debug, Clone, PartialEq)]
struct ChainState {
    /// Every accepted block
    chain: HashMap<HashValue, Block>,

    /// Blocks with no accepted child
    tips: HashSet<HashValue>,

    genesis_hash: HashValue,
}

/// Higher cumulative difficulty ranks first; ties go to the smaller hash
fn rank(a: &Block, b: &Block) -> Ordering {
    a.cumulative_difficulty
        .cmp(&b.cumulative_difficulty)
        .then_with(|| b.hash().cmp(a.hash()))
}

impl ChainState {
    fn best_tip(&self) -> Result<&Block> {
        self.tips
            .iter()
            .filter_map(|hash| self.chain.get(hash))
            .max_by(|a, b| rank(a, b))
            .ok_or(BlockchainError::EmptyTips)
    }

    fn genesis(&self) -> Result<&Block> {
        self.chain
            .get(&self.genesis_hash)
            .ok_or_else(|| BlockchainError::BrokenChain(self.genesis_hash.clone()))
    }

    /// Checks `block` against its parent. `computed` is the block's freshly
    /// recomputed digest.
    fn validate(&self, block: &Block, computed: &HashValue, min_difficulty: u64) -> Result<()> {
        let hash = block.hash();
        if self.chain.contains_key(hash) {
            return Err(BlockchainError::DuplicateBlock(hash.clone()));
        }

        let parent = self
            .chain
            .get(&block.prev_hash)
            .ok_or_else(|| BlockchainError::UnknownParent(block.prev_hash.clone()))?;

        validate_link(parent, block, computed, min_difficulty)
    }
}

/// Validates a non-genesis block against its parent
fn validate_link(parent: &Block, block: &Block, computed: &HashValue, min_difficulty: u64) -> Result<()> {
    let expected_index = parent.index + 1;
    if block.index != expected_index {
        return Err(BlockchainError::IndexMismatch {
            expected: expected_index,
            actual: block.index,
        });
    }

    if computed != block.hash() {
        return Err(BlockchainError::StaleHash {
            recorded: block.hash().clone(),
            computed: computed.clone(),
        });
    }

    let actual = difficulty_of(block.hash());
    if block.difficulty() != actual {
        return Err(BlockchainError::DifficultyMismatch {
            recorded: block.difficulty(),
            actual,
        });
    }

    if actual < min_difficulty {
        return Err(BlockchainError::InsufficientDifficulty {
            actual,
            minimum: min_difficulty,
        });
    }

    let expected = parent.cumulative_difficulty.saturating_add(block.difficulty());
    if block.cumulative_difficulty != expected {
        return Err(BlockchainError::CumulativeDifficultyMismatch {
            expected,
            actual: block.cumulative_difficulty,
        });
    }

    Ok(())
}

/// Represents the blockchain: every accepted block plus the set of tips.
///
/// Cloning yields another handle to the same chain. Inserts take an exclusive
/// lock over blocks and tips together; lookups share a read lock. Mining never
/// holds either.
#[derive(Debug, Clone)]
pub struct Blockchain {
    state: Arc<RwLock<ChainState>>,

    /// Chain parameters
    config: ChainConfig,

    /// Nonce search used by `propose_block`
    pow: ProofOfWork,
}

impl Blockchain {
    /// Creates a blockchain holding only the genesis block.
    ///
    /// Everything except the genesis seeds comes from [`ChainConfig::default`].
    pub fn init_genesis(reward_seed: f64, difficulty_seed: u64) -> Result<Self> {
        Self::with_config(ChainConfig {
            genesis_reward: reward_seed,
            genesis_difficulty: difficulty_seed,
            ..ChainConfig::default()
        })
    }

    /// Creates a blockchain from a full configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Chain parameters, including the genesis seeds
    ///
    /// # Returns
    ///
    /// A chain whose only block, and only tip, is genesis
    pub fn with_config(config: ChainConfig) -> Result<Self> {
        let genesis = Block::genesis(config.genesis_reward, config.genesis_difficulty)?;
        let genesis_hash = genesis.hash().clone();

        info!(
            "Created genesis block {} (difficulty {}, reward {})",
            genesis_hash, config.genesis_difficulty, config.genesis_reward
        );

        let mut chain = HashMap::new();
        chain.insert(genesis_hash.clone(), genesis);
        let mut tips = HashSet::new();
        tips.insert(genesis_hash.clone());

        Ok(Blockchain {
            state: Arc::new(RwLock::new(ChainState {
                chain,
                tips,
                genesis_hash,
            })),
            pow: ProofOfWork::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// An empty ledger sized by the configured capacity
    pub fn new_ledger(&self) -> TransactionLedger {
        TransactionLedger::new(self.config.ledger_capacity)
    }

    pub fn genesis(&self) -> Result<Block> {
        self.state.read().genesis().cloned()
    }

    /// Looks up any accepted block by hash
    pub fn lookup(&self, hash: &HashValue) -> Option<Block> {
        self.state.read().chain.get(hash).cloned()
    }

    /// Looks up a block only if it is currently a tip
    pub fn lookup_tip(&self, hash: &HashValue) -> Option<Block> {
        let state = self.state.read();
        if state.tips.contains(hash) {
            state.chain.get(hash).cloned()
        } else {
            None
        }
    }

    pub fn contains(&self, hash: &HashValue) -> bool {
        self.state.read().chain.contains_key(hash)
    }

    pub fn block_count(&self) -> usize {
        self.state.read().chain.len()
    }

    /// Current tips, best first
    pub fn tips(&self) -> Vec<Block> {
        let state = self.state.read();
        let mut tips: Vec<Block> = state
            .tips
            .iter()
            .filter_map(|hash| state.chain.get(hash))
            .cloned()
            .collect();
        tips.sort_by(|a, b| rank(b, a));
        tips
    }

    /// The tip with the highest cumulative difficulty, smallest hash on a tie
    pub fn choose_best_tip(&self) -> Result<Block> {
        self.state.read().best_tip().cloned()
    }

    /// Builds and mines a block extending `parent_hash`.
    ///
    /// The returned block is not inserted. It will only be accepted if
    /// `target_difficulty` is at least the chain's minimum difficulty.
    ///
    /// # Arguments
    ///
    /// * `parent_hash` - Hash of an accepted block to extend
    /// * `ledger` - Transactions to include; copied into the block
    /// * `target_difficulty` - Difficulty the mined hash must reach
    pub fn propose_block(
        &self,
        parent_hash: &HashValue,
        ledger: &TransactionLedger,
        target_difficulty: u64,
    ) -> Result<Block> {
        self.propose_block_with_cancel(parent_hash, ledger, target_difficulty, &CancelToken::new())
    }

    /// [`Blockchain::propose_block`] with a caller-held cancellation token
    pub fn propose_block_with_cancel(
        &self,
        parent_hash: &HashValue,
        ledger: &TransactionLedger,
        target_difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let parent = self
            .lookup(parent_hash)
            .ok_or_else(|| BlockchainError::UnknownParent(parent_hash.clone()))?;

        if target_difficulty < self.config.min_difficulty {
            warn!(
                "Target difficulty {} is below the chain minimum {}; the block will be rejected",
                target_difficulty, self.config.min_difficulty
            );
        }

        let candidate = Block::new(
            parent.index + 1,
            ledger.clone(),
            parent.hash().clone(),
            self.config.block_reward,
        )?;

        let mut block = self.pow.solve(candidate, target_difficulty, cancel)?;
        block.cumulative_difficulty = parent
            .cumulative_difficulty
            .saturating_add(block.difficulty());

        debug!(
            "Proposed block {} at index {} on parent {}",
            block.hash().short(),
            block.index,
            parent_hash.short()
        );

        Ok(block)
    }

    /// Validates `block` and adds it to the chain.
    ///
    /// On success the parent stops being a tip and the block becomes one, so two
    /// children of the same parent both remain tips. On failure nothing changes.
    pub fn insert(&self, block: Block) -> Result<()> {
        let computed = block.calculate_hash()?;

        let mut state = self.state.write();

        if let Err(err) = state.validate(&block, &computed, self.config.min_difficulty) {
            warn!("Rejected block {} at index {}: {}", block.hash().short(), block.index, err);
            return Err(err);
        }

        let previous_best = state.best_tip().ok().map(|tip| tip.hash().clone());
        let hash = block.hash().clone();
        let forked = !state.tips.contains(&block.prev_hash);

        state.tips.remove(&block.prev_hash);
        state.tips.insert(hash.clone());
        info!(
            "Accepted block {} at index {} (difficulty {}, cumulative {}){}",
            hash.short(),
            block.index,
            block.difficulty(),
            block.cumulative_difficulty,
            if forked { ", new fork" } else { "" }
        );
        state.chain.insert(hash, block);

        if let Ok(best) = state.best_tip() {
            if previous_best.as_ref() != Some(best.hash()) {
                info!("Best tip is now {} at index {}", best.hash().short(), best.index);
            }
        }

        Ok(())
    }

    /// Blocks from genesis to the best tip
    pub fn canonical_chain(&self) -> Result<Vec<Block>> {
        let state = self.state.read();
        let mut current = state.best_tip()?;
        let mut blocks = vec![current.clone()];

        while current.hash() != &state.genesis_hash {
            current = state
                .chain
                .get(&current.prev_hash)
                .ok_or_else(|| BlockchainError::BrokenChain(current.prev_hash.clone()))?;
            blocks.push(current.clone());
        }

        blocks.reverse();
        Ok(blocks)
    }

    /// Re-derives every hash and link along the canonical chain.
    ///
    /// Genesis is taken as given; every later block is re-checked exactly as
    /// `insert` checked it.
    pub fn verify_canonical_chain(&self) -> Result<()> {
        let blocks = self.canonical_chain()?;

        for pair in blocks.windows(2) {
            let (parent, block) = (&pair[0], &pair[1]);
            if &block.prev_hash != parent.hash() {
                return Err(BlockchainError::BrokenChain(block.prev_hash.clone()));
            }
            let computed = block.calculate_hash()?;
            validate_link(parent, block, &computed, self.config.min_difficulty)?;
        }

        Ok(())
    }

    /// Whether the canonical chain passes [`Blockchain::verify_canonical_chain`]
    pub fn is_valid(&self) -> bool {
        self.verify_canonical_chain().is_ok()
    }

    pub fn stats(&self) -> Result<ChainStats> {
        let state = self.state.read();
        let best = state.best_tip()?;

        Ok(ChainStats {
            blocks: state.chain.len(),
            tips: state.tips.len(),
            best_hash: best.hash().clone(),
            best_index: best.index,
            best_cumulative_difficulty: best.cumulative_difficulty,
        })
    }
}
