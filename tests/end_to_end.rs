use pow_ledger::blockchain::{
    pow, Blockchain, BlockchainError, ChainConfig, HashValue, Transaction, TransactionLedger,
};

use std::collections::HashSet;
use std::thread;

fn saul_to_bush(capacity: usize) -> TransactionLedger {
    let mut ledger = TransactionLedger::new(capacity);
    ledger
        .insert(Transaction::new("Saul", "Bush", 10.0).unwrap())
        .unwrap();
    ledger
}

#[test]
fn genesis_then_one_block() {
    let chain = Blockchain::init_genesis(0.0, 0).unwrap();
    let genesis = chain.genesis().unwrap();
    assert_eq!(genesis.index, 0);

    let ledger = saul_to_bush(10);
    let tx = ledger.iter().next().unwrap().clone();
    assert_eq!(tx.tax, 0.1);

    let block1 = chain.propose_block(genesis.hash(), &ledger, 4).unwrap();
    chain.insert(block1.clone()).unwrap();

    let canonical = chain.canonical_chain().unwrap();
    assert_eq!(canonical, vec![genesis, block1.clone()]);

    let stored = chain.lookup(block1.hash()).unwrap();
    assert_eq!(&pow::digest(&stored).unwrap(), block1.hash());
    assert_eq!(stored.transactions.get(&tx.id), Some(&tx));
}

#[test]
fn persisted_block_reinserts_into_fresh_chain() {
    let chain = Blockchain::init_genesis(0.0, 0).unwrap();
    let genesis = chain.genesis().unwrap();
    let block = chain.propose_block(genesis.hash(), &saul_to_bush(4), 4).unwrap();

    let json = serde_json::to_string(&block).unwrap();
    let restored = serde_json::from_str(&json).unwrap();

    let replica = Blockchain::init_genesis(0.0, 0).unwrap();
    replica.insert(restored).unwrap();
    assert_eq!(replica.choose_best_tip().unwrap(), block);
}

#[test]
fn fork_tips_and_best_choice() {
    let chain = Blockchain::init_genesis(0.0, 0).unwrap();
    let genesis = chain.genesis().unwrap();
    let tip = chain.propose_block(genesis.hash(), &saul_to_bush(4), 4).unwrap();
    chain.insert(tip.clone()).unwrap();

    let a = chain.propose_block(tip.hash(), &saul_to_bush(4), 4).unwrap();
    let b = chain.propose_block(tip.hash(), &saul_to_bush(4), 4).unwrap();
    chain.insert(a.clone()).unwrap();
    chain.insert(b.clone()).unwrap();

    let tips: HashSet<HashValue> = chain.tips().iter().map(|t| t.hash().clone()).collect();
    assert_eq!(tips.len(), 2);
    assert!(tips.contains(a.hash()));
    assert!(tips.contains(b.hash()));
    assert!(!tips.contains(tip.hash()));

    let best = chain.choose_best_tip().unwrap();
    let heavier = match a.cumulative_difficulty.cmp(&b.cumulative_difficulty) {
        std::cmp::Ordering::Greater => &a,
        std::cmp::Ordering::Less => &b,
        std::cmp::Ordering::Equal => std::cmp::min_by(&a, &b, |x, y| x.hash().cmp(y.hash())),
    };
    assert_eq!(&best, heavier);

    // Extending the losing side past the winner reorganizes the best tip
    let loser = if best == a { b } else { a };
    let mut parent = loser;
    while parent.cumulative_difficulty <= best.cumulative_difficulty {
        let next = chain.propose_block(parent.hash(), &saul_to_bush(4), 4).unwrap();
        chain.insert(next.clone()).unwrap();
        parent = next;
    }
    assert_eq!(chain.choose_best_tip().unwrap(), parent);
    assert_eq!(chain.canonical_chain().unwrap().last(), Some(&parent));
    assert!(chain.verify_canonical_chain().is_ok());
}

#[test]
fn racing_duplicate_inserts_accept_once() {
    let chain = Blockchain::init_genesis(0.0, 0).unwrap();
    let genesis = chain.genesis().unwrap();
    let block = chain.propose_block(genesis.hash(), &saul_to_bush(4), 4).unwrap();

    let results: Vec<_> = (0..8)
        .map(|_| {
            let chain = chain.clone();
            let block = block.clone();
            thread::spawn(move || chain.insert(block))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == BlockchainError::DuplicateBlock(block.hash().clone())));
    assert_eq!(chain.block_count(), 2);
    assert_eq!(chain.tips().len(), 1);
}

#[test]
fn racing_siblings_all_become_tips() {
    let chain = Blockchain::init_genesis(0.0, 0).unwrap();
    let genesis = chain.genesis().unwrap();

    let siblings: Vec<_> = (0..6)
        .map(|_| chain.propose_block(genesis.hash(), &saul_to_bush(4), 4).unwrap())
        .collect();

    let handles: Vec<_> = siblings
        .iter()
        .cloned()
        .map(|block| {
            let chain = chain.clone();
            thread::spawn(move || chain.insert(block))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let tips: HashSet<HashValue> = chain.tips().iter().map(|t| t.hash().clone()).collect();
    let expected: HashSet<HashValue> = siblings.iter().map(|b| b.hash().clone()).collect();
    assert_eq!(tips, expected);
    assert!(chain.lookup_tip(genesis.hash()).is_none());
}

#[test]
fn parallel_mining_produces_acceptable_blocks() {
    let chain = Blockchain::with_config(ChainConfig {
        mining_workers: 4,
        ..ChainConfig::default()
    })
    .unwrap();
    let genesis = chain.genesis().unwrap();

    let block = chain.propose_block(genesis.hash(), &saul_to_bush(4), 8).unwrap();
    assert!(block.difficulty() >= 8);
    chain.insert(block).unwrap();
    assert!(chain.is_valid());
}
