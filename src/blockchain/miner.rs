use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info};

use super::block::Block;
use super::chain::{Blockchain, BlockchainError};
use super::crypto::Address;
use super::transaction::Transaction;

/// Result of one mining run
#[derive(Debug)]
pub enum MineOutcome {
    /// A block was mined and committed to the chain
    Mined(Block),

    /// The pending pool was empty; nothing to mine
    Idle,

    /// Cancellation was requested before a valid nonce was found
    Cancelled,
}

/// Drives the proof-of-work search for one candidate block
#[derive(Debug, Clone)]
pub struct Miner {
    wallet_address: Address,
}

impl Miner {
    /// Creates a miner collecting rewards at the given wallet address
    pub fn new(wallet_address: Address) -> Self {
        Miner { wallet_address }
    }

    pub fn wallet_address(&self) -> &Address {
        &self.wallet_address
    }

    /// Mines one block synchronously: admits a reward transaction, assembles
    /// a candidate from the chain tip and the pending pool, searches for a
    /// qualifying nonce and commits the result.
    ///
    /// An empty pending pool is a no-op, reported as `MineOutcome::Idle`.
    /// A rejected commit (e.g. the candidate went stale because another
    /// miner won the race) is surfaced as an error.
    ///
    /// # Arguments
    ///
    /// * `blockchain` - The ledger to mine against
    ///
    /// # Returns
    ///
    /// Result with the outcome of the run
    pub fn mine(&self, blockchain: &Blockchain) -> Result<MineOutcome, BlockchainError> {
        self.mine_with_cancel(blockchain, &AtomicBool::new(false))
    }

    fn mine_with_cancel(
        &self,
        blockchain: &Blockchain,
        cancel: &AtomicBool,
    ) -> Result<MineOutcome, BlockchainError> {
        if blockchain.pending_transactions().is_empty() {
            info!("{}: no transactions to mine", blockchain.name());
            return Ok(MineOutcome::Idle);
        }

        let reward =
            Transaction::new_system(self.wallet_address.clone(), blockchain.mining_reward());
        blockchain.add_transaction(reward)?;

        let tip = blockchain.latest_block()?;
        let mut block = Block::new(tip.hash().to_string(), blockchain.pending_transactions());

        let target = "0".repeat(blockchain.difficulty());

        // The search is unbounded busy-work; the flag makes it
        // interruptible at iteration boundaries
        block.generate_hash();
        while !block.hash().starts_with(&target) {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    "{}: mining cancelled at nonce {}",
                    blockchain.name(),
                    block.nonce()
                );
                return Ok(MineOutcome::Cancelled);
            }

            block.increment_nonce();
            block.generate_hash();
        }

        info!(
            "{}: mined block {} at nonce {}",
            blockchain.name(),
            block.hash(),
            block.nonce()
        );

        blockchain.add_block(block.clone())?;

        Ok(MineOutcome::Mined(block))
    }

    /// Starts a mining run on a background worker thread.
    ///
    /// The caller may join the returned handle for the outcome, request
    /// cancellation, or drop it to leave the worker running detached.
    pub fn spawn(self, blockchain: Blockchain) -> MineHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            let outcome = self.mine_with_cancel(&blockchain, &flag);

            if let Err(err) = &outcome {
                error!("{}: mining run failed: {}", blockchain.name(), err);
            }

            outcome
        });

        MineHandle { handle, cancel }
    }
}

/// Handle to a background mining run
#[derive(Debug)]
pub struct MineHandle {
    handle: JoinHandle<Result<MineOutcome, BlockchainError>>,
    cancel: Arc<AtomicBool>,
}

impl MineHandle {
    /// Requests cancellation; the worker stops at the next iteration boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Waits for the mining run to finish and returns its outcome
    pub fn join(self) -> Result<MineOutcome, BlockchainError> {
        self.handle
            .join()
            .unwrap_or(Err(BlockchainError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::chain::ChainConfig;

    fn test_config(difficulty: usize) -> ChainConfig {
        ChainConfig {
            name: "Unit Chain".to_string(),
            difficulty,
            mining_reward: 50.0,
            fee: 0.0,
            require_signatures: false,
        }
    }

    fn chain_with_funds(difficulty: usize, address: &Address, amount: f64) -> Blockchain {
        let blockchain = Blockchain::new(test_config(difficulty));

        let grant = Transaction::new_system(address.clone(), amount);
        blockchain.add_transaction(grant).unwrap();

        let miner = Miner::new(Address::new("bootstrap-miner"));
        miner.mine(&blockchain).unwrap();

        blockchain
    }

    #[test]
    fn test_mining_empty_pool_is_noop() {
        let blockchain = Blockchain::new(test_config(1));
        let miner = Miner::new(Address::new("miner"));

        let outcome = miner.mine(&blockchain).unwrap();

        assert!(matches!(outcome, MineOutcome::Idle));
        assert_eq!(blockchain.get_chain().len(), 1);
    }

    #[test]
    fn test_mine_commits_valid_block() {
        let a = Address::new("A");
        let blockchain = chain_with_funds(2, &a, 100.0);

        blockchain
            .add_transaction(Transaction::new(a.clone(), Address::new("B"), 10.0))
            .unwrap();

        let miner = Miner::new(Address::new("miner"));
        let outcome = miner.mine(&blockchain).unwrap();

        let block = match outcome {
            MineOutcome::Mined(block) => block,
            other => panic!("expected a mined block, got {:?}", other),
        };

        assert!(block.hash().starts_with("00"));
        assert!(block.is_valid_with_policy(2, false));

        // The user transaction plus the reward transaction
        assert_eq!(block.transactions().len(), 2);

        assert_eq!(blockchain.get_chain().len(), 3);
        assert!(blockchain.pending_transactions().is_empty());
        assert!(blockchain.is_chain_valid());
    }

    #[test]
    fn test_miner_collects_reward() {
        let a = Address::new("A");
        let blockchain = chain_with_funds(1, &a, 100.0);

        blockchain
            .add_transaction(Transaction::new(a.clone(), Address::new("B"), 10.0))
            .unwrap();

        let miner = Miner::new(Address::new("miner"));
        miner.mine(&blockchain).unwrap();

        assert_eq!(
            blockchain.balance_of("miner").unwrap(),
            blockchain.mining_reward()
        );
        assert_eq!(blockchain.balance_of("A").unwrap(), 90.0);
        assert_eq!(blockchain.balance_of("B").unwrap(), 10.0);
    }

    #[test]
    fn test_background_mining_run() {
        let a = Address::new("A");
        let blockchain = chain_with_funds(1, &a, 100.0);

        blockchain
            .add_transaction(Transaction::new(a.clone(), Address::new("B"), 10.0))
            .unwrap();

        let handle = Miner::new(Address::new("miner")).spawn(blockchain.clone());
        let outcome = handle.join().unwrap();

        assert!(matches!(outcome, MineOutcome::Mined(_)));
        assert_eq!(blockchain.get_chain().len(), 3);
    }

    #[test]
    fn test_cancelled_run_commits_nothing() {
        let blockchain = Blockchain::new(test_config(1));
        blockchain
            .add_transaction(Transaction::new_system(Address::new("X"), 1.0))
            .unwrap();

        // A target this steep will not be met before the cancel lands
        let mut steep = blockchain.clone();
        steep.set_difficulty(16);

        let handle = Miner::new(Address::new("miner")).spawn(steep);
        handle.cancel();
        let outcome = handle.join().unwrap();

        assert!(matches!(outcome, MineOutcome::Cancelled));
        assert_eq!(blockchain.get_chain().len(), 1);
    }
}
