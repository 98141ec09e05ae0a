use std::sync::{Arc, Mutex};

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::block::Block;
use super::crypto::Address;
use super::transaction::{Transaction, TransactionError};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Address cannot be empty")]
    InvalidAddress,

    #[error("Transaction amount must be greater than zero: {0}")]
    InvalidAmount(f64),

    #[error("Transaction signature is invalid")]
    InvalidSignature,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Stale block: previous hash {found} does not match chain tip {tip}")]
    StaleBlock { tip: String, found: String },

    #[error("Invalid chain: block {index} has an incorrect previous hash")]
    BrokenChainLink { index: usize },

    #[error("Invalid block: block {index} is not valid")]
    InvalidBlockAt { index: usize },

    #[error("Blockchain is empty")]
    EmptyChain,

    #[error("Mining worker terminated abnormally")]
    WorkerPanicked,
}

/// Parameters for one chain flavor.
///
/// Behavior differences between the main and test networks are plain data
/// here; the test network's signature exemption is the `require_signatures`
/// policy flag, applied in both admission and block validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human-readable chain name
    pub name: String,

    /// Number of leading zero characters required in a block hash
    pub difficulty: usize,

    /// Base reward paid to the miner of a block
    pub mining_reward: f64,

    /// Flat fee charged on top of every user transaction
    pub fee: f64,

    /// Whether admission and block validation verify transaction signatures
    pub require_signatures: bool,
}

impl ChainConfig {
    /// The main network: signed transactions, flat fee
    pub fn mainnet() -> Self {
        ChainConfig {
            name: "Main Chain".to_string(),
            difficulty: 5,
            mining_reward: 50.0,
            fee: 0.25,
            require_signatures: true,
        }
    }

    /// The test network: higher reward, no fee, no signature checks
    pub fn testnet() -> Self {
        ChainConfig {
            name: "Test Chain".to_string(),
            difficulty: 5,
            mining_reward: 100.0,
            fee: 0.0,
            require_signatures: false,
        }
    }
}

/// The ledger: an append-only chain of blocks plus the pool of pending
/// transactions, shared behind clone-able handles.
///
/// Lock order is always chain before pending; a block commit holds both
/// locks so readers never observe an appended block without the matching
/// pool clear.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, index 0 = genesis
    chain: Arc<Mutex<Vec<Block>>>,

    /// Pending transactions to be included in the next block
    pending_transactions: Arc<Mutex<Vec<Transaction>>>,

    /// Chain parameters
    config: ChainConfig,
}

impl Blockchain {
    /// Creates a new blockchain with a mined genesis block
    ///
    /// # Arguments
    ///
    /// * `config` - The chain parameters
    ///
    /// # Returns
    ///
    /// A new Blockchain instance
    pub fn new(config: ChainConfig) -> Self {
        let genesis = Self::create_genesis_block(&config);

        info!(
            "{}: created genesis block {} at nonce {}",
            config.name,
            genesis.hash(),
            genesis.nonce()
        );

        Blockchain {
            chain: Arc::new(Mutex::new(vec![genesis])),
            pending_transactions: Arc::new(Mutex::new(Vec::new())),
            config,
        }
    }

    /// Creates the genesis block: previous hash "0", one system transaction,
    /// mined to the configured difficulty so the block passes its own
    /// validity check.
    fn create_genesis_block(config: &ChainConfig) -> Block {
        let genesis_transaction = Transaction::new_system(Address::new("0"), 1.0);

        let mut block = Block::new("0".to_string(), vec![genesis_transaction]);
        let target = "0".repeat(config.difficulty);

        block.generate_hash();
        while !block.hash().starts_with(&target) {
            block.increment_nonce();
            block.generate_hash();
        }

        block
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    pub fn fee(&self) -> f64 {
        self.config.fee
    }

    /// The payout for mining a block: the base reward plus the flat fee
    pub fn mining_reward(&self) -> f64 {
        self.config.mining_reward + self.config.fee
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Gets the last block in the chain
    ///
    /// # Returns
    ///
    /// Result with the last committed block
    pub fn latest_block(&self) -> Result<Block, BlockchainError> {
        let chain = self.chain.lock().unwrap();

        chain.last().cloned().ok_or(BlockchainError::EmptyChain)
    }

    /// Gets a snapshot of the entire chain
    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.lock().unwrap().clone()
    }

    /// Gets a snapshot of the pending transactions
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending_transactions.lock().unwrap().clone()
    }

    /// Computes a wallet balance by replaying every transaction in every
    /// committed block: amounts received minus amounts sent. Pending
    /// transactions are never counted.
    ///
    /// # Arguments
    ///
    /// * `address` - The wallet address to query
    ///
    /// # Returns
    ///
    /// Result with the derived balance
    pub fn balance_of(&self, address: &str) -> Result<f64, BlockchainError> {
        if address.is_empty() {
            return Err(BlockchainError::InvalidAddress);
        }

        let chain = self.chain.lock().unwrap();

        Ok(Self::address_balance(&chain, address))
    }

    fn address_balance(chain: &[Block], address: &str) -> f64 {
        chain
            .iter()
            .flat_map(|block| block.transactions())
            .map(|tx| {
                let received = if tx.recipient.0 == address { tx.amount } else { 0.0 };
                let sent = if tx.sender.0 == address { tx.amount } else { 0.0 };
                received - sent
            })
            .sum()
    }

    /// Runs the admission pipeline for one transaction against the committed
    /// chain and the current pool. Each step short-circuits on failure.
    fn verify_transaction(
        &self,
        chain: &[Block],
        pending: &[Transaction],
        transaction: &Transaction,
    ) -> Result<(), BlockchainError> {
        // System transactions (genesis, mining rewards) are admitted as-is
        if transaction.is_system() {
            return Ok(());
        }

        if transaction.sender.is_empty() || transaction.recipient.is_empty() {
            return Err(BlockchainError::InvalidAddress);
        }

        if transaction.amount <= 0.0 {
            return Err(BlockchainError::InvalidAmount(transaction.amount));
        }

        if self.config.require_signatures && !transaction.verify_signature() {
            return Err(BlockchainError::InvalidSignature);
        }

        let balance = Self::address_balance(chain, &transaction.sender.0);
        let amount_with_fee = transaction.amount + self.config.fee;

        if balance < amount_with_fee {
            return Err(BlockchainError::InsufficientBalance {
                required: amount_with_fee,
                available: balance,
            });
        }

        // The sender must also cover everything they already have pending,
        // so a burst of admissions cannot jointly overspend one balance
        let pending_total: f64 = pending
            .iter()
            .filter(|tx| tx.sender == transaction.sender)
            .map(|tx| tx.amount)
            .sum();

        if pending_total + amount_with_fee > balance {
            return Err(BlockchainError::InsufficientBalance {
                required: pending_total + amount_with_fee,
                available: balance,
            });
        }

        Ok(())
    }

    /// Adds a transaction to the pending pool after running the admission
    /// pipeline. A failed admission leaves the pool untouched.
    ///
    /// # Arguments
    ///
    /// * `transaction` - The transaction to admit
    ///
    /// # Returns
    ///
    /// Result indicating success or the first failed admission rule
    pub fn add_transaction(&self, transaction: Transaction) -> Result<(), BlockchainError> {
        let chain = self.chain.lock().unwrap();
        let mut pending = self.pending_transactions.lock().unwrap();

        self.verify_transaction(&chain, &pending, &transaction)?;
        pending.push(transaction);

        Ok(())
    }

    /// Adds a batch of transactions atomically: every member must pass the
    /// admission pipeline (each validated against the pool plus the earlier
    /// members of the same batch) or none is admitted.
    ///
    /// Used when one logical transfer is split into several records, e.g. a
    /// value transaction plus its fee transaction.
    pub fn add_transactions(&self, transactions: Vec<Transaction>) -> Result<(), BlockchainError> {
        let chain = self.chain.lock().unwrap();
        let mut pending = self.pending_transactions.lock().unwrap();

        let admitted_len = pending.len();
        for transaction in transactions {
            if let Err(err) = self.verify_transaction(&chain, &pending, &transaction) {
                pending.truncate(admitted_len);
                return Err(err);
            }
            pending.push(transaction);
        }

        Ok(())
    }

    /// Appends a mined block to the chain and clears the pending pool. This
    /// is the only mutator of the committed chain.
    ///
    /// The block is re-validated here: it must satisfy the policy-aware
    /// validity check and still extend the current tip. A candidate whose
    /// previous hash went stale (another miner committed first) is rejected,
    /// which keeps racing miners safe.
    ///
    /// # Arguments
    ///
    /// * `block` - The mined block to commit
    ///
    /// # Returns
    ///
    /// Result indicating success or the rejection reason
    pub fn add_block(&self, block: Block) -> Result<(), BlockchainError> {
        let mut chain = self.chain.lock().unwrap();
        let mut pending = self.pending_transactions.lock().unwrap();

        if !block.is_valid_with_policy(self.config.difficulty, self.config.require_signatures) {
            return Err(BlockchainError::InvalidBlock(block.hash().to_string()));
        }

        let tip = chain.last().ok_or(BlockchainError::EmptyChain)?;
        if block.previous_hash() != tip.hash() {
            return Err(BlockchainError::StaleBlock {
                tip: tip.hash().to_string(),
                found: block.previous_hash().to_string(),
            });
        }

        info!(
            "{}: committed block {} with {} transactions",
            self.config.name,
            block.hash(),
            block.transactions().len()
        );

        chain.push(block);
        pending.clear();

        Ok(())
    }

    /// Validates the whole chain from index 1: every block must link to its
    /// predecessor's hash and pass the policy-aware validity check. The
    /// first broken block wins and its index is carried in the error.
    pub fn validate_chain(&self) -> Result<(), BlockchainError> {
        let chain = self.chain.lock().unwrap();

        for index in 1..chain.len() {
            let current = &chain[index];
            let previous = &chain[index - 1];

            if current.previous_hash() != previous.hash() {
                return Err(BlockchainError::BrokenChainLink { index });
            }

            if !current.is_valid_with_policy(self.config.difficulty, self.config.require_signatures)
            {
                return Err(BlockchainError::InvalidBlockAt { index });
            }
        }

        Ok(())
    }

    /// Boolean wrapper around `validate_chain`: logs the failure and returns
    /// false instead of propagating it.
    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(err) => {
                error!("{}: chain validation failed: {}", self.config.name, err);
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_block<F>(&self, index: usize, mutate: F)
    where
        F: FnOnce(&mut Block),
    {
        let mut chain = self.chain.lock().unwrap();
        mutate(&mut chain[index]);
    }

    #[cfg(test)]
    pub(crate) fn set_difficulty(&mut self, difficulty: usize) {
        self.config.difficulty = difficulty;
    }
}
