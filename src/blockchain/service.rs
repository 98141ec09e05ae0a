use log::info;

use super::block::Block;
use super::chain::{Blockchain, BlockchainError};
use super::crypto::Address;
use super::miner::{MineHandle, MineOutcome, Miner};
use super::transaction::{Transaction, TransactionError};

/// Wires transaction admission to background mining.
///
/// Constructed explicitly and passed around by value; handles share the
/// underlying chain. There is no process-wide instance.
#[derive(Debug, Clone)]
pub struct LedgerService {
    blockchain: Blockchain,
}

impl LedgerService {
    pub fn new(blockchain: Blockchain) -> Self {
        LedgerService { blockchain }
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn chain_name(&self) -> &str {
        self.blockchain.name()
    }

    /// Signs the transaction, admits it to the pending pool and hands the
    /// proof-of-work run for it to a background worker mining on behalf of
    /// the sender. The caller may join or cancel the returned handle, or
    /// drop it to leave the worker detached.
    ///
    /// # Arguments
    ///
    /// * `transaction` - The unsigned transaction to submit
    /// * `private_key` - The sender's hex-encoded private key
    ///
    /// # Returns
    ///
    /// Result with the handle of the background mining run
    pub fn submit_transaction(
        &self,
        mut transaction: Transaction,
        private_key: &str,
    ) -> Result<MineHandle, BlockchainError> {
        if private_key.is_empty() {
            return Err(TransactionError::MissingPrivateKey.into());
        }

        let miner_address = transaction.sender.clone();

        transaction.sign(private_key)?;
        self.blockchain.add_transaction(transaction)?;

        info!(
            "{}: transaction admitted, starting mining run for {}",
            self.blockchain.name(),
            miner_address
        );

        Ok(Miner::new(miner_address).spawn(self.blockchain.clone()))
    }

    /// Mines a bootstrap block granting the given address the mining reward,
    /// so a freshly created wallet has spendable funds. Called once per
    /// chain by the console front end.
    pub fn initialize_for(&self, address: &Address) -> Result<MineOutcome, BlockchainError> {
        let grant = Transaction::new_system(address.clone(), self.blockchain.mining_reward());
        self.blockchain.add_transaction(grant)?;

        Miner::new(address.clone()).mine(&self.blockchain)
    }

    pub fn balance_of(&self, address: &str) -> Result<f64, BlockchainError> {
        self.blockchain.balance_of(address)
    }

    pub fn get_chain(&self) -> Vec<Block> {
        self.blockchain.get_chain()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.blockchain.pending_transactions()
    }

    pub fn is_chain_valid(&self) -> bool {
        self.blockchain.is_chain_valid()
    }

    pub fn validate_chain(&self) -> Result<(), BlockchainError> {
        self.blockchain.validate_chain()
    }
}
