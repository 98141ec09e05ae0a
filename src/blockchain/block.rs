use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::transaction::Transaction;

/// Placeholder hash carried by a block until its hash is first computed
pub const UNMINED_HASH: &str = "0";

/// Represents a block in the blockchain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Hash of the previous block
    previous_hash: String,

    /// Hash of this block ("0" until first computed)
    hash: String,

    /// Creation time in unix seconds
    timestamp: String,

    /// Proof-of-work nonce, varied during mining
    nonce: u64,

    /// Transactions included in this block, fixed at construction
    transactions: Vec<Transaction>,
}

impl Block {
    /// Creates a new candidate block
    ///
    /// # Arguments
    ///
    /// * `previous_hash` - The hash of the previous block
    /// * `transactions` - The transactions to include in the block
    ///
    /// # Returns
    ///
    /// A new Block instance with nonce 0 and the placeholder hash
    pub fn new(previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Block {
            previous_hash,
            hash: UNMINED_HASH.to_string(),
            timestamp: Utc::now().timestamp().to_string(),
            nonce: 0,
            transactions,
        }
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Calculates the hash of the block from its current field state.
    ///
    /// The preimage is the previous hash, the timestamp, the nonce and the
    /// concatenation of all transaction signatures in order.
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let signatures: String = self
            .transactions
            .iter()
            .map(|tx| tx.signature.as_str())
            .collect();

        let data = format!(
            "{}{}{}{}",
            self.previous_hash, self.timestamp, self.nonce, signatures
        );

        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());

        format!("{:x}", hasher.finalize())
    }

    /// Recomputes and stores the block's hash. Called after every nonce
    /// increment in the mining loop.
    pub fn generate_hash(&mut self) {
        self.hash = self.calculate_hash();
    }

    /// Increments the proof-of-work nonce by one
    pub fn increment_nonce(&mut self) {
        self.nonce += 1;
    }

    /// Checks the block's structural validity against a target difficulty:
    /// the stored hash must have `difficulty` leading zero characters and
    /// every contained transaction must verify.
    pub fn is_valid(&self, difficulty: usize) -> bool {
        self.is_valid_with_policy(difficulty, true)
    }

    /// Validity check with the signature leg made optional, for chains whose
    /// policy waives signature verification.
    pub fn is_valid_with_policy(&self, difficulty: usize, require_signatures: bool) -> bool {
        let valid_hash = self.hash.starts_with(&"0".repeat(difficulty));

        let valid_transactions =
            !require_signatures || self.transactions.iter().all(|tx| tx.verify_signature());

        valid_hash && valid_transactions
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: String) {
        self.previous_hash = previous_hash;
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}
