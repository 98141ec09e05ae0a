use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::crypto::{self, Address, CryptoError};

/// Sender address of synthetic transactions (genesis, mining rewards).
/// System transactions carry no signature and bypass balance checks.
pub const SYSTEM_SENDER: &str = "System";

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Private key cannot be empty")]
    MissingPrivateKey,

    #[error("Transaction already signed")]
    AlreadySigned,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// An immutable value-transfer record.
///
/// Constructed unsigned, signed exactly once, then embedded into a block and
/// never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address (the sentinel "System" for synthetic transactions)
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Creation time in unix seconds
    pub timestamp: String,

    /// Hex-encoded signature, empty until signed
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Creates a new unsigned transaction
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    ///
    /// # Returns
    ///
    /// A new Transaction instance
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Self {
        Transaction {
            sender,
            recipient,
            amount,
            timestamp: Utc::now().timestamp().to_string(),
            signature: String::new(),
        }
    }

    /// Creates a new system transaction (genesis or mining reward)
    ///
    /// # Arguments
    ///
    /// * `recipient` - The address receiving the amount
    /// * `amount` - The amount to issue
    ///
    /// # Returns
    ///
    /// A new Transaction instance with the "System" sender
    pub fn new_system(recipient: Address, amount: f64) -> Self {
        Transaction::new(Address::new(SYSTEM_SENDER), recipient, amount)
    }

    /// Checks if the transaction is a system transaction
    pub fn is_system(&self) -> bool {
        self.sender.0 == SYSTEM_SENDER
    }

    /// Computes the transaction digest: the SHA-256 hash of the canonical
    /// `sender:recipient:amount:timestamp` concatenation. This is the value
    /// that gets signed.
    pub fn digest(&self) -> [u8; 32] {
        let data = format!(
            "{}:{}:{}:{}",
            self.sender, self.recipient, self.amount, self.timestamp
        );

        Sha256::digest(data.as_bytes()).into()
    }

    /// Signs the transaction with a hex-encoded private key
    ///
    /// # Arguments
    ///
    /// * `private_key` - The sender's hex-encoded private key
    ///
    /// # Returns
    ///
    /// Result indicating success or failure; the signature is set at most once
    pub fn sign(&mut self, private_key: &str) -> Result<(), TransactionError> {
        if private_key.is_empty() {
            return Err(TransactionError::MissingPrivateKey);
        }

        if !self.signature.is_empty() {
            return Err(TransactionError::AlreadySigned);
        }

        let signature = crypto::sign_digest(&self.digest(), private_key)?;
        self.signature = signature;

        Ok(())
    }

    /// Verifies the transaction's signature.
    ///
    /// System transactions verify unconditionally. A user transaction with no
    /// signature is invalid. Signature and key decoding faults are converted
    /// to `false` here so callers can reject the transaction cleanly.
    pub fn verify_signature(&self) -> bool {
        if self.is_system() {
            return true;
        }

        if self.signature.is_empty() {
            return false;
        }

        // The sender address doubles as the verification key
        match crypto::verify_digest(&self.signature, &self.digest(), &self.sender.0) {
            Ok(valid) => valid,
            Err(err) => {
                warn!("Signature verification failed for {}: {}", self.sender, err);
                false
            }
        }
    }
}
