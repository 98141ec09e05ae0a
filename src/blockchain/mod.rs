// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure and proof-of-work validity
// - Blockchain structure with the pending-transaction pool
// - Signed transaction structure
// - Cryptography utilities (ed25519 keys, hex addresses)
// - Miner with background runs and cancellation
// - Ledger service wiring admission to mining

pub mod block;
pub mod chain;
pub mod crypto;
pub mod miner;
pub mod service;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, ChainConfig};
pub use crypto::{Address, Wallet};
pub use miner::{MineHandle, MineOutcome, Miner};
pub use service::LedgerService;
pub use transaction::Transaction;
