use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Private key is not set or is empty")]
    MissingPrivateKey,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a wallet address.
///
/// For user wallets the string is the hex-encoded ed25519 public key, so the
/// address is directly usable as the verification key for anything the wallet
/// signed. The sentinel sender `"System"` never decodes to a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Creates an address from an arbitrary string
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into())
    }

    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(hex::encode(public_key.as_bytes()))
    }

    /// Converts the address back to a public key
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        decode_public_key(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decodes a hex-encoded ed25519 public key
fn decode_public_key(public_key_hex: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey("Invalid public key length".to_string())
    })?;

    VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Signs a digest with a hex-encoded private key and returns the signature
/// as a hex string.
///
/// # Arguments
///
/// * `digest` - The digest bytes to sign
/// * `private_key` - The hex-encoded private key
///
/// # Returns
///
/// Result with the hex-encoded signature
pub fn sign_digest(digest: &[u8], private_key: &str) -> Result<String, CryptoError> {
    if private_key.is_empty() {
        return Err(CryptoError::MissingPrivateKey);
    }

    let bytes = hex::decode(private_key)
        .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
    })?;

    let signing_key = SigningKey::from_bytes(&key_bytes);
    let signature = signing_key.sign(digest);

    Ok(hex::encode(signature.to_bytes()))
}

/// Verifies a hex-encoded signature over a digest against a hex-encoded
/// public key.
///
/// Returns `Ok(false)` for a signature that does not verify; decoding
/// failures are reported as errors and converted to "invalid" at the
/// transaction boundary.
pub fn verify_digest(
    signature: &str,
    digest: &[u8],
    public_key: &str,
) -> Result<bool, CryptoError> {
    let signature_bytes = hex::decode(signature)
        .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

    let signature_bytes: [u8; 64] = signature_bytes.try_into().map_err(|_| {
        CryptoError::InvalidSignature("Invalid signature length".to_string())
    })?;

    let signature = Signature::from_bytes(&signature_bytes);
    let public_key = decode_public_key(public_key)?;

    match public_key.verify(digest, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Result<Self, CryptoError> {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Ok(Wallet {
            signing_key,
            verifying_key,
            address,
        })
    }

    /// Creates a wallet from an existing secret key
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_array: [u8; 32] = secret_key_bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
        })?;

        let signing_key = SigningKey::from_bytes(&bytes_array);
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = Address::from_public_key(&verifying_key);

        Ok(Wallet {
            signing_key,
            verifying_key,
            address,
        })
    }

    /// Creates a wallet from a hex-encoded secret key
    pub fn from_secret_hex(secret_key_hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(secret_key_hex)
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        Self::from_secret_key(&bytes)
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Exports the wallet's secret key as bytes
    pub fn export_secret_key(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    /// Exports the wallet's secret key as a hex string
    pub fn export_secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new().unwrap();

        // The address is the hex-encoded 32-byte public key
        assert_eq!(wallet.address().0.len(), 64);
        assert!(hex::decode(&wallet.address().0).is_ok());
    }

    #[test]
    fn test_signing_and_verification() {
        let wallet = Wallet::new().unwrap();
        let digest = b"some digest bytes";
        let private_key = wallet.export_secret_hex();

        let signature = sign_digest(digest, &private_key).unwrap();

        let result = verify_digest(&signature, digest, &wallet.address().0).unwrap();
        assert!(result);

        // Verify with wrong digest
        let result = verify_digest(&signature, b"other digest", &wallet.address().0).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_sign_with_empty_key() {
        let result = sign_digest(b"digest", "");
        assert!(matches!(result, Err(CryptoError::MissingPrivateKey)));
    }

    #[test]
    fn test_verify_with_malformed_public_key() {
        let wallet = Wallet::new().unwrap();
        let signature = sign_digest(b"digest", &wallet.export_secret_hex()).unwrap();

        // "System" is not a hex public key
        let result = verify_digest(&signature, b"digest", "System");
        assert!(result.is_err());
    }

    #[test]
    fn test_address_conversion() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.address();

        let public_key = address.to_public_key().unwrap();

        assert_eq!(public_key.as_bytes(), wallet.public_key().as_bytes());
    }

    #[test]
    fn test_wallet_roundtrip_from_secret() {
        let wallet = Wallet::new().unwrap();
        let exported = wallet.export_secret_hex();

        let restored = Wallet::from_secret_hex(&exported).unwrap();
        assert_eq!(restored.address(), wallet.address());
    }
}
