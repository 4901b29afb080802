//! Cryptographic primitives for QuorumChain

use crate::error::GovernanceError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Type alias for a derived node address, which is a 32-byte hash.
/// We use a fixed-size array for internal type safety and performance.
pub type Address = [u8; 32];

/// Convert an address to a hex string for display.
pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

/// Computes the node address (SHA-256 hash of the compressed public key).
pub fn address_from_public_key(public_key_bytes: &[u8]) -> Result<Address, GovernanceError> {
    validate_public_key(public_key_bytes)?;
    Ok(Sha256::digest(public_key_bytes).into())
}

/// Checks that the given bytes are a fully valid compressed secp256k1 public key.
pub fn validate_public_key(public_key_bytes: &[u8]) -> Result<(), GovernanceError> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(GovernanceError::InvalidPublicKey(format!(
            "public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    PublicKey::from_slice(public_key_bytes)
        .map_err(|e| GovernanceError::InvalidPublicKey(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, GovernanceError> {
        let secret_key = SecretKey::new(&mut OsRng);
        // Using the context from the static Lazy
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, GovernanceError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                GovernanceError::InvalidPrivateKey(format!(
                    "secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                GovernanceError::InvalidPrivateKey(e.to_string())
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Creates a KeyPair from a hex-encoded secret key.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, GovernanceError> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| GovernanceError::InvalidPrivateKey(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Computes the node address (SHA-256 hash of the compressed public key).
    pub fn address(&self) -> Address {
        let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = self.public_key.serialize();
        Sha256::digest(pubkey_bytes).into()
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs a precomputed 32-byte digest and returns the compact signature bytes.
    ///
    /// Administrative signatures are always made over a message digest, never
    /// over raw message bytes, so no additional hashing happens here.
    pub fn sign_digest(
        &self,
        digest: &[u8; 32],
    ) -> Result<[u8; COMPACT_SIGNATURE_SIZE], GovernanceError> {
        let message = Message::from_digest_slice(digest)
            .map_err(|e| GovernanceError::Crypto(format!("failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Verifies an ECDSA signature over a 32-byte digest given the raw compressed
/// public key bytes and compact signature bytes.
pub fn verify_digest_signature(
    public_key_bytes: &[u8],
    digest: &[u8; 32],
    signature_bytes: &[u8],
) -> Result<(), GovernanceError> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(GovernanceError::Crypto(format!(
            "public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(GovernanceError::Crypto(format!(
            "signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| GovernanceError::Crypto(format!("invalid public key: {}", e)))?;

    let message = Message::from_digest_slice(digest)
        .map_err(|e| GovernanceError::Crypto(format!("failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| GovernanceError::Crypto(format!("invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| GovernanceError::Crypto("signature verification failed".to_string()))
}

/// The cryptographic check the quorum verifier delegates to.
///
/// The verifier resolves signer identities and counts distinct verified
/// signatures; whether one signature over one digest verifies under one
/// public key is answered here.
pub trait SignatureChecker: Send + Sync {
    fn check(&self, digest: &[u8; 32], public_key: &[u8], signature: &[u8]) -> bool;
}

/// Production checker backed by the process-wide secp256k1 context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Checker;

impl SignatureChecker for Secp256k1Checker {
    fn check(&self, digest: &[u8; 32], public_key: &[u8], signature: &[u8]) -> bool {
        verify_digest_signature(public_key, digest, signature).is_ok()
    }
}
