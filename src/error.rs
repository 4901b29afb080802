//! Error types for QuorumChain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GovernanceError {
    #[error("not enough signatures supplied (got {got}, but need at least {need} to sign)")]
    TooFewSignatures { got: usize, need: u32 },
    #[error("too many signatures supplied: {got} ({max} max)")]
    TooManySignatures { got: usize, max: u32 },
    #[error("signer 0x{0:08x} is not a registered chain admin")]
    UnknownSigner(u32),
    #[error("quorum not met: {verified} of {need} required signatures verified")]
    QuorumNotMet { verified: usize, need: u32 },
    #[error("signature {index} is of invalid format: {reason}")]
    SignatureFormat { index: usize, reason: String },
    #[error("identity 0x{0:08x} not found in the registry")]
    IdentityNotFound(u32),
    #[error("identity 0x{0:08x} already exists in the registry")]
    DuplicateIdentity(u32),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("chain data message carries no payload")]
    EmptyPayload,
    #[error("cryptographic error: {0}")]
    Crypto(String),
    #[error("failed to apply chain data locally: {0}")]
    LocalApplyFailed(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for GovernanceError {
    fn from(err: std::io::Error) -> Self {
        GovernanceError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for GovernanceError {
    fn from(err: rusqlite::Error) -> Self {
        GovernanceError::Database(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, GovernanceError>;
