//! The chain data message, QuorumChain's unit of administrative change

use crate::params::DynamicChainParameters;
use crate::registry::{self, AdminSet, ValidatorSet};
use crate::governance::signature::AdminSignature;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub type Sha256Hash = [u8; 32];

/// An administrative message carrying one or more complete snapshots of
/// network configuration, authorized by a quorum of admin signatures.
///
/// Each optional payload is a complete snapshot of the registry (or
/// parameter set) after the change, never a delta. The payload bitmask is
/// derived from which fields are present, so "bit set ⇔ field non-empty"
/// holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDataMessage {
    /// Hash of the current chain tip. Binds the message to one chain
    /// position so it cannot be replayed against a stale chain state.
    pub prev_block_hash: Sha256Hash,
    pub validators: Option<ValidatorSet>,
    pub admins: Option<AdminSet>,
    pub chain_params: Option<DynamicChainParameters>,
    /// Appended after the digest is computed; never part of it.
    pub admin_signatures: Vec<AdminSignature>,
}

impl ChainDataMessage {
    pub const CVN_PAYLOAD: u32 = 1 << 0;
    pub const CHAIN_ADMINS_PAYLOAD: u32 = 1 << 1;
    pub const CHAIN_PARAMETERS_PAYLOAD: u32 = 1 << 2;

    pub fn new(prev_block_hash: Sha256Hash) -> Self {
        ChainDataMessage {
            prev_block_hash,
            validators: None,
            admins: None,
            chain_params: None,
            admin_signatures: Vec::new(),
        }
    }

    /// Bitmask of the payload kinds present, derived from the fields.
    pub fn payload_kinds(&self) -> u32 {
        let mut kinds = 0;
        if self.validators.is_some() {
            kinds |= Self::CVN_PAYLOAD;
        }
        if self.admins.is_some() {
            kinds |= Self::CHAIN_ADMINS_PAYLOAD;
        }
        if self.chain_params.is_some() {
            kinds |= Self::CHAIN_PARAMETERS_PAYLOAD;
        }
        kinds
    }

    pub fn has_validators(&self) -> bool {
        self.validators.is_some()
    }

    pub fn has_admins(&self) -> bool {
        self.admins.is_some()
    }

    pub fn has_chain_params(&self) -> bool {
        self.chain_params.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.payload_kinds() == 0
    }

    /// The digest admins sign: every field except the signature sequence.
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.prev_block_hash);
        hasher.update(self.payload_kinds().to_le_bytes());
        if let Some(validators) = &self.validators {
            registry::hash_validators_into(validators, &mut hasher);
        }
        if let Some(admins) = &self.admins {
            registry::hash_admins_into(admins, &mut hasher);
        }
        if let Some(params) = &self.chain_params {
            params.hash_into(&mut hasher);
        }
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

impl fmt::Display for ChainDataMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ChainDataMessage(prev_block_hash: {}, payload: {:#05b}, validators: {}, admins: {}, signatures: {})",
            hex::encode(self.prev_block_hash),
            self.payload_kinds(),
            self.validators.as_ref().map_or(0, |v| v.len()),
            self.admins.as_ref().map_or(0, |a| a.len()),
            self.admin_signatures.len()
        )
    }
}
