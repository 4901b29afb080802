//! Validator and admin registries for QuorumChain
//!
//! Registries are keyed maps of identity to entry. Administrative messages
//! never carry deltas; an add or remove is expressed as a complete snapshot
//! of the registry after the change, produced by the pure mutators below.

use crate::error::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A certified validator node entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub node_id: u32,
    /// Block height at which this validator becomes active
    pub height_added: u64,
    #[serde(with = "serde_bytes")]
    pub public_key: Vec<u8>,
}

impl ValidatorInfo {
    pub fn new(node_id: u32, height_added: u64, public_key: Vec<u8>) -> Self {
        ValidatorInfo {
            node_id,
            height_added,
            public_key,
        }
    }
}

/// A chain admin entry, authorized to co-sign administrative messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAdmin {
    pub admin_id: u32,
    #[serde(with = "serde_bytes")]
    pub public_key: Vec<u8>,
}

impl ChainAdmin {
    pub fn new(admin_id: u32, public_key: Vec<u8>) -> Self {
        ChainAdmin {
            admin_id,
            public_key,
        }
    }
}

// BTreeMap so registry snapshots iterate in ascending identity order and
// digests over them are canonical.
pub type ValidatorSet = BTreeMap<u32, ValidatorInfo>;
pub type AdminSet = BTreeMap<u32, ChainAdmin>;

/// Render an identity the way it appears on the wire and in logs.
pub fn format_id(id: u32) -> String {
    format!("0x{:08x}", id)
}

/// Snapshot of `current` plus one validator.
pub fn with_validator_added(current: &ValidatorSet, entry: ValidatorInfo) -> Result<ValidatorSet> {
    if current.contains_key(&entry.node_id) {
        return Err(GovernanceError::DuplicateIdentity(entry.node_id));
    }
    let mut next = current.clone();
    next.insert(entry.node_id, entry);
    Ok(next)
}

/// Snapshot of `current` without the given validator.
pub fn without_validator(current: &ValidatorSet, node_id: u32) -> Result<ValidatorSet> {
    if !current.contains_key(&node_id) {
        return Err(GovernanceError::IdentityNotFound(node_id));
    }
    let mut next = current.clone();
    next.remove(&node_id);
    Ok(next)
}

/// Snapshot of `current` plus one admin.
pub fn with_admin_added(current: &AdminSet, entry: ChainAdmin) -> Result<AdminSet> {
    if current.contains_key(&entry.admin_id) {
        return Err(GovernanceError::DuplicateIdentity(entry.admin_id));
    }
    let mut next = current.clone();
    next.insert(entry.admin_id, entry);
    Ok(next)
}

/// Snapshot of `current` without the given admin.
pub fn without_admin(current: &AdminSet, admin_id: u32) -> Result<AdminSet> {
    if !current.contains_key(&admin_id) {
        return Err(GovernanceError::IdentityNotFound(admin_id));
    }
    let mut next = current.clone();
    next.remove(&admin_id);
    Ok(next)
}

/// Feed a validator set into a digest in ascending identity order.
pub fn hash_validators_into(set: &ValidatorSet, hasher: &mut Sha256) {
    for validator in set.values() {
        hasher.update(validator.node_id.to_le_bytes());
        hasher.update(validator.height_added.to_le_bytes());
        hasher.update(&validator.public_key);
    }
}

/// Feed an admin set into a digest in ascending identity order.
pub fn hash_admins_into(set: &AdminSet, hasher: &mut Sha256) {
    for admin in set.values() {
        hasher.update(admin.admin_id.to_le_bytes());
        hasher.update(&admin.public_key);
    }
}
