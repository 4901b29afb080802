//! Admin quorum verification for chain data messages
//!
//! Cardinality bounds come from the live [`DynamicChainParameters`], so
//! quorum policy is itself subject to administrative change through the same
//! protocol it protects.

use crate::crypto::SignatureChecker;
use crate::error::{GovernanceError, Result};
use crate::governance::message::Sha256Hash;
use crate::governance::signature::AdminSignature;
use crate::params::DynamicChainParameters;
use crate::registry::{format_id, AdminSet, ChainAdmin};
use std::collections::HashSet;
use tracing::warn;

/// Verify that `signatures` forms a valid quorum over `digest`.
///
/// Never mutates any registry; success means exactly "this digest carries
/// enough distinct, recognized, cryptographically valid admin signatures".
pub fn verify_quorum(
    digest: &Sha256Hash,
    signatures: &[AdminSignature],
    params: &DynamicChainParameters,
    admins: &AdminSet,
    checker: &dyn SignatureChecker,
) -> Result<()> {
    if signatures.len() < params.min_cvn_signers as usize {
        return Err(GovernanceError::TooFewSignatures {
            got: signatures.len(),
            need: params.min_cvn_signers,
        });
    }
    if signatures.len() > params.max_cvn_signers as usize {
        return Err(GovernanceError::TooManySignatures {
            got: signatures.len(),
            max: params.max_cvn_signers,
        });
    }

    // Resolve every signer before doing any cryptographic work.
    let mut resolved: Vec<(&AdminSignature, &ChainAdmin)> = Vec::with_capacity(signatures.len());
    for sig in signatures {
        let admin = admins
            .get(&sig.signer_id)
            .ok_or(GovernanceError::UnknownSigner(sig.signer_id))?;
        resolved.push((sig, admin));
    }

    // Count distinct signers whose signatures verify; a duplicated signer id
    // never counts twice toward the quorum.
    let mut verified: HashSet<u32> = HashSet::new();
    for (sig, admin) in resolved {
        if checker.check(digest, &admin.public_key, &sig.signature) {
            verified.insert(sig.signer_id);
        } else {
            warn!(
                "admin signature from {} failed verification",
                format_id(sig.signer_id)
            );
        }
    }

    if verified.len() < params.min_cvn_signers as usize {
        return Err(GovernanceError::QuorumNotMet {
            verified: verified.len(),
            need: params.min_cvn_signers,
        });
    }

    Ok(())
}

/// Single-signature path: resolve one signer and check one signature.
///
/// Used by the offline signing operation to self-check a freshly produced
/// signature before the operator transmits it.
pub fn verify_admin_signature(
    digest: &Sha256Hash,
    sig: &AdminSignature,
    admins: &AdminSet,
    checker: &dyn SignatureChecker,
) -> Result<()> {
    let admin = admins
        .get(&sig.signer_id)
        .ok_or(GovernanceError::UnknownSigner(sig.signer_id))?;

    if !checker.check(digest, &admin.public_key, &sig.signature) {
        return Err(GovernanceError::Crypto(format!(
            "signature from {} does not verify under the registered admin key",
            format_id(sig.signer_id)
        )));
    }
    Ok(())
}
