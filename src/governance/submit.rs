//! Two-phase submission of administrative changes
//!
//! Every administrative operation runs through here: build a chain data
//! message from the requested change, then either hand back its digest for
//! out-of-band signing (no signatures supplied) or verify the supplied
//! quorum and submit the message to the local state store and the relay.

use crate::chain::ChainView;
use crate::crypto::{self, KeyPair, SignatureChecker};
use crate::error::{GovernanceError, Result};
use crate::governance::message::{ChainDataMessage, Sha256Hash};
use crate::governance::quorum::{verify_admin_signature, verify_quorum};
use crate::governance::signature::{parse_admin_signatures, AdminSignature};
use crate::registry::{
    format_id, with_admin_added, with_validator_added, without_admin, without_validator,
    ChainAdmin, ValidatorInfo,
};
use crate::relay::ChainDataRelay;
use crate::state::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Which registry an add/remove targets. Selected once at the boundary;
/// everything downstream branches on the enum, never on a string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvnKind {
    Validator,
    Admin,
}

impl fmt::Display for CvnKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CvnKind::Validator => write!(f, "CVN"),
            CvnKind::Admin => write!(f, "chain admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddCvnRequest {
    pub kind: CvnKind,
    pub id: u32,
    /// Compressed public key of the new entry. May be empty, in which case
    /// the request must carry parameter overrides (params-only update).
    pub public_key: Vec<u8>,
    /// `id:sig` tokens; empty means "give me the digest to sign".
    pub signatures: Vec<String>,
    pub param_overrides: BTreeMap<String, u32>,
}

#[derive(Debug, Clone)]
pub struct RemoveCvnRequest {
    pub kind: CvnKind,
    pub id: u32,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCvnResult {
    pub kind: CvnKind,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Node address derived from the public key; validator adds only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_params: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveCvnResult {
    pub kind: CvnKind,
    pub id: String,
}

/// Node status surface for operators.
#[derive(Debug, Clone, Serialize)]
pub struct CvnInfo {
    pub tip_hash: String,
    pub tip_height: u64,
    pub initial_download: bool,
    pub validator_count: usize,
    pub admin_count: usize,
    pub chain_params: crate::params::DynamicChainParameters,
}

/// Result of one pass through the submission state machine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "result")]
pub enum SubmissionOutcome<T> {
    /// No signatures were supplied; sign this digest out-of-band and
    /// resubmit the identical request with the signatures attached.
    DigestToSign(String),
    /// The quorum verified but the node has not finished initial sync;
    /// nothing was submitted.
    NotReady,
    Submitted(T),
}

pub struct SubmissionController {
    store: Arc<StateStore>,
    chain: Arc<dyn ChainView>,
    relay: Arc<dyn ChainDataRelay>,
    checker: Arc<dyn SignatureChecker>,
}

impl SubmissionController {
    pub fn new(
        store: Arc<StateStore>,
        chain: Arc<dyn ChainView>,
        relay: Arc<dyn ChainDataRelay>,
        checker: Arc<dyn SignatureChecker>,
    ) -> Self {
        SubmissionController {
            store,
            chain,
            relay,
            checker,
        }
    }

    /// Add a validator or admin to the network, and/or update the dynamic
    /// chain parameters.
    pub fn add_cvn(&self, req: &AddCvnRequest) -> Result<SubmissionOutcome<AddCvnResult>> {
        // Malformed input is rejected before any registry read.
        let signatures = parse_admin_signatures(&req.signatures)?;
        let has_key = !req.public_key.is_empty();
        if has_key {
            crypto::validate_public_key(&req.public_key)?;
        } else if req.param_overrides.is_empty() {
            return Err(GovernanceError::EmptyPayload);
        }

        let mut state = self.store.write();

        let mut msg = ChainDataMessage::new(self.chain.tip_hash());
        if has_key {
            match req.kind {
                CvnKind::Validator => {
                    let entry = ValidatorInfo::new(
                        req.id,
                        self.chain.tip_height() + 1,
                        req.public_key.clone(),
                    );
                    msg.validators = Some(with_validator_added(&state.validators, entry)?);
                }
                CvnKind::Admin => {
                    let entry = ChainAdmin::new(req.id, req.public_key.clone());
                    msg.admins = Some(with_admin_added(&state.admins, entry)?);
                }
            }
        }
        if !req.param_overrides.is_empty() {
            msg.chain_params = Some(state.chain_params.overlay(&req.param_overrides));
        }

        if signatures.is_empty() {
            return Ok(SubmissionOutcome::DigestToSign(msg.hash_hex()));
        }
        msg.admin_signatures = signatures;

        verify_quorum(
            &msg.hash(),
            &msg.admin_signatures,
            &state.chain_params,
            &state.admins,
            self.checker.as_ref(),
        )?;

        if self.chain.is_initial_download() {
            info!("initial block download in progress; chain data not submitted");
            return Ok(SubmissionOutcome::NotReady);
        }

        let mut result = AddCvnResult {
            kind: req.kind,
            id: format_id(req.id),
            public_key: None,
            address: None,
            chain_params: None,
        };
        if msg.has_validators() {
            let address = crypto::address_to_hex(&crypto::address_from_public_key(&req.public_key)?);
            info!(
                "about to add CVN {} with public key {} ({}) to the network",
                format_id(req.id),
                hex::encode(&req.public_key),
                address
            );
            result.public_key = Some(hex::encode(&req.public_key));
            result.address = Some(address);
        }
        if msg.has_admins() {
            info!(
                "about to add chain admin {} with public key {} to the network",
                format_id(req.id),
                hex::encode(&req.public_key)
            );
            result.public_key = Some(hex::encode(&req.public_key));
        }
        if let Some(params) = &msg.chain_params {
            info!(
                "about to update dynamic chain parameters on the network: {}",
                params
            );
            result.chain_params = Some(params.to_string());
        }

        self.store.apply_chain_data(&mut state, &msg)?;
        self.relay.relay(&msg);

        Ok(SubmissionOutcome::Submitted(result))
    }

    /// Remove a validator or admin from the network.
    pub fn remove_cvn(&self, req: &RemoveCvnRequest) -> Result<SubmissionOutcome<RemoveCvnResult>> {
        let signatures = parse_admin_signatures(&req.signatures)?;

        let mut state = self.store.write();

        let mut msg = ChainDataMessage::new(self.chain.tip_hash());
        match req.kind {
            CvnKind::Validator => {
                msg.validators = Some(without_validator(&state.validators, req.id)?);
            }
            CvnKind::Admin => {
                msg.admins = Some(without_admin(&state.admins, req.id)?);
            }
        }

        if signatures.is_empty() {
            return Ok(SubmissionOutcome::DigestToSign(msg.hash_hex()));
        }
        msg.admin_signatures = signatures;

        verify_quorum(
            &msg.hash(),
            &msg.admin_signatures,
            &state.chain_params,
            &state.admins,
            self.checker.as_ref(),
        )?;

        if self.chain.is_initial_download() {
            info!("initial block download in progress; chain data not submitted");
            return Ok(SubmissionOutcome::NotReady);
        }

        info!(
            "about to remove {} {} from the network",
            req.kind,
            format_id(req.id)
        );

        self.store.apply_chain_data(&mut state, &msg)?;
        self.relay.relay(&msg);

        Ok(SubmissionOutcome::Submitted(RemoveCvnResult {
            kind: req.kind,
            id: format_id(req.id),
        }))
    }

    /// Offline signing operation: sign a digest with an admin private key and
    /// self-check the result before the operator transmits it.
    ///
    /// Pure with respect to governance state; never part of the submission
    /// state machine.
    pub fn sign_chain_data(
        &self,
        digest_hex: &str,
        signer_id: u32,
        private_key_hex: &str,
    ) -> Result<String> {
        let digest = parse_digest_hex(digest_hex)?;
        let keypair = KeyPair::from_secret_hex(private_key_hex)?;
        let signature = keypair.sign_digest(&digest)?;
        let sig = AdminSignature::new(signer_id, signature.to_vec());

        // Catch key/identity mismatches here, not after the signature has
        // been copied into a submission.
        let state = self.store.read();
        verify_admin_signature(&digest, &sig, &state.admins, self.checker.as_ref())?;

        Ok(sig.to_string())
    }

    /// Current state of the node as seen by the governance core.
    pub fn cvn_info(&self) -> CvnInfo {
        let state = self.store.read();
        CvnInfo {
            tip_hash: hex::encode(self.chain.tip_hash()),
            tip_height: self.chain.tip_height(),
            initial_download: self.chain.is_initial_download(),
            validator_count: state.validators.len(),
            admin_count: state.admins.len(),
            chain_params: state.chain_params.clone(),
        }
    }
}

fn parse_digest_hex(digest_hex: &str) -> Result<Sha256Hash> {
    let bytes = hex::decode(digest_hex.trim_start_matches("0x"))
        .map_err(|e| GovernanceError::Crypto(format!("invalid chain data digest: {}", e)))?;
    bytes.try_into().map_err(|_| {
        GovernanceError::Crypto("chain data digest must be 32 bytes of hex".to_string())
    })
}
