//! Integration tests for the administrative message protocol

use quorumchain::chain::{ChainTip, ChainView, SyncState};
use quorumchain::crypto::{KeyPair, Secp256k1Checker, SignatureChecker};
use quorumchain::error::GovernanceError;
use quorumchain::governance::{
    AddCvnRequest, ChainDataMessage, CvnKind, RemoveCvnRequest, SubmissionController,
    SubmissionOutcome,
};
use quorumchain::persistence::{Database, InMemoryPersistence};
use quorumchain::registry::{ChainAdmin, ValidatorInfo};
use quorumchain::relay::{ChannelRelay, NoopRelay};
use quorumchain::state::{GovernanceState, StateStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A network fixture: validators {1,2}, admins {5,6} with real key pairs,
/// quorum bounds min=2/max=5, chain tip synced at height 100.
struct Network {
    controller: Arc<SubmissionController>,
    store: Arc<StateStore>,
    chain: Arc<ChainTip>,
    admin_keys: BTreeMap<u32, KeyPair>,
}

fn seeded_state(admin_keys: &BTreeMap<u32, KeyPair>) -> Result<GovernanceState, Box<dyn std::error::Error>> {
    let mut state = GovernanceState::new();
    for id in [1u32, 2] {
        let key = KeyPair::generate()?;
        state
            .validators
            .insert(id, ValidatorInfo::new(id, 5, key.public_key_bytes().to_vec()));
    }
    for (id, key) in admin_keys {
        state
            .admins
            .insert(*id, ChainAdmin::new(*id, key.public_key_bytes().to_vec()));
    }
    state.chain_params.min_cvn_signers = 2;
    state.chain_params.max_cvn_signers = 5;
    Ok(state)
}

fn create_network() -> Result<Network, Box<dyn std::error::Error>> {
    let mut admin_keys = BTreeMap::new();
    admin_keys.insert(5u32, KeyPair::generate()?);
    admin_keys.insert(6u32, KeyPair::generate()?);

    let state = seeded_state(&admin_keys)?;
    let store = Arc::new(StateStore::new(state, Arc::new(InMemoryPersistence::new())));
    let chain = Arc::new(ChainTip::new([9u8; 32], 100));
    chain.set_sync_state(SyncState::Synced);
    let controller = Arc::new(SubmissionController::new(
        store.clone(),
        chain.clone(),
        Arc::new(NoopRelay),
        Arc::new(Secp256k1Checker),
    ));

    Ok(Network {
        controller,
        store,
        chain,
        admin_keys,
    })
}

impl Network {
    /// Run the offline signing operation for the given admins over a digest.
    fn sign_digest(
        &self,
        digest_hex: &str,
        signers: &[u32],
    ) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let mut signatures = Vec::new();
        for id in signers {
            let key = &self.admin_keys[id];
            let secret_hex = hex::encode(key.secret_key.secret_bytes());
            signatures.push(self.controller.sign_chain_data(digest_hex, *id, &secret_hex)?);
        }
        Ok(signatures)
    }

    fn add_validator_request(&self, id: u32, signatures: Vec<String>) -> AddCvnRequest {
        let key = KeyPair::generate().expect("key generation");
        AddCvnRequest {
            kind: CvnKind::Validator,
            id,
            public_key: key.public_key_bytes().to_vec(),
            signatures,
            param_overrides: BTreeMap::new(),
        }
    }
}

#[test]
fn test_two_phase_add_flow() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;

    // Phase 1: same request without signatures yields the digest to sign
    let mut request = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    assert_eq!(digest.len(), 64);
    assert_eq!(network.store.read().validators.len(), 2);

    // Phase 2: sign out-of-band, resubmit the identical request
    request.signatures = network.sign_digest(&digest, &[5, 6])?;
    let outcome = network.controller.add_cvn(&request)?;
    match outcome {
        SubmissionOutcome::Submitted(result) => {
            assert_eq!(result.id, "0x00000003");
            assert!(result.address.is_some());
        }
        other => panic!("expected submission, got {other:?}"),
    }

    let state = network.store.read();
    assert_eq!(state.validators.len(), 3);
    assert_eq!(state.validators[&3].height_added, 101);
    Ok(())
}

#[test]
fn test_rebuilt_digest_matches_phase_one() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;
    let request = network.add_validator_request(3, vec![]);

    let first = network.controller.add_cvn(&request)?;
    let second = network.controller.add_cvn(&request)?;
    match (first, second) {
        (SubmissionOutcome::DigestToSign(a), SubmissionOutcome::DigestToSign(b)) => {
            assert_eq!(a, b)
        }
        other => panic!("expected two digests, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_quorum_not_met_with_one_valid_signature() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;

    let mut request = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };

    // One real signature plus one that verifies under no key: the count
    // passes the bounds check but only one distinct signer verifies.
    let mut signatures = network.sign_digest(&digest, &[5])?;
    signatures.push(format!("0x00000006:{}", hex::encode([0u8; 64])));
    request.signatures = signatures;

    let result = network.controller.add_cvn(&request);
    assert!(matches!(
        result,
        Err(GovernanceError::QuorumNotMet {
            verified: 1,
            need: 2
        })
    ));
    assert_eq!(network.store.read().validators.len(), 2);
    Ok(())
}

#[test]
fn test_too_few_signatures_rejected_before_verification() -> Result<(), Box<dyn std::error::Error>>
{
    let network = create_network()?;

    let mut request = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    request.signatures = network.sign_digest(&digest, &[5])?;

    let result = network.controller.add_cvn(&request);
    assert!(matches!(
        result,
        Err(GovernanceError::TooFewSignatures { got: 1, need: 2 })
    ));
    Ok(())
}

#[test]
fn test_add_then_remove_restores_registry() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;
    let original = network.store.read().validators.clone();

    let mut add = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&add)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    add.signatures = network.sign_digest(&digest, &[5, 6])?;
    network.controller.add_cvn(&add)?;

    let mut remove = RemoveCvnRequest {
        kind: CvnKind::Validator,
        id: 3,
        signatures: vec![],
    };
    let digest = match network.controller.remove_cvn(&remove)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    remove.signatures = network.sign_digest(&digest, &[5, 6])?;
    network.controller.remove_cvn(&remove)?;

    assert_eq!(network.store.read().validators, original);
    Ok(())
}

#[test]
fn test_remove_absent_validator_leaves_registry_unmodified(
) -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;
    let original = network.store.read().validators.clone();

    let request = RemoveCvnRequest {
        kind: CvnKind::Validator,
        id: 42,
        signatures: vec![],
    };
    let result = network.controller.remove_cvn(&request);
    assert!(matches!(result, Err(GovernanceError::IdentityNotFound(42))));
    assert_eq!(network.store.read().validators, original);
    Ok(())
}

#[test]
fn test_sync_gate_blocks_otherwise_valid_submission() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;

    let mut request = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    request.signatures = network.sign_digest(&digest, &[5, 6])?;

    network.chain.set_sync_state(SyncState::Syncing);
    let outcome = network.controller.add_cvn(&request)?;
    assert!(matches!(outcome, SubmissionOutcome::NotReady));
    assert_eq!(network.store.read().validators.len(), 2);

    // once sync finishes the same signed request goes through
    network.chain.set_sync_state(SyncState::Synced);
    let outcome = network.controller.add_cvn(&request)?;
    assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
    Ok(())
}

#[test]
fn test_unknown_override_key_is_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let network = create_network()?;
    let before = network.store.read().chain_params.clone();

    let mut overrides = BTreeMap::new();
    overrides.insert("block_spacingg".to_string(), 5);
    let mut request = AddCvnRequest {
        kind: CvnKind::Validator,
        id: 0,
        public_key: vec![],
        signatures: vec![],
        param_overrides: overrides,
    };
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    request.signatures = network.sign_digest(&digest, &[5, 6])?;

    let outcome = network.controller.add_cvn(&request)?;
    assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
    // the typo'd key applied nothing
    assert_eq!(network.store.read().chain_params, before);
    Ok(())
}

#[test]
fn test_concurrent_add_and_remove_keep_both_changes() -> Result<(), Box<dyn std::error::Error>> {
    // Signature content is irrelevant here; the property under test is that
    // the store's locking discipline serializes snapshot-then-modify.
    struct AcceptAll;
    impl SignatureChecker for AcceptAll {
        fn check(&self, _digest: &[u8; 32], _public_key: &[u8], _signature: &[u8]) -> bool {
            true
        }
    }

    let mut admin_keys = BTreeMap::new();
    admin_keys.insert(5u32, KeyPair::generate()?);
    admin_keys.insert(6u32, KeyPair::generate()?);
    let state = seeded_state(&admin_keys)?;
    let store = Arc::new(StateStore::new(state, Arc::new(InMemoryPersistence::new())));
    let chain = Arc::new(ChainTip::new([9u8; 32], 100));
    chain.set_sync_state(SyncState::Synced);
    let controller = Arc::new(SubmissionController::new(
        store.clone(),
        chain,
        Arc::new(NoopRelay),
        Arc::new(AcceptAll),
    ));

    let signatures = vec!["0x05:aa".to_string(), "0x06:bb".to_string()];

    let add_controller = controller.clone();
    let add_sigs = signatures.clone();
    let adder = std::thread::spawn(move || {
        let key = KeyPair::generate().expect("key generation");
        let request = AddCvnRequest {
            kind: CvnKind::Validator,
            id: 3,
            public_key: key.public_key_bytes().to_vec(),
            signatures: add_sigs,
            param_overrides: BTreeMap::new(),
        };
        add_controller.add_cvn(&request).expect("add submission")
    });

    let remove_controller = controller.clone();
    let remover = std::thread::spawn(move || {
        let request = RemoveCvnRequest {
            kind: CvnKind::Validator,
            id: 2,
            signatures,
        };
        remove_controller
            .remove_cvn(&request)
            .expect("remove submission")
    });

    assert!(matches!(
        adder.join().unwrap(),
        SubmissionOutcome::Submitted(_)
    ));
    assert!(matches!(
        remover.join().unwrap(),
        SubmissionOutcome::Submitted(_)
    ));

    // both changes landed: {1,2} + 3 - 2 = {1,3}
    let validators = store.read().validators.clone();
    assert_eq!(validators.len(), 2);
    assert!(validators.contains_key(&1));
    assert!(validators.contains_key(&3));
    assert!(!validators.contains_key(&2));
    Ok(())
}

#[test]
fn test_submitted_message_reaches_relay() -> Result<(), Box<dyn std::error::Error>> {
    let mut admin_keys = BTreeMap::new();
    admin_keys.insert(5u32, KeyPair::generate()?);
    admin_keys.insert(6u32, KeyPair::generate()?);
    let state = seeded_state(&admin_keys)?;
    let store = Arc::new(StateStore::new(state, Arc::new(InMemoryPersistence::new())));
    let chain = Arc::new(ChainTip::new([9u8; 32], 100));
    chain.set_sync_state(SyncState::Synced);
    let (relay, rx) = ChannelRelay::new();
    let controller = Arc::new(SubmissionController::new(
        store.clone(),
        chain.clone(),
        Arc::new(relay),
        Arc::new(Secp256k1Checker),
    ));
    let network = Network {
        controller,
        store,
        chain,
        admin_keys,
    };

    let mut request = network.add_validator_request(3, vec![]);
    let digest = match network.controller.add_cvn(&request)? {
        SubmissionOutcome::DigestToSign(digest) => digest,
        other => panic!("expected digest, got {other:?}"),
    };
    assert!(rx.try_recv().is_err());

    request.signatures = network.sign_digest(&digest, &[5, 6])?;
    network.controller.add_cvn(&request)?;

    let encoded = rx.try_recv()?;
    let relayed: ChainDataMessage = bincode::deserialize(&encoded)?;
    assert!(relayed.has_validators());
    assert_eq!(relayed.prev_block_hash, network.chain.tip_hash());
    assert_eq!(hex::encode(relayed.hash()), digest);
    Ok(())
}

#[test]
fn test_governance_state_survives_restart() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("governance.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    let mut admin_keys = BTreeMap::new();
    admin_keys.insert(5u32, KeyPair::generate()?);
    admin_keys.insert(6u32, KeyPair::generate()?);
    let state = seeded_state(&admin_keys)?;

    {
        let store = Arc::new(StateStore::new(state, Arc::new(Database::open(db_path)?)));
        let chain = Arc::new(ChainTip::new([9u8; 32], 100));
        chain.set_sync_state(SyncState::Synced);
        let controller = Arc::new(SubmissionController::new(
            store.clone(),
            chain.clone(),
            Arc::new(NoopRelay),
            Arc::new(Secp256k1Checker),
        ));
        let network = Network {
            controller,
            store,
            chain,
            admin_keys,
        };

        let mut request = network.add_validator_request(3, vec![]);
        let digest = match network.controller.add_cvn(&request)? {
            SubmissionOutcome::DigestToSign(digest) => digest,
            other => panic!("expected digest, got {other:?}"),
        };
        request.signatures = network.sign_digest(&digest, &[5, 6])?;
        network.controller.add_cvn(&request)?;
    }

    // a fresh store restored from the same database sees the new validator
    let store = StateStore::restore(Arc::new(Database::open(db_path)?))?;
    let state = store.read();
    assert_eq!(state.validators.len(), 3);
    assert!(state.validators.contains_key(&3));
    assert_eq!(state.chain_params.min_cvn_signers, 2);
    Ok(())
}
