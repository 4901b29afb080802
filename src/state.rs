//! Governance state store for QuorumChain
//!
//! The validator registry, the admin registry and the live chain parameters
//! are process-wide state. They are only ever mutated by applying a verified
//! chain data message, and every snapshot-then-modify sequence runs under the
//! store's write guard so concurrent requests cannot lose each other's
//! changes.

use crate::error::{GovernanceError, Result};
use crate::governance::message::ChainDataMessage;
use crate::params::DynamicChainParameters;
use crate::persistence::Persistence;
use crate::registry::{AdminSet, ValidatorSet};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// The three long-lived governance registries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub validators: ValidatorSet,
    pub admins: AdminSet,
    pub chain_params: DynamicChainParameters,
}

impl GovernanceState {
    pub fn new() -> Self {
        GovernanceState {
            validators: ValidatorSet::new(),
            admins: AdminSet::new(),
            chain_params: DynamicChainParameters::default(),
        }
    }
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-guarded owner of the governance state with write-through persistence.
pub struct StateStore {
    inner: RwLock<GovernanceState>,
    persistence: Arc<dyn Persistence>,
}

impl StateStore {
    pub fn new(initial: GovernanceState, persistence: Arc<dyn Persistence>) -> Self {
        StateStore {
            inner: RwLock::new(initial),
            persistence,
        }
    }

    /// Restore the stored state, or start from defaults if none was saved.
    pub fn restore(persistence: Arc<dyn Persistence>) -> Result<Self> {
        let initial = persistence.load_state()?.unwrap_or_default();
        Ok(Self::new(initial, persistence))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, GovernanceState> {
        self.inner.read()
    }

    /// Acquire the write guard. Callers keep it across the whole
    /// build-verify-apply sequence of one request so the sequence is atomic
    /// with respect to concurrent requests.
    pub fn write(&self) -> RwLockWriteGuard<'_, GovernanceState> {
        self.inner.write()
    }

    /// Local application boundary: replace every registry the message
    /// carries a snapshot of, persisting the result before committing it.
    ///
    /// `state` must be the guard obtained from [`StateStore::write`] for this
    /// request. On any failure the live state is left untouched.
    pub fn apply_chain_data(
        &self,
        state: &mut GovernanceState,
        msg: &ChainDataMessage,
    ) -> Result<()> {
        if msg.is_empty() {
            return Err(GovernanceError::EmptyPayload);
        }

        let mut next = state.clone();
        if let Some(validators) = &msg.validators {
            next.validators = validators.clone();
        }
        if let Some(admins) = &msg.admins {
            next.admins = admins.clone();
        }
        if let Some(params) = &msg.chain_params {
            next.chain_params = params.clone();
        }

        self.persistence
            .save_state(&next)
            .map_err(|e| GovernanceError::LocalApplyFailed(e.to_string()))?;

        if msg.has_chain_params() {
            info!("dynamic chain parameters updated: {}", next.chain_params);
        }

        *state = next;
        Ok(())
    }
}
