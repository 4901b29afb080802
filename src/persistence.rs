//! Database persistence layer for QuorumChain
//!
//! Stores the governance registries and the live parameter set. The core
//! protocol treats storage as an external service; everything behind the
//! [`Persistence`] trait is replaceable.

use crate::error::{GovernanceError, Result};
use crate::params::DynamicChainParameters;
use crate::registry::{AdminSet, ChainAdmin, ValidatorInfo, ValidatorSet};
use crate::state::GovernanceState;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// Abstraction for persistence backends. Implementations should provide
/// atomic saving/loading of the full governance state.
pub trait Persistence: Send + Sync {
    fn save_state(&self, state: &GovernanceState) -> Result<()>;
    /// Returns `None` when no state has ever been saved.
    fn load_state(&self) -> Result<Option<GovernanceState>>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| GovernanceError::Database(format!("failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS validators (
                node_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            GovernanceError::Database(format!("failed to create validators table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS admins (
                admin_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| GovernanceError::Database(format!("failed to create admins table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            GovernanceError::Database(format!("failed to create metadata table: {}", e))
        })?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }
}

impl Persistence for Database {
    fn save_state(&self, state: &GovernanceState) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GovernanceError::Database("Mutex poisoned".to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| GovernanceError::Database(format!("failed to start transaction: {}", e)))?;

        // Whole-set replacement keeps the stored snapshot exactly equal to
        // the live one.
        tx.execute("DELETE FROM validators", [])
            .map_err(|e| GovernanceError::Database(format!("failed to clear validators: {}", e)))?;
        for validator in state.validators.values() {
            let data = serde_json::to_string(validator).map_err(|e| {
                GovernanceError::Database(format!("failed to serialize validator: {}", e))
            })?;
            tx.execute(
                "INSERT INTO validators (node_id, data) VALUES (?1, ?2)",
                params![validator.node_id as i64, data],
            )
            .map_err(|e| GovernanceError::Database(format!("failed to save validator: {}", e)))?;
        }

        tx.execute("DELETE FROM admins", [])
            .map_err(|e| GovernanceError::Database(format!("failed to clear admins: {}", e)))?;
        for admin in state.admins.values() {
            let data = serde_json::to_string(admin).map_err(|e| {
                GovernanceError::Database(format!("failed to serialize admin: {}", e))
            })?;
            tx.execute(
                "INSERT INTO admins (admin_id, data) VALUES (?1, ?2)",
                params![admin.admin_id as i64, data],
            )
            .map_err(|e| GovernanceError::Database(format!("failed to save admin: {}", e)))?;
        }

        let params_json = serde_json::to_string(&state.chain_params).map_err(|e| {
            GovernanceError::Database(format!("failed to serialize chain params: {}", e))
        })?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('chain_params', ?1)",
            params![params_json],
        )
        .map_err(|e| GovernanceError::Database(format!("failed to save chain params: {}", e)))?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('saved_at', ?1)",
            params![chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| GovernanceError::Database(format!("failed to save metadata: {}", e)))?;

        tx.commit()
            .map_err(|e| GovernanceError::Database(format!("failed to commit transaction: {}", e)))
    }

    fn load_state(&self) -> Result<Option<GovernanceState>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GovernanceError::Database("Mutex poisoned".to_string()))?;

        let params_json: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'chain_params'",
                [],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(GovernanceError::from(other)),
            })?;

        let Some(params_json) = params_json else {
            return Ok(None);
        };

        let chain_params: DynamicChainParameters = serde_json::from_str(&params_json)
            .map_err(|e| {
                GovernanceError::Database(format!("failed to parse chain params: {}", e))
            })?;

        let mut validators = ValidatorSet::new();
        {
            let mut stmt = conn
                .prepare("SELECT data FROM validators")
                .map_err(GovernanceError::from)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(GovernanceError::from)?;
            for row in rows {
                let data = row.map_err(GovernanceError::from)?;
                let validator: ValidatorInfo = serde_json::from_str(&data).map_err(|e| {
                    GovernanceError::Database(format!("failed to parse validator: {}", e))
                })?;
                validators.insert(validator.node_id, validator);
            }
        }

        let mut admins = AdminSet::new();
        {
            let mut stmt = conn
                .prepare("SELECT data FROM admins")
                .map_err(GovernanceError::from)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(GovernanceError::from)?;
            for row in rows {
                let data = row.map_err(GovernanceError::from)?;
                let admin: ChainAdmin = serde_json::from_str(&data).map_err(|e| {
                    GovernanceError::Database(format!("failed to parse admin: {}", e))
                })?;
                admins.insert(admin.admin_id, admin);
            }
        }

        Ok(Some(GovernanceState {
            validators,
            admins,
            chain_params,
        }))
    }
}

/// In-memory backend used in tests and as a fallback when the database
/// cannot be opened.
#[derive(Default)]
pub struct InMemoryPersistence {
    state: Mutex<Option<GovernanceState>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_state(&self, state: &GovernanceState) -> Result<()> {
        let mut slot = self
            .state
            .lock()
            .map_err(|_| GovernanceError::Database("Mutex poisoned".to_string()))?;
        *slot = Some(state.clone());
        Ok(())
    }

    fn load_state(&self) -> Result<Option<GovernanceState>> {
        let slot = self
            .state
            .lock()
            .map_err(|_| GovernanceError::Database("Mutex poisoned".to_string()))?;
        Ok(slot.clone())
    }
}
