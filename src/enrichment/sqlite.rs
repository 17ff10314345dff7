//! SQLite-backed enrichment store
//!
//! Profiles and cluster documents are stored as JSON text, with a member
//! table alongside the cluster documents so address containment checks stay
//! indexed instead of scanning documents.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::data_structures::ClusterDocument;
use crate::errors::{AnalyticsError, AnalyticsResult};

use super::EnrichmentStore;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS profiles (
        address TEXT PRIMARY KEY,
        document TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS clusters (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        document TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS cluster_members (
        cluster_id TEXT NOT NULL,
        address TEXT NOT NULL,
        PRIMARY KEY (cluster_id, address)
    );

    CREATE INDEX IF NOT EXISTS idx_clusters_name ON clusters (name);
    CREATE INDEX IF NOT EXISTS idx_cluster_members_address ON cluster_members (address);
"#;

/// Enrichment store persisted in a SQLite database
pub struct SqliteEnrichmentStore {
    connection: Mutex<Connection>,
}

impl SqliteEnrichmentStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: &Path) -> AnalyticsResult<Self> {
        let connection = Connection::open(path).map_err(|e| {
            AnalyticsError::Internal(format!(
                "cannot open enrichment database {}: {e}",
                path.display()
            ))
        })?;
        Self::with_connection(connection)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> AnalyticsResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|e| AnalyticsError::Internal(format!("cannot open in-memory database: {e}")))?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> AnalyticsResult<Self> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Store a profile document for an address, replacing any previous one
    pub fn upsert_profile(&self, address: &str, profile: &Value) -> AnalyticsResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO profiles (address, document) VALUES (?1, ?2)",
            params![address, profile.to_string()],
        )?;
        Ok(())
    }

    /// Store a cluster document and rebuild its member rows
    pub fn upsert_cluster(&self, cluster: &ClusterDocument) -> AnalyticsResult<()> {
        let document = serde_json::to_string(cluster)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO clusters (id, name, document) VALUES (?1, ?2, ?3)",
            params![cluster.id, cluster.name, document],
        )?;
        tx.execute(
            "DELETE FROM cluster_members WHERE cluster_id = ?1",
            params![cluster.id],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO cluster_members (cluster_id, address) VALUES (?1, ?2)",
            )?;
            for address in &cluster.addresses {
                insert.execute(params![cluster.id, address])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> AnalyticsResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| AnalyticsError::Internal("enrichment database lock poisoned".to_string()))
    }

    fn fetch_cluster(&self, sql: &str, key: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let document: Option<String> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        match document {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

impl EnrichmentStore for SqliteEnrichmentStore {
    fn find_profile(&self, address: &str) -> AnalyticsResult<Option<Value>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT document FROM profiles WHERE address = ?1")?;
        let document: Option<String> = stmt
            .query_row(params![address], |row| row.get(0))
            .optional()?;
        match document {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn find_cluster_by_id(&self, id: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        self.fetch_cluster("SELECT document FROM clusters WHERE id = ?1", id)
    }

    fn find_cluster_by_name(&self, name: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        // Names are not unique; the lowest id wins so repeated lookups agree
        self.fetch_cluster(
            "SELECT document FROM clusters WHERE name = ?1 ORDER BY id LIMIT 1",
            name,
        )
    }

    fn find_cluster_containing(&self, address: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        self.fetch_cluster(
            "SELECT c.document FROM clusters c \
             JOIN cluster_members m ON m.cluster_id = c.id \
             WHERE m.address = ?1 ORDER BY c.id LIMIT 1",
            address,
        )
    }
}
