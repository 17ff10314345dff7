//! Off-chain enrichment annotations
//!
//! Wallet profiles and curated address clusters live outside the chain
//! snapshot. [`EnrichmentStore`] is the lookup seam the rest of the engine
//! talks to; [`MemoryEnrichmentStore`] backs tests and chain-only
//! deployments, and the `storage` feature adds a SQLite implementation.

use crate::data_structures::ClusterDocument;
use crate::errors::{AnalyticsError, AnalyticsResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "storage")]
pub mod sqlite;

#[cfg(feature = "storage")]
pub use sqlite::SqliteEnrichmentStore;

/// Lookup interface for profiles and cluster documents
///
/// Implementations return `Ok(None)` for a clean miss and reserve errors for
/// backend failures.
pub trait EnrichmentStore: Send + Sync {
    /// Free-form profile document attached to an address
    fn find_profile(&self, address: &str) -> AnalyticsResult<Option<Value>>;

    /// Cluster with the given identifier
    fn find_cluster_by_id(&self, id: &str) -> AnalyticsResult<Option<ClusterDocument>>;

    /// Cluster with the given display name
    fn find_cluster_by_name(&self, name: &str) -> AnalyticsResult<Option<ClusterDocument>>;

    /// Cluster whose member list contains the address
    fn find_cluster_containing(&self, address: &str) -> AnalyticsResult<Option<ClusterDocument>>;
}

/// In-memory store for tests and chain-only deployments
#[derive(Debug, Default)]
pub struct MemoryEnrichmentStore {
    profiles: Mutex<HashMap<String, Value>>,
    clusters: Mutex<Vec<ClusterDocument>>,
}

impl MemoryEnrichmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a profile document to an address, replacing any previous one
    pub fn insert_profile(&self, address: &str, profile: Value) -> AnalyticsResult<()> {
        self.lock_profiles()?.insert(address.to_string(), profile);
        Ok(())
    }

    /// Add a cluster document; an id collision replaces the stored document
    pub fn insert_cluster(&self, cluster: ClusterDocument) -> AnalyticsResult<()> {
        let mut clusters = self.lock_clusters()?;
        match clusters.iter_mut().find(|c| c.id == cluster.id) {
            Some(existing) => *existing = cluster,
            None => clusters.push(cluster),
        }
        Ok(())
    }

    fn lock_profiles(&self) -> AnalyticsResult<MutexGuard<'_, HashMap<String, Value>>> {
        self.profiles
            .lock()
            .map_err(|_| AnalyticsError::Internal("profile store lock poisoned".to_string()))
    }

    fn lock_clusters(&self) -> AnalyticsResult<MutexGuard<'_, Vec<ClusterDocument>>> {
        self.clusters
            .lock()
            .map_err(|_| AnalyticsError::Internal("cluster store lock poisoned".to_string()))
    }
}

impl EnrichmentStore for MemoryEnrichmentStore {
    fn find_profile(&self, address: &str) -> AnalyticsResult<Option<Value>> {
        Ok(self.lock_profiles()?.get(address).cloned())
    }

    fn find_cluster_by_id(&self, id: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        Ok(self.lock_clusters()?.iter().find(|c| c.id == id).cloned())
    }

    fn find_cluster_by_name(&self, name: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        Ok(self
            .lock_clusters()?
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    fn find_cluster_containing(&self, address: &str) -> AnalyticsResult<Option<ClusterDocument>> {
        // Insertion order decides when an address was curated into more
        // than one cluster
        Ok(self
            .lock_clusters()?
            .iter()
            .find(|c| c.contains(address))
            .cloned())
    }
}
