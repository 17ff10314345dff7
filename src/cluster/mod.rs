//! Cluster resolution
//!
//! Curated clusters are looked up by a single key that is either a stored
//! identifier or a display name. The key's shape decides which lookup runs;
//! there is no fallback from one to the other, so an identifier-shaped key
//! that matches nothing is a miss even when a cluster carries that name.

use std::sync::Arc;

use tracing::debug;

use crate::chain::ChainGraphProvider;
use crate::data_structures::{ClusterMembership, ClusterRecord, MemberBalance};
use crate::enrichment::EnrichmentStore;
use crate::errors::{AnalyticsError, AnalyticsResult};

const CLUSTER_ID_LENGTH: usize = 24;

/// True when the key has the shape of a stored cluster identifier
pub fn is_cluster_id(key: &str) -> bool {
    key.len() == CLUSTER_ID_LENGTH && key.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Resolves cluster keys against the enrichment store and prices the
/// members against the chain
pub struct ClusterResolver {
    chain: Arc<dyn ChainGraphProvider>,
    store: Arc<dyn EnrichmentStore>,
}

impl ClusterResolver {
    pub fn new(chain: Arc<dyn ChainGraphProvider>, store: Arc<dyn EnrichmentStore>) -> Self {
        Self { chain, store }
    }

    /// Resolve a cluster key to its document plus per-member balances
    ///
    /// Member balances are gathered one by one in stored member order; the
    /// first member the chain does not know fails the whole resolution.
    pub fn resolve(&self, key: &str) -> AnalyticsResult<ClusterRecord> {
        let by_id = is_cluster_id(key);
        debug!(key, by_id, "resolving cluster");

        let document = if by_id {
            self.store.find_cluster_by_id(key)?
        } else {
            self.store.find_cluster_by_name(key)?
        }
        .ok_or_else(|| AnalyticsError::unknown_cluster(key))?;

        let mut wallet = Vec::with_capacity(document.addresses.len());
        for address in &document.addresses {
            let balance = self.chain.current_balance(address)?;
            wallet.push(MemberBalance {
                address: address.clone(),
                balance,
            });
        }

        Ok(ClusterRecord {
            id: document.id,
            name: document.name,
            n_wallet: wallet.len() as u64,
            metadata: document.metadata,
            wallet,
        })
    }

    /// Cluster containing a chain-known address
    pub fn membership(&self, address: &str) -> AnalyticsResult<ClusterMembership> {
        self.chain.resolve_address(address)?;
        let document = self.store.find_cluster_containing(address)?.ok_or_else(|| {
            AnalyticsError::NotFound(format!("address {address} is not in any cluster"))
        })?;
        Ok(ClusterMembership {
            cluster_id: document.id,
            cluster_name: document.name,
            addresses: document.addresses,
        })
    }
}
