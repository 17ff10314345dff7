//! Cluster documents and resolver result records

use serde::{Deserialize, Serialize};

/// Provenance fields carried on a stored cluster document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    /// Tool or operator that created the cluster
    pub constructor: Option<String>,
    /// Creation time as recorded by the store
    pub date_created: Option<String>,
    /// Latest modification time as recorded by the store
    pub date_last_modified: Option<String>,
    /// Operator of the latest modification
    pub last_modifier: Option<String>,
}

/// A cluster as stored in the enrichment store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDocument {
    /// 24-character hex identifier
    pub id: String,
    /// Human-assigned name
    pub name: String,
    /// Member addresses
    pub addresses: Vec<String>,
    /// Provenance fields
    #[serde(default)]
    pub metadata: ClusterMetadata,
}

impl ClusterDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            addresses,
            metadata: ClusterMetadata::default(),
        }
    }

    /// True when the given address is a member
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|member| member == address)
    }
}

/// One member of a resolved cluster with its current balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub address: String,
    pub balance: i64,
}

/// Fully resolved cluster: the stored document plus per-member balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// 24-character hex identifier
    pub id: String,
    /// Human-assigned name
    pub name: String,
    /// Number of member wallets
    pub n_wallet: u64,
    /// Provenance fields copied from the stored document
    pub metadata: ClusterMetadata,
    /// Members with their current balances, in stored member order
    pub wallet: Vec<MemberBalance>,
}

/// Membership answer for a single address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMembership {
    /// Identifier of the cluster containing the queried address
    pub cluster_id: String,
    /// Name of that cluster
    pub cluster_name: String,
    /// All member addresses, the queried one included
    pub addresses: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_contains_member() {
        let doc = ClusterDocument::new(
            "507f1f77bcf86cd799439011",
            "exchange-a",
            vec!["alice".to_string(), "bob".to_string()],
        );
        assert!(doc.contains("alice"));
        assert!(!doc.contains("carol"));
    }

    #[test]
    fn test_metadata_defaults_when_absent() {
        let json = r#"{
            "id": "507f1f77bcf86cd799439011",
            "name": "exchange-a",
            "addresses": ["alice"]
        }"#;
        let doc: ClusterDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.metadata, ClusterMetadata::default());
        assert!(doc.metadata.constructor.is_none());
    }
}
