//! Address script types and resolved address records

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Script template an address was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Pay to raw public key
    Pubkey,
    /// Pay to public key hash
    PubkeyHash,
    /// Pay to script hash
    ScriptHash,
    /// Bare multisig
    Multisig,
    /// Pay to witness public key hash
    WitnessPubkeyHash,
    /// Pay to witness script hash
    WitnessScriptHash,
    /// Anything the provider could not classify
    Nonstandard,
}

impl AddressType {
    /// True for the pre-witness script templates
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            AddressType::Pubkey
                | AddressType::PubkeyHash
                | AddressType::ScriptHash
                | AddressType::Multisig
        )
    }

    /// True for the witness script templates
    pub fn is_witness(&self) -> bool {
        matches!(
            self,
            AddressType::WitnessPubkeyHash | AddressType::WitnessScriptHash
        )
    }
}

impl Default for AddressType {
    fn default() -> Self {
        AddressType::Nonstandard
    }
}

impl Display for AddressType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            AddressType::Pubkey => "pubkey",
            AddressType::PubkeyHash => "pubkey_hash",
            AddressType::ScriptHash => "script_hash",
            AddressType::Multisig => "multisig",
            AddressType::WitnessPubkeyHash => "witness_pubkey_hash",
            AddressType::WitnessScriptHash => "witness_script_hash",
            AddressType::Nonstandard => "nonstandard",
        };
        write!(fmt, "{name}")
    }
}

/// An address the chain graph provider was able to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Canonical string form
    pub address: String,
    /// Script template
    pub address_type: AddressType,
}

impl AddressRecord {
    pub fn new(address: impl Into<String>, address_type: AddressType) -> Self {
        Self {
            address: address.into(),
            address_type,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_legacy_split() {
        assert!(AddressType::PubkeyHash.is_legacy());
        assert!(AddressType::ScriptHash.is_legacy());
        assert!(!AddressType::WitnessPubkeyHash.is_legacy());
        assert!(!AddressType::Nonstandard.is_legacy());

        assert!(AddressType::WitnessScriptHash.is_witness());
        assert!(!AddressType::Multisig.is_witness());
        // Nonstandard is neither legacy nor witness
        assert!(!AddressType::Nonstandard.is_witness());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&AddressType::WitnessPubkeyHash).unwrap();
        assert_eq!(json, "\"witness_pubkey_hash\"");
        let back: AddressType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AddressType::WitnessPubkeyHash);
    }

    #[test]
    fn test_display_matches_serde() {
        assert_eq!(AddressType::ScriptHash.to_string(), "script_hash");
        assert_eq!(AddressType::Nonstandard.to_string(), "nonstandard");
    }
}
