//! Change heuristic catalogue
//!
//! The scoring engine does not know what any heuristic looks at. It consumes
//! an ordered table of [`WeightedDetector`] entries, each pairing an opaque
//! detector function with the weight its votes carry. [`default_catalogue`]
//! builds that table from the built-in reference detectors and a
//! [`HeuristicWeights`] configuration; callers with their own detectors can
//! hand the engine any table they like.

pub mod detectors;

pub use detectors::is_coinjoin;

use crate::data_structures::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Score a set of outputs must reach before they are considered change
pub const DEFAULT_SCORE_THRESHOLD: u32 = 8;

/// A change detector: transaction in, flagged output indexes out
pub type DetectorFn = fn(&Transaction) -> BTreeSet<u32>;

/// Identifies one of the built-in change heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicKind {
    AddressReuse,
    PeelingChain,
    PowerOfTenAmount,
    OptimalChange,
    ClientBehaviorPattern,
    AddressTypeSwitch,
    LocktimeSet,
    LegacyAddressType,
    FixedFeePattern,
    AlreadySpent,
}

impl Display for HeuristicKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            HeuristicKind::AddressReuse => "address-reuse",
            HeuristicKind::PeelingChain => "peeling-chain",
            HeuristicKind::PowerOfTenAmount => "power-of-ten-amount",
            HeuristicKind::OptimalChange => "optimal-change",
            HeuristicKind::ClientBehaviorPattern => "client-behavior-pattern",
            HeuristicKind::AddressTypeSwitch => "address-type-switch",
            HeuristicKind::LocktimeSet => "locktime-set",
            HeuristicKind::LegacyAddressType => "legacy-address-type",
            HeuristicKind::FixedFeePattern => "fixed-fee-pattern",
            HeuristicKind::AlreadySpent => "already-spent",
        };
        write!(fmt, "{name}")
    }
}

/// Per-heuristic vote weights
///
/// Any subset of fields may appear in a configuration file; missing fields
/// take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    #[serde(default = "default_address_reuse")]
    pub address_reuse: u32,
    #[serde(default = "default_peeling_chain")]
    pub peeling_chain: u32,
    #[serde(default = "default_power_of_ten")]
    pub power_of_ten: u32,
    #[serde(default = "default_optimal_change")]
    pub optimal_change: u32,
    #[serde(default = "default_client_behavior")]
    pub client_behavior: u32,
    #[serde(default = "default_address_type_switch")]
    pub address_type_switch: u32,
    #[serde(default = "default_locktime_set")]
    pub locktime_set: u32,
    #[serde(default = "default_legacy_address_type")]
    pub legacy_address_type: u32,
    #[serde(default = "default_fixed_fee")]
    pub fixed_fee: u32,
    #[serde(default = "default_already_spent")]
    pub already_spent: u32,
}

// === Default weight helpers ===

fn default_address_reuse() -> u32 {
    3
}

fn default_peeling_chain() -> u32 {
    3
}

fn default_power_of_ten() -> u32 {
    2
}

fn default_optimal_change() -> u32 {
    2
}

fn default_client_behavior() -> u32 {
    2
}

fn default_address_type_switch() -> u32 {
    1
}

fn default_locktime_set() -> u32 {
    1
}

fn default_legacy_address_type() -> u32 {
    1
}

fn default_fixed_fee() -> u32 {
    1
}

fn default_already_spent() -> u32 {
    1
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            address_reuse: default_address_reuse(),
            peeling_chain: default_peeling_chain(),
            power_of_ten: default_power_of_ten(),
            optimal_change: default_optimal_change(),
            client_behavior: default_client_behavior(),
            address_type_switch: default_address_type_switch(),
            locktime_set: default_locktime_set(),
            legacy_address_type: default_legacy_address_type(),
            fixed_fee: default_fixed_fee(),
            already_spent: default_already_spent(),
        }
    }
}

impl HeuristicWeights {
    /// Weight assigned to the given heuristic
    pub fn weight_of(&self, kind: HeuristicKind) -> u32 {
        match kind {
            HeuristicKind::AddressReuse => self.address_reuse,
            HeuristicKind::PeelingChain => self.peeling_chain,
            HeuristicKind::PowerOfTenAmount => self.power_of_ten,
            HeuristicKind::OptimalChange => self.optimal_change,
            HeuristicKind::ClientBehaviorPattern => self.client_behavior,
            HeuristicKind::AddressTypeSwitch => self.address_type_switch,
            HeuristicKind::LocktimeSet => self.locktime_set,
            HeuristicKind::LegacyAddressType => self.legacy_address_type,
            HeuristicKind::FixedFeePattern => self.fixed_fee,
            HeuristicKind::AlreadySpent => self.already_spent,
        }
    }
}

/// A detector together with the weight its votes carry
#[derive(Debug, Clone, Copy)]
pub struct WeightedDetector {
    pub kind: HeuristicKind,
    pub weight: u32,
    pub detector: DetectorFn,
}

impl WeightedDetector {
    pub fn new(kind: HeuristicKind, weight: u32, detector: DetectorFn) -> Self {
        Self {
            kind,
            weight,
            detector,
        }
    }

    /// Run the detector against a transaction
    pub fn flag(&self, tx: &Transaction) -> BTreeSet<u32> {
        (self.detector)(tx)
    }
}

/// The built-in detectors paired with the configured weights
pub fn default_catalogue(weights: &HeuristicWeights) -> Vec<WeightedDetector> {
    vec![
        WeightedDetector::new(
            HeuristicKind::AddressReuse,
            weights.address_reuse,
            detectors::address_reuse,
        ),
        WeightedDetector::new(
            HeuristicKind::PeelingChain,
            weights.peeling_chain,
            detectors::peeling_chain,
        ),
        WeightedDetector::new(
            HeuristicKind::PowerOfTenAmount,
            weights.power_of_ten,
            detectors::power_of_ten,
        ),
        WeightedDetector::new(
            HeuristicKind::OptimalChange,
            weights.optimal_change,
            detectors::optimal_change,
        ),
        WeightedDetector::new(
            HeuristicKind::AddressTypeSwitch,
            weights.address_type_switch,
            detectors::address_type_switch,
        ),
        WeightedDetector::new(
            HeuristicKind::LocktimeSet,
            weights.locktime_set,
            detectors::locktime_set,
        ),
        WeightedDetector::new(
            HeuristicKind::ClientBehaviorPattern,
            weights.client_behavior,
            detectors::client_behavior,
        ),
        WeightedDetector::new(
            HeuristicKind::LegacyAddressType,
            weights.legacy_address_type,
            detectors::legacy_address_type,
        ),
        WeightedDetector::new(
            HeuristicKind::FixedFeePattern,
            weights.fixed_fee,
            detectors::fixed_fee,
        ),
        WeightedDetector::new(
            HeuristicKind::AlreadySpent,
            weights.already_spent,
            detectors::already_spent,
        ),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_weights_match_documented_values() {
        let weights = HeuristicWeights::default();
        assert_eq!(weights.address_reuse, 3);
        assert_eq!(weights.peeling_chain, 3);
        assert_eq!(weights.power_of_ten, 2);
        assert_eq!(weights.optimal_change, 2);
        assert_eq!(weights.client_behavior, 2);
        assert_eq!(weights.address_type_switch, 1);
        assert_eq!(weights.locktime_set, 1);
        assert_eq!(weights.legacy_address_type, 1);
        assert_eq!(weights.fixed_fee, 1);
        assert_eq!(weights.already_spent, 1);
        assert_eq!(DEFAULT_SCORE_THRESHOLD, 8);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let weights: HeuristicWeights =
            serde_json::from_str(r#"{"address_reuse": 5}"#).unwrap();
        assert_eq!(weights.address_reuse, 5);
        assert_eq!(weights.peeling_chain, 3);
        assert_eq!(weights.already_spent, 1);
    }

    #[test]
    fn test_catalogue_covers_every_kind_once() {
        let catalogue = default_catalogue(&HeuristicWeights::default());
        assert_eq!(catalogue.len(), 10);
        let kinds: HashSet<HeuristicKind> =
            catalogue.iter().map(|entry| entry.kind).collect();
        assert_eq!(kinds.len(), 10);
    }

    #[test]
    fn test_catalogue_weights_follow_config() {
        let mut weights = HeuristicWeights::default();
        weights.locktime_set = 7;
        let catalogue = default_catalogue(&weights);
        for entry in &catalogue {
            assert_eq!(entry.weight, weights.weight_of(entry.kind));
        }
        let locktime = catalogue
            .iter()
            .find(|entry| entry.kind == HeuristicKind::LocktimeSet)
            .unwrap();
        assert_eq!(locktime.weight, 7);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&HeuristicKind::ClientBehaviorPattern).unwrap();
        assert_eq!(json, "\"client-behavior-pattern\"");
        assert_eq!(
            HeuristicKind::PowerOfTenAmount.to_string(),
            "power-of-ten-amount"
        );
    }
}
