//! In-memory chain graph provider backed by a JSON snapshot
//!
//! The snapshot format is deliberately forgiving: spent flags, back-links
//! and input values may be omitted, because the provider re-derives all of
//! them from the inputs' outpoint references while loading. What comes out
//! is the fully linked graph the rest of the engine expects.

use crate::chain::{ChainGraphProvider, TransactionStream};
use crate::data_structures::{AddressRecord, AddressType, OutPoint, SpentBy, Transaction};
use crate::errors::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Raw transaction set as persisted on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub transactions: Vec<Transaction>,
}

impl ChainSnapshot {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Parse a snapshot from its JSON form
    pub fn from_json(json: &str) -> AnalyticsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnalyticsError::InvalidInput(format!("malformed chain snapshot: {e}")))
    }

    /// Read and parse a snapshot file
    pub fn from_file(path: &Path) -> AnalyticsResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::InvalidInput(format!("cannot read snapshot {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

/// Chain graph provider serving a fixed set of transactions from memory
#[derive(Debug, Default)]
pub struct MemoryChainProvider {
    /// All transactions, ascending by stable index
    transactions: Vec<Arc<Transaction>>,
    /// Hash to position in `transactions`
    by_hash: HashMap<String, usize>,
    /// Every address seen in the snapshot with its script type
    address_types: HashMap<String, AddressType>,
    /// Positions of transactions spending from each address, ascending
    sent_index: HashMap<String, Vec<usize>>,
    /// Positions of transactions paying each address, ascending
    received_index: HashMap<String, Vec<usize>>,
    /// Sum of unspent output values per address
    balances: HashMap<String, i64>,
}

impl MemoryChainProvider {
    /// Link and index a snapshot
    pub fn new(snapshot: ChainSnapshot) -> AnalyticsResult<Self> {
        let mut transactions = snapshot.transactions;
        transactions.sort_by_key(|tx| tx.tx_index);
        for pair in transactions.windows(2) {
            if pair[0].tx_index == pair[1].tx_index {
                return Err(AnalyticsError::InvalidInput(format!(
                    "duplicate stable index {} in snapshot",
                    pair[0].tx_index
                )));
            }
        }

        // Who spends which outpoint, and what each outpoint is worth
        let mut spenders: HashMap<OutPoint, (String, u32)> = HashMap::new();
        let mut output_values: HashMap<OutPoint, i64> = HashMap::new();
        for tx in &transactions {
            for output in &tx.outputs {
                output_values.insert(output.outpoint(&tx.hash), output.value);
            }
            if tx.coinbase {
                continue;
            }
            for input in &tx.inputs {
                spenders.insert(input.spends.clone(), (tx.hash.clone(), input.index));
            }
        }

        for tx in &mut transactions {
            let txid = tx.hash.clone();
            for output in &mut tx.outputs {
                match spenders.get(&output.outpoint(&txid)) {
                    Some((spender, input_index)) => {
                        output.spent_by = Some(SpentBy {
                            txid: spender.clone(),
                            input_index: *input_index,
                            value: output.value,
                        });
                        output.spent = true;
                    }
                    None => {
                        output.spent = false;
                        output.spent_by = None;
                    }
                }
            }
            if tx.coinbase {
                continue;
            }
            for input in &mut tx.inputs {
                // Outpoints outside the snapshot keep their declared value
                if let Some(value) = output_values.get(&input.spends) {
                    input.value = *value;
                }
            }
        }

        let mut provider = MemoryChainProvider::default();
        for (pos, tx) in transactions.iter().enumerate() {
            if provider.by_hash.insert(tx.hash.clone(), pos).is_some() {
                return Err(AnalyticsError::InvalidInput(format!(
                    "duplicate transaction hash {} in snapshot",
                    tx.hash
                )));
            }

            let mut spent_here: BTreeSet<&str> = BTreeSet::new();
            let mut paid_here: BTreeSet<&str> = BTreeSet::new();
            if !tx.coinbase {
                for input in &tx.inputs {
                    if input.address.is_empty() {
                        continue;
                    }
                    provider
                        .address_types
                        .entry(input.address.clone())
                        .or_insert(input.address_type);
                    spent_here.insert(&input.address);
                }
            }
            for output in &tx.outputs {
                if output.address.is_empty() {
                    continue;
                }
                provider
                    .address_types
                    .entry(output.address.clone())
                    .or_insert(output.address_type);
                paid_here.insert(&output.address);
                if !output.spent {
                    *provider.balances.entry(output.address.clone()).or_insert(0) +=
                        output.value;
                }
            }
            for address in spent_here {
                provider
                    .sent_index
                    .entry(address.to_string())
                    .or_default()
                    .push(pos);
            }
            for address in paid_here {
                provider
                    .received_index
                    .entry(address.to_string())
                    .or_default()
                    .push(pos);
            }
        }
        provider.transactions = transactions.into_iter().map(Arc::new).collect();
        Ok(provider)
    }

    /// Load a snapshot file and build the provider from it
    pub fn from_file(path: &Path) -> AnalyticsResult<Self> {
        Self::new(ChainSnapshot::from_file(path)?)
    }

    /// Provider with no transactions at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of transactions served
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of distinct addresses seen
    pub fn address_count(&self) -> usize {
        self.address_types.len()
    }

    fn require_known(&self, address: &str) -> AnalyticsResult<AddressType> {
        self.address_types
            .get(address)
            .copied()
            .ok_or_else(|| AnalyticsError::unknown_address(address))
    }

    fn stream_positions<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> TransactionStream<'a> {
        let positions = positions.map(|v| v.as_slice()).unwrap_or(&[]);
        Box::new(
            positions
                .iter()
                .map(move |&pos| Arc::clone(&self.transactions[pos])),
        )
    }
}

impl ChainGraphProvider for MemoryChainProvider {
    fn resolve_transaction(&self, hash: &str) -> AnalyticsResult<Arc<Transaction>> {
        self.by_hash
            .get(hash)
            .map(|&pos| Arc::clone(&self.transactions[pos]))
            .ok_or_else(|| AnalyticsError::unknown_transaction(hash))
    }

    fn resolve_address(&self, address: &str) -> AnalyticsResult<AddressRecord> {
        let address_type = self.require_known(address)?;
        Ok(AddressRecord::new(address, address_type))
    }

    fn sent_transactions<'a>(&'a self, address: &str) -> AnalyticsResult<TransactionStream<'a>> {
        self.require_known(address)?;
        Ok(self.stream_positions(self.sent_index.get(address)))
    }

    fn received_transactions<'a>(
        &'a self,
        address: &str,
    ) -> AnalyticsResult<TransactionStream<'a>> {
        self.require_known(address)?;
        Ok(self.stream_positions(self.received_index.get(address)))
    }

    fn current_balance(&self, address: &str) -> AnalyticsResult<i64> {
        self.require_known(address)?;
        Ok(self.balances.get(address).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_structures::{TxInput, TxOutput};

    fn output(index: u32, value: i64, address: &str) -> TxOutput {
        TxOutput {
            index,
            value,
            address: address.to_string(),
            address_type: AddressType::PubkeyHash,
            spent: false,
            spent_by: None,
        }
    }

    fn input(index: u32, spends: OutPoint, address: &str) -> TxInput {
        TxInput {
            index,
            value: 0,
            address: address.to_string(),
            address_type: AddressType::PubkeyHash,
            spends,
        }
    }

    /// Coinbase pays alice 50_000; alice pays bob 30_000 with 19_000 change;
    /// bob pays carol 29_000.
    fn sample_snapshot() -> ChainSnapshot {
        let coinbase = Transaction {
            hash: "c0".to_string(),
            block_height: 1,
            timestamp: 1_600_000_000,
            size: 100,
            version: 1,
            locktime: 0,
            coinbase: true,
            inputs: vec![],
            outputs: vec![output(0, 50_000, "alice")],
            tx_index: 1,
        };
        let spend = Transaction {
            hash: "a1".to_string(),
            block_height: 2,
            timestamp: 1_600_000_600,
            size: 250,
            version: 2,
            locktime: 0,
            coinbase: false,
            inputs: vec![input(0, OutPoint::new("c0", 0), "alice")],
            outputs: vec![output(0, 30_000, "bob"), output(1, 19_000, "alice")],
            tx_index: 2,
        };
        let onward = Transaction {
            hash: "b2".to_string(),
            block_height: 3,
            timestamp: 1_600_001_200,
            size: 250,
            version: 2,
            locktime: 0,
            coinbase: false,
            inputs: vec![input(0, OutPoint::new("a1", 0), "bob")],
            outputs: vec![output(0, 29_000, "carol")],
            tx_index: 3,
        };
        ChainSnapshot::new(vec![spend, coinbase, onward])
    }

    #[test]
    fn test_linking_derives_spent_back_references() {
        let provider = MemoryChainProvider::new(sample_snapshot()).unwrap();
        let coinbase = provider.resolve_transaction("c0").unwrap();
        let spent_by = coinbase.outputs[0].spent_by.as_ref().unwrap();
        assert!(coinbase.outputs[0].spent);
        assert_eq!(spent_by.txid, "a1");
        assert_eq!(spent_by.input_index, 0);
        assert_eq!(spent_by.value, 50_000);

        let spend = provider.resolve_transaction("a1").unwrap();
        assert!(spend.outputs[0].spent);
        assert!(!spend.outputs[1].spent);
        assert!(spend.outputs[1].spent_by.is_none());
    }

    #[test]
    fn test_linking_backfills_input_values() {
        let provider = MemoryChainProvider::new(sample_snapshot()).unwrap();
        let spend = provider.resolve_transaction("a1").unwrap();
        assert_eq!(spend.inputs[0].value, 50_000);
        assert_eq!(spend.fee(), 1_000);
    }

    #[test]
    fn test_balances_count_only_unspent_outputs() {
        let provider = MemoryChainProvider::new(sample_snapshot()).unwrap();
        assert_eq!(provider.current_balance("alice").unwrap(), 19_000);
        assert_eq!(provider.current_balance("bob").unwrap(), 0);
        assert_eq!(provider.current_balance("carol").unwrap(), 29_000);
    }

    #[test]
    fn test_streams_are_ordered_and_complete() {
        let provider = MemoryChainProvider::new(sample_snapshot()).unwrap();
        let received: Vec<String> = provider
            .received_transactions("alice")
            .unwrap()
            .map(|tx| tx.hash.clone())
            .collect();
        assert_eq!(received, vec!["c0", "a1"]);

        let sent: Vec<String> = provider
            .sent_transactions("alice")
            .unwrap()
            .map(|tx| tx.hash.clone())
            .collect();
        assert_eq!(sent, vec!["a1"]);

        // Union through the trait's default merge delivers "a1" once
        let all: Vec<String> = provider
            .transactions("alice")
            .unwrap()
            .map(|tx| tx.hash.clone())
            .collect();
        assert_eq!(all, vec!["c0", "a1"]);
    }

    #[test]
    fn test_unknown_lookups_are_invalid_input() {
        let provider = MemoryChainProvider::new(sample_snapshot()).unwrap();
        assert!(matches!(
            provider.resolve_transaction("ff"),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            provider.resolve_address("mallory"),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            provider.sent_transactions("mallory"),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            provider.current_balance("mallory"),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_hash_is_rejected() {
        let mut snapshot = sample_snapshot();
        let mut dup = snapshot.transactions[0].clone();
        dup.tx_index = 99;
        snapshot.transactions.push(dup);
        assert!(matches!(
            MemoryChainProvider::new(snapshot),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_stable_index_is_rejected() {
        let mut snapshot = sample_snapshot();
        let mut dup = snapshot.transactions[0].clone();
        dup.hash = "ee".to_string();
        snapshot.transactions.push(dup);
        assert!(matches!(
            MemoryChainProvider::new(snapshot),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let json = r#"{
            "transactions": [
                {
                    "hash": "c0",
                    "block_height": 1,
                    "timestamp": 1600000000,
                    "coinbase": true,
                    "outputs": [
                        {"index": 0, "value": 5000, "address": "alice", "address_type": "pubkey_hash"}
                    ],
                    "tx_index": 1
                }
            ]
        }"#;
        let provider = MemoryChainProvider::new(ChainSnapshot::from_json(json).unwrap()).unwrap();
        assert_eq!(provider.transaction_count(), 1);
        assert_eq!(provider.current_balance("alice").unwrap(), 5_000);
    }

    #[test]
    fn test_malformed_snapshot_is_invalid_input() {
        assert!(matches!(
            ChainSnapshot::from_json("{"),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }
}
