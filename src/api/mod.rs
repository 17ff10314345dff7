//! Analytics facade
//!
//! [`AnalyticsApi`] wires the chain provider, the enrichment store, the
//! change classifier and the aggregation pipeline into the operations a
//! transport layer exposes. Every operation resolves its subject first, so
//! a bad hash or address fails before any work is done.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::WalletAggregator;
use crate::chain::ChainGraphProvider;
use crate::cluster::ClusterResolver;
use crate::config::EngineConfig;
use crate::data_structures::{
    ClusterMembership, ClusterRecord, OutPoint, SpendingOutpoint, Transaction, WalletHistory,
    WalletSummary,
};
use crate::enrichment::EnrichmentStore;
use crate::errors::AnalyticsResult;
use crate::heuristics::is_coinjoin;
use crate::scoring::ChangeClassifier;

/// Placeholder for scripts that do not resolve to an address
pub const UNKNOWN_ADDRESS: &str = "Unknown";

/// One consumed output in a transaction report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReport {
    /// Position of the input in the spending transaction
    pub index: u32,
    /// Outpoint of the consumed output
    pub spends: OutPoint,
    /// Address of the consumed output, or [`UNKNOWN_ADDRESS`]
    pub address: String,
    /// Value of the consumed output
    pub value: i64,
}

/// One created output in a transaction report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputReport {
    /// Position of the output in the transaction
    pub index: u32,
    /// Receiving address, or [`UNKNOWN_ADDRESS`]
    pub address: String,
    pub value: i64,
    pub spent: bool,
    /// Where the output went, when spent
    pub spending_outpoints: Option<SpendingOutpoint>,
}

/// Full transaction document with scoring annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub txid: String,
    pub n_input: u64,
    pub n_output: u64,
    pub block_height: u64,
    pub timestamp: i64,
    pub size: u64,
    pub version: u32,
    pub locktime: u32,
    pub coinbase: bool,
    pub input_value: i64,
    pub output_value: i64,
    pub fee: i64,
    /// Structural CoinJoin signal
    pub coinjoin: bool,
    /// Output addresses the classifier did not mark as change
    pub likely_recipients: Vec<String>,
    /// Empty for coinbase transactions
    pub inputs: Vec<InputReport>,
    pub outputs: Vec<OutputReport>,
    /// Enrichment profile stored under the transaction hash
    pub profile: Option<Value>,
}

impl TransactionReport {
    fn build(tx: &Transaction, likely_recipients: Vec<String>, profile: Option<Value>) -> Self {
        let inputs: Vec<InputReport> = if tx.coinbase {
            Vec::new()
        } else {
            tx.inputs
                .iter()
                .map(|input| InputReport {
                    index: input.index,
                    spends: input.spends.clone(),
                    address: display_address(&input.address),
                    value: input.value,
                })
                .collect()
        };
        let outputs: Vec<OutputReport> = tx
            .outputs
            .iter()
            .map(|output| OutputReport {
                index: output.index,
                address: display_address(&output.address),
                value: output.value,
                spent: output.spent,
                spending_outpoints: output.spent_by.as_ref().map(|spent_by| SpendingOutpoint {
                    txid: spent_by.txid.clone(),
                    input_index: spent_by.input_index,
                    value: output.value,
                }),
            })
            .collect();

        TransactionReport {
            txid: tx.hash.clone(),
            n_input: tx.inputs.len() as u64,
            n_output: tx.outputs.len() as u64,
            block_height: tx.block_height,
            timestamp: tx.timestamp,
            size: tx.size,
            version: tx.version,
            locktime: tx.locktime,
            coinbase: tx.coinbase,
            input_value: tx.input_value(),
            output_value: tx.output_value(),
            fee: tx.fee(),
            coinjoin: is_coinjoin(tx),
            likely_recipients,
            inputs,
            outputs,
            profile,
        }
    }
}

/// Score of a single output under the active catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputScore {
    pub index: u32,
    /// Receiving address, or [`UNKNOWN_ADDRESS`]
    pub address: String,
    pub value: i64,
    pub score: u32,
}

/// Per-output change scores for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeClassification {
    pub txid: String,
    /// Score at or above which an output is treated as change
    pub threshold: u32,
    pub outputs: Vec<OutputScore>,
    /// Addresses of the outputs scoring strictly below the threshold
    pub likely_recipients: Vec<String>,
}

/// Entry point tying the engine's pieces together
pub struct AnalyticsApi {
    chain: Arc<dyn ChainGraphProvider>,
    store: Arc<dyn EnrichmentStore>,
    classifier: ChangeClassifier,
    aggregator: WalletAggregator,
    resolver: ClusterResolver,
}

impl AnalyticsApi {
    pub fn new(
        chain: Arc<dyn ChainGraphProvider>,
        store: Arc<dyn EnrichmentStore>,
        config: &EngineConfig,
    ) -> AnalyticsResult<Self> {
        let classifier = ChangeClassifier::from_config(config);
        let aggregator = WalletAggregator::new(Arc::clone(&chain), config.workers)?;
        let resolver = ClusterResolver::new(Arc::clone(&chain), Arc::clone(&store));
        Ok(Self {
            chain,
            store,
            classifier,
            aggregator,
            resolver,
        })
    }

    /// Build against the default catalogue, threshold and worker bound
    pub fn with_defaults(
        chain: Arc<dyn ChainGraphProvider>,
        store: Arc<dyn EnrichmentStore>,
    ) -> AnalyticsResult<Self> {
        Self::new(chain, store, &EngineConfig::default())
    }

    /// Wallet summary with profile and cluster annotations attached
    pub fn wallet_summary(&self, address: &str) -> AnalyticsResult<WalletSummary> {
        let mut summary = self.aggregator.summarize(address)?;
        summary.profile = self.store.find_profile(address)?;
        summary.cluster = self.store.find_cluster_containing(address)?;
        Ok(summary)
    }

    /// Wallet transactions with timestamps inside `[start, end]`
    pub fn wallet_history(
        &self,
        address: &str,
        start: i64,
        end: i64,
    ) -> AnalyticsResult<WalletHistory> {
        self.aggregator.history(address, start, end)
    }

    /// Full transaction document with scoring annotations
    pub fn transaction_report(&self, hash: &str) -> AnalyticsResult<TransactionReport> {
        let tx = self.chain.resolve_transaction(hash)?;
        let likely_recipients: Vec<String> = self.classifier.classify(&tx).into_iter().collect();
        let profile = self.store.find_profile(hash)?;
        Ok(TransactionReport::build(&tx, likely_recipients, profile))
    }

    /// Per-output change scores for one transaction
    pub fn change_classification(&self, hash: &str) -> AnalyticsResult<ChangeClassification> {
        let tx = self.chain.resolve_transaction(hash)?;
        let table = self.classifier.score(&tx);
        let threshold = self.classifier.threshold();

        let mut outputs = Vec::with_capacity(tx.outputs.len());
        let mut likely = BTreeSet::new();
        for output in &tx.outputs {
            let score = table.score(output.index).unwrap_or(0);
            if score < threshold && !output.address.is_empty() {
                likely.insert(output.address.clone());
            }
            outputs.push(OutputScore {
                index: output.index,
                address: display_address(&output.address),
                value: output.value,
                score,
            });
        }

        Ok(ChangeClassification {
            txid: tx.hash.clone(),
            threshold,
            outputs,
            likely_recipients: likely.into_iter().collect(),
        })
    }

    /// Resolve a cluster key to its document plus member balances
    pub fn cluster_record(&self, key: &str) -> AnalyticsResult<ClusterRecord> {
        self.resolver.resolve(key)
    }

    /// Cluster containing a chain-known address
    pub fn cluster_membership(&self, address: &str) -> AnalyticsResult<ClusterMembership> {
        self.resolver.membership(address)
    }
}

fn display_address(address: &str) -> String {
    if address.is_empty() {
        UNKNOWN_ADDRESS.to_string()
    } else {
        address.to_string()
    }
}
