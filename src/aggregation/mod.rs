//! Wallet aggregation pipeline
//!
//! Two operations over an address's transaction stream: [`WalletAggregator::summarize`]
//! folds the whole stream into a [`WalletSummary`], and
//! [`WalletAggregator::history`] extracts a time-bounded slice as
//! [`TxHistoryEntry`] records. Summarization fans out per transaction onto a
//! bounded worker pool; the accumulation is commutative and associative, so
//! the fold order never matters. History walks sequentially because its
//! early exit depends on the provider's chronological delivery, and the
//! result is re-sorted by stable index at the end either way.

use crate::chain::ChainGraphProvider;
use crate::data_structures::{
    SpendingOutpoint, Transaction, TxHistoryEntry, WalletHistory, WalletSummary,
};
use crate::errors::{AnalyticsError, AnalyticsResult};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Folds per-address transaction streams into summary documents
pub struct WalletAggregator {
    chain: Arc<dyn ChainGraphProvider>,
    pool: rayon::ThreadPool,
}

impl WalletAggregator {
    /// Build an aggregator with a worker pool of the given size; a size of
    /// zero is clamped to one
    pub fn new(chain: Arc<dyn ChainGraphProvider>, workers: usize) -> AnalyticsResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("wallet-agg-{i}"))
            .build()
            .map_err(|e| AnalyticsError::Internal(format!("cannot build worker pool: {e}")))?;
        Ok(Self { chain, pool })
    }

    /// Fold every transaction touching the address into one summary
    ///
    /// Cluster and profile annotations are left empty here; the API facade
    /// fills them from the enrichment store.
    pub fn summarize(&self, address: &str) -> AnalyticsResult<WalletSummary> {
        let record = self.chain.resolve_address(address)?;

        // The provider delivers chronologically, so first seen is the head
        // of each sequence
        let first_seen_receiving = self
            .chain
            .received_transactions(address)?
            .next()
            .map(|tx| tx.timestamp);
        let first_seen_sending = self
            .chain
            .sent_transactions(address)?
            .next()
            .map(|tx| tx.timestamp);

        let transactions: Vec<Arc<Transaction>> = self.chain.transactions(address)?.collect();
        debug!(
            address = record.address.as_str(),
            transactions = transactions.len(),
            "summarizing wallet"
        );

        let totals = self.pool.install(|| {
            transactions
                .par_iter()
                .map(|tx| ActivityTotals::observe(tx, address))
                .reduce(ActivityTotals::default, ActivityTotals::merge)
        });

        Ok(WalletSummary {
            address: record.address,
            n_tx: transactions.len() as u64,
            n_sent_tx: totals.n_sent_tx,
            n_rcv_tx: totals.n_rcv_tx,
            total_sent: totals.total_sent,
            total_received: totals.total_received,
            final_balance: totals.total_received - totals.total_sent,
            first_seen_receiving,
            last_seen_receiving: totals.last_seen_receiving,
            first_seen_sending,
            last_seen_sending: totals.last_seen_sending,
            cluster: None,
            profile: None,
        })
    }

    /// Transactions touching the address with timestamps inside
    /// `[start, end]`, newest stable index first
    ///
    /// Bounds are inclusive and not validated; an inverted window yields an
    /// empty history.
    pub fn history(&self, address: &str, start: i64, end: i64) -> AnalyticsResult<WalletHistory> {
        self.chain.resolve_address(address)?;

        let mut entries: Vec<TxHistoryEntry> = Vec::new();
        for tx in self.chain.transactions(address)? {
            if tx.timestamp < start {
                continue;
            }
            if tx.timestamp > end {
                // Chronological delivery means nothing later can be in range
                break;
            }
            entries.push(history_entry(&tx, address));
        }
        entries.sort_by(|a, b| b.tx_index.cmp(&a.tx_index));

        Ok(WalletHistory {
            n_tx: entries.len() as u64,
            txs: entries,
        })
    }
}

/// Commutative per-transaction contribution to a wallet summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ActivityTotals {
    n_sent_tx: u64,
    n_rcv_tx: u64,
    total_sent: i64,
    total_received: i64,
    last_seen_receiving: Option<i64>,
    last_seen_sending: Option<i64>,
}

impl ActivityTotals {
    fn observe(tx: &Transaction, address: &str) -> Self {
        let sent = tx.value_spent_by(address);
        let received = tx.value_paid_to(address);
        Self {
            n_sent_tx: u64::from(sent > 0),
            n_rcv_tx: u64::from(received > 0),
            total_sent: sent,
            total_received: received,
            last_seen_receiving: (received > 0).then_some(tx.timestamp),
            last_seen_sending: (sent > 0).then_some(tx.timestamp),
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            n_sent_tx: self.n_sent_tx + other.n_sent_tx,
            n_rcv_tx: self.n_rcv_tx + other.n_rcv_tx,
            total_sent: self.total_sent + other.total_sent,
            total_received: self.total_received + other.total_received,
            last_seen_receiving: max_seen(self.last_seen_receiving, other.last_seen_receiving),
            last_seen_sending: max_seen(self.last_seen_sending, other.last_seen_sending),
        }
    }
}

fn max_seen(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

fn history_entry(tx: &Transaction, address: &str) -> TxHistoryEntry {
    let sent = tx.value_spent_by(address);
    let received = tx.value_paid_to(address);

    let mut spending_outpoints = None;
    for output in &tx.outputs {
        if output.address != address {
            continue;
        }
        if let Some(spent_by) = &output.spent_by {
            // Several spent outputs to the address: last in output order wins
            spending_outpoints = Some(SpendingOutpoint {
                txid: spent_by.txid.clone(),
                input_index: spent_by.input_index,
                value: output.value,
            });
        }
    }

    TxHistoryEntry {
        txid: tx.hash.clone(),
        timestamp: tx.timestamp,
        spending_outpoints,
        value: received - sent,
        fee: tx.fee(),
        tx_index: tx.tx_index,
    }
}
