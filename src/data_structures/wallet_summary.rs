//! Derived wallet documents: summaries and history entries

use crate::data_structures::cluster::ClusterDocument;
use serde::{Deserialize, Serialize};

/// Aggregated activity profile of one address
///
/// `final_balance` is always `total_received - total_sent`, even when the
/// provider's view makes that negative. The four first/last-seen fields are
/// honest nullables: an address with no receiving activity serializes
/// `first_seen_receiving: null`, never a zero sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    /// Canonical address string
    pub address: String,
    /// Number of transactions touching the address in either direction
    pub n_tx: u64,
    /// Transactions in which the address spent a positive value
    pub n_sent_tx: u64,
    /// Transactions in which the address received a positive value
    pub n_rcv_tx: u64,
    /// Lifetime value spent
    pub total_sent: i64,
    /// Lifetime value received
    pub total_received: i64,
    /// `total_received - total_sent`, never clamped
    pub final_balance: i64,
    /// Timestamp of the first transaction paying the address
    pub first_seen_receiving: Option<i64>,
    /// Timestamp of the latest transaction paying the address
    pub last_seen_receiving: Option<i64>,
    /// Timestamp of the first transaction spending from the address
    pub first_seen_sending: Option<i64>,
    /// Timestamp of the latest transaction spending from the address
    pub last_seen_sending: Option<i64>,
    /// Cluster containing the address, if the enrichment store has one
    pub cluster: Option<ClusterDocument>,
    /// Free-form profile document for the address, if one is stored
    pub profile: Option<serde_json::Value>,
}

/// Outpoint record attached to a history entry when the queried address had
/// a spent output in the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingOutpoint {
    /// Transaction that consumed the output
    pub txid: String,
    /// Input position within the consuming transaction
    pub input_index: u32,
    /// Value of the consumed output
    pub value: i64,
}

/// One transaction inside a bounded wallet history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHistoryEntry {
    /// Transaction hash
    pub txid: String,
    /// Block timestamp
    pub timestamp: i64,
    /// At most one record; when several outputs matched, the last in output
    /// order is the one kept
    pub spending_outpoints: Option<SpendingOutpoint>,
    /// Net value from the address's point of view, received minus sent
    pub value: i64,
    /// Fee paid by the whole transaction
    pub fee: i64,
    /// Provider-assigned stable index; histories sort descending on it
    pub tx_index: u64,
}

/// Result document of a bounded history query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletHistory {
    /// Number of entries in the window
    pub n_tx: u64,
    /// Entries, newest stable index first
    pub txs: Vec<TxHistoryEntry>,
}
