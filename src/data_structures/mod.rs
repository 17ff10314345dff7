//! Core data structures for chain analytics
//!
//! Everything in this module is a plain immutable snapshot type: transactions
//! and their inputs/outputs as read from the chain graph provider, plus the
//! derived documents the engine produces (wallet summaries, history entries,
//! cluster records). All types serialize with serde so they can round-trip
//! through snapshot files and API responses.

pub mod address;
pub mod cluster;
pub mod transaction;
pub mod wallet_summary;

pub use address::{AddressRecord, AddressType};
pub use cluster::{
    ClusterDocument, ClusterMembership, ClusterMetadata, ClusterRecord, MemberBalance,
};
pub use transaction::{OutPoint, SpentBy, Transaction, TxInput, TxOutput};
pub use wallet_summary::{SpendingOutpoint, TxHistoryEntry, WalletHistory, WalletSummary};
