//! Chain graph provider interface
//!
//! The engine never parses or indexes the chain itself. It consumes a fully
//! linked, immutable view through [`ChainGraphProvider`] and treats whatever
//! the provider returns as ground truth. Providers must deliver the per-
//! address transaction sequences finite and in chronological order; the
//! aggregation pipeline's early exit on time windows is only correct under
//! that contract.

pub mod memory;

pub use memory::{ChainSnapshot, MemoryChainProvider};

use crate::data_structures::{AddressRecord, Transaction};
use crate::errors::AnalyticsResult;
use std::sync::Arc;

/// Finite, chronologically ordered stream of transactions
pub type TransactionStream<'a> = Box<dyn Iterator<Item = Arc<Transaction>> + Send + 'a>;

/// Read access to the linked transaction graph
///
/// Resolution failures are client errors: a hash or address the provider
/// cannot resolve yields `AnalyticsError::InvalidInput`, and no operation
/// built on top of it runs.
pub trait ChainGraphProvider: Send + Sync {
    /// Resolve a transaction hash to its immutable record
    fn resolve_transaction(&self, hash: &str) -> AnalyticsResult<Arc<Transaction>>;

    /// Resolve an address string to its record
    fn resolve_address(&self, address: &str) -> AnalyticsResult<AddressRecord>;

    /// Transactions spending from the address, oldest first
    fn sent_transactions<'a>(&'a self, address: &str) -> AnalyticsResult<TransactionStream<'a>>;

    /// Transactions paying the address, oldest first
    fn received_transactions<'a>(&'a self, address: &str)
        -> AnalyticsResult<TransactionStream<'a>>;

    /// Sum of the address's currently unspent outputs
    fn current_balance(&self, address: &str) -> AnalyticsResult<i64>;

    /// Every transaction touching the address, oldest first, each delivered
    /// once
    ///
    /// Default implementation lazily merges the sent and received streams by
    /// stable index, collapsing transactions that appear in both.
    fn transactions<'a>(&'a self, address: &str) -> AnalyticsResult<TransactionStream<'a>> {
        let sent = self.sent_transactions(address)?;
        let received = self.received_transactions(address)?;
        Ok(Box::new(MergedTransactions::new(sent, received)))
    }
}

/// Two-way merge of index-ordered transaction streams
struct MergedTransactions<'a> {
    left: TransactionStream<'a>,
    right: TransactionStream<'a>,
    left_head: Option<Arc<Transaction>>,
    right_head: Option<Arc<Transaction>>,
}

impl<'a> MergedTransactions<'a> {
    fn new(mut left: TransactionStream<'a>, mut right: TransactionStream<'a>) -> Self {
        let left_head = left.next();
        let right_head = right.next();
        Self {
            left,
            right,
            left_head,
            right_head,
        }
    }
}

impl Iterator for MergedTransactions<'_> {
    type Item = Arc<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        match (&self.left_head, &self.right_head) {
            (None, None) => None,
            (Some(_), None) => {
                let next = self.left.next();
                std::mem::replace(&mut self.left_head, next)
            }
            (None, Some(_)) => {
                let next = self.right.next();
                std::mem::replace(&mut self.right_head, next)
            }
            (Some(l), Some(r)) => {
                if l.tx_index < r.tx_index {
                    let next = self.left.next();
                    std::mem::replace(&mut self.left_head, next)
                } else if r.tx_index < l.tx_index {
                    let next = self.right.next();
                    std::mem::replace(&mut self.right_head, next)
                } else {
                    // Same transaction present in both streams
                    self.right_head = self.right.next();
                    let next = self.left.next();
                    std::mem::replace(&mut self.left_head, next)
                }
            }
        }
    }
}
