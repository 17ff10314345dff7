//! Transaction snapshot types
//!
//! A [`Transaction`] is the unit the whole engine works on. It is read from
//! the chain graph provider fully linked: every input names the outpoint it
//! spends, and every spent output carries a back-reference to the input that
//! consumed it. Once read, a transaction never changes.

use crate::data_structures::address::AddressType;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifies an output by the transaction that created it and its position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Hash of the creating transaction
    pub txid: String,
    /// Output position within that transaction
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
        }
    }
}

impl Display for OutPoint {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(fmt, "{}:{}", self.txid, self.vout)
    }
}

/// Back-reference from a spent output to the input that consumed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpentBy {
    /// Hash of the spending transaction
    pub txid: String,
    /// Position of the consuming input in that transaction
    pub input_index: u32,
    /// Value of the output that was consumed
    pub value: i64,
}

/// One input of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Position within the transaction
    pub index: u32,
    /// Value of the output being spent
    #[serde(default)]
    pub value: i64,
    /// Address that owned the spent output
    pub address: String,
    /// Script type of the spent output
    #[serde(default)]
    pub address_type: AddressType,
    /// The outpoint this input consumes
    pub spends: OutPoint,
}

/// One output of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Position within the transaction
    pub index: u32,
    /// Value in base units
    pub value: i64,
    /// Receiving address
    pub address: String,
    /// Script type of the output
    #[serde(default)]
    pub address_type: AddressType,
    /// Whether a later transaction consumed this output
    #[serde(default)]
    pub spent: bool,
    /// Present exactly when `spent` is true
    #[serde(default)]
    pub spent_by: Option<SpentBy>,
}

impl TxOutput {
    /// The outpoint other transactions use to reference this output
    pub fn outpoint(&self, txid: &str) -> OutPoint {
        OutPoint::new(txid, self.index)
    }
}

/// A transaction as read from the chain snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash in canonical hex form
    pub hash: String,
    /// Height of the containing block
    pub block_height: u64,
    /// Timestamp of the containing block, seconds since the epoch
    pub timestamp: i64,
    /// Serialized size in bytes
    #[serde(default)]
    pub size: u64,
    /// Transaction format version
    #[serde(default)]
    pub version: u32,
    /// Raw locktime field
    #[serde(default)]
    pub locktime: u32,
    /// True for the block subsidy transaction
    #[serde(default)]
    pub coinbase: bool,
    /// Inputs in consensus order; empty for coinbase
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    /// Outputs in consensus order
    pub outputs: Vec<TxOutput>,
    /// Provider-assigned stable index, monotonic with chain position
    pub tx_index: u64,
}

impl Transaction {
    /// Sum of input values; zero for coinbase, whose inputs carry no value
    pub fn input_value(&self) -> i64 {
        if self.coinbase {
            return 0;
        }
        self.inputs.iter().map(|input| input.value).sum()
    }

    /// Sum of output values
    pub fn output_value(&self) -> i64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    /// Fee paid to the miner, zero when no input value exists
    pub fn fee(&self) -> i64 {
        let input_value = self.input_value();
        if input_value == 0 {
            0
        } else {
            input_value - self.output_value()
        }
    }

    /// Sum of input values spent by the given address in this transaction
    pub fn value_spent_by(&self, address: &str) -> i64 {
        if self.coinbase {
            return 0;
        }
        self.inputs
            .iter()
            .filter(|input| input.address == address)
            .map(|input| input.value)
            .sum()
    }

    /// Sum of output values paid to the given address in this transaction
    pub fn value_paid_to(&self, address: &str) -> i64 {
        self.outputs
            .iter()
            .filter(|output| output.address == address)
            .map(|output| output.value)
            .sum()
    }
}
