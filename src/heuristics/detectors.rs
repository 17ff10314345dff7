//! Reference change detectors
//!
//! Each detector is a pure function from a transaction to the set of output
//! indexes it votes for as likely change. Detectors are stateless and may
//! run in any order; the scoring engine only ever consumes them through the
//! catalogue table, so callers can swap any of these for their own.

use crate::data_structures::Transaction;
use std::collections::{BTreeSet, HashMap};

/// Divisor for the round-amount test, ten to the sixth
const ROUND_AMOUNT_UNIT: i64 = 1_000_000;

/// Divisor for the round-fee test
const ROUND_FEE_UNIT: i64 = 1_000;

/// Flags outputs paying an address that already appears on the input side.
/// Sending value back to a spending address is the classic change giveaway.
pub fn address_reuse(tx: &Transaction) -> BTreeSet<u32> {
    if tx.coinbase {
        return BTreeSet::new();
    }
    let input_addresses: BTreeSet<&str> = tx
        .inputs
        .iter()
        .filter(|input| !input.address.is_empty())
        .map(|input| input.address.as_str())
        .collect();
    tx.outputs
        .iter()
        .filter(|output| input_addresses.contains(output.address.as_str()))
        .map(|output| output.index)
        .collect()
}

/// Flags the larger output of a two-output transaction when it is at least
/// twice the smaller one, the shape of a peeling chain step.
pub fn peeling_chain(tx: &Transaction) -> BTreeSet<u32> {
    let mut flagged = BTreeSet::new();
    if tx.outputs.len() != 2 {
        return flagged;
    }
    let (first, second) = (&tx.outputs[0], &tx.outputs[1]);
    let (larger, smaller) = if first.value >= second.value {
        (first, second)
    } else {
        (second, first)
    };
    if larger.value > smaller.value && larger.value >= smaller.value.saturating_mul(2) {
        flagged.insert(larger.index);
    }
    flagged
}

/// When some output is a clean multiple of 10^6 base units, that one looks
/// like the intended payment; everything else gets flagged.
pub fn power_of_ten(tx: &Transaction) -> BTreeSet<u32> {
    let is_round = |value: i64| value > 0 && value % ROUND_AMOUNT_UNIT == 0;
    if !tx.outputs.iter().any(|output| is_round(output.value)) {
        return BTreeSet::new();
    }
    tx.outputs
        .iter()
        .filter(|output| !is_round(output.value))
        .map(|output| output.index)
        .collect()
}

/// Flags outputs smaller than the smallest input. Had such an output been
/// the payment, the sender could have funded it with fewer inputs.
pub fn optimal_change(tx: &Transaction) -> BTreeSet<u32> {
    if tx.coinbase || tx.inputs.is_empty() {
        return BTreeSet::new();
    }
    let min_input = tx
        .inputs
        .iter()
        .map(|input| input.value)
        .min()
        .unwrap_or(0);
    if min_input <= 0 {
        return BTreeSet::new();
    }
    tx.outputs
        .iter()
        .filter(|output| output.value < min_input)
        .map(|output| output.index)
        .collect()
}

/// Flags the trailing output. Widely deployed wallet clients append change
/// after the payment outputs.
pub fn client_behavior(tx: &Transaction) -> BTreeSet<u32> {
    let mut flagged = BTreeSet::new();
    if tx.outputs.len() < 2 {
        return flagged;
    }
    if let Some(last) = tx.outputs.last() {
        flagged.insert(last.index);
    }
    flagged
}

/// When every input shares one script type and the outputs mix types, the
/// outputs matching the input type are flagged; a wallet sends change back
/// to the kind of address it already holds.
pub fn address_type_switch(tx: &Transaction) -> BTreeSet<u32> {
    if tx.coinbase || tx.inputs.is_empty() {
        return BTreeSet::new();
    }
    let input_type = tx.inputs[0].address_type;
    if tx.inputs.iter().any(|input| input.address_type != input_type) {
        return BTreeSet::new();
    }
    let has_matching = tx
        .outputs
        .iter()
        .any(|output| output.address_type == input_type);
    let has_other = tx
        .outputs
        .iter()
        .any(|output| output.address_type != input_type);
    if !(has_matching && has_other) {
        return BTreeSet::new();
    }
    tx.outputs
        .iter()
        .filter(|output| output.address_type == input_type)
        .map(|output| output.index)
        .collect()
}

/// In a locktime-bearing transaction with several outputs, flags the
/// smallest output as the residual.
pub fn locktime_set(tx: &Transaction) -> BTreeSet<u32> {
    let mut flagged = BTreeSet::new();
    if tx.locktime == 0 || tx.outputs.len() < 2 {
        return flagged;
    }
    if let Some(smallest) = tx.outputs.iter().min_by_key(|output| output.value) {
        flagged.insert(smallest.index);
    }
    flagged
}

/// When legacy and witness outputs coexist, flags the legacy ones; an older
/// wallet keeps legacy change keys while paying modern recipients.
pub fn legacy_address_type(tx: &Transaction) -> BTreeSet<u32> {
    let has_legacy = tx
        .outputs
        .iter()
        .any(|output| output.address_type.is_legacy());
    let has_witness = tx
        .outputs
        .iter()
        .any(|output| output.address_type.is_witness());
    if !(has_legacy && has_witness) {
        return BTreeSet::new();
    }
    tx.outputs
        .iter()
        .filter(|output| output.address_type.is_legacy())
        .map(|output| output.index)
        .collect()
}

/// A deliberately round fee means the spend amount was exact, so outputs
/// with a non-round residue are flagged.
pub fn fixed_fee(tx: &Transaction) -> BTreeSet<u32> {
    let fee = tx.fee();
    if fee <= 0 || fee % ROUND_FEE_UNIT != 0 {
        return BTreeSet::new();
    }
    tx.outputs
        .iter()
        .filter(|output| output.value % ROUND_FEE_UNIT != 0)
        .map(|output| output.index)
        .collect()
}

/// Flags outputs a later transaction has already consumed; change tends to
/// move again before payments do.
pub fn already_spent(tx: &Transaction) -> BTreeSet<u32> {
    tx.outputs
        .iter()
        .filter(|output| output.spent)
        .map(|output| output.index)
        .collect()
}

/// Conservative structural CoinJoin test: several inputs from several
/// distinct spenders, three or more outputs, and at least one output value
/// occurring more than once.
pub fn is_coinjoin(tx: &Transaction) -> bool {
    if tx.coinbase || tx.inputs.len() < 2 || tx.outputs.len() < 3 {
        return false;
    }
    let distinct_spenders: BTreeSet<&str> = tx
        .inputs
        .iter()
        .filter(|input| !input.address.is_empty())
        .map(|input| input.address.as_str())
        .collect();
    if distinct_spenders.len() < 2 {
        return false;
    }
    let mut value_counts: HashMap<i64, u32> = HashMap::new();
    for output in &tx.outputs {
        *value_counts.entry(output.value).or_insert(0) += 1;
    }
    value_counts.values().any(|&count| count >= 2)
}
