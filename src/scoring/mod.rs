//! Weighted change scoring
//!
//! [`ChangeClassifier`] runs every catalogue detector over a transaction,
//! accumulates the weighted votes per output in a [`ScoreTable`], and then
//! splits the outputs at the threshold: strictly below means likely true
//! recipient, at or above means likely change. The detectors commute, so
//! the verdict never depends on catalogue order.

use crate::config::EngineConfig;
use crate::data_structures::Transaction;
use crate::heuristics::{
    default_catalogue, HeuristicWeights, WeightedDetector, DEFAULT_SCORE_THRESHOLD,
};
use std::collections::{BTreeMap, BTreeSet};

/// Accumulated votes for the outputs of one transaction
///
/// A table lives for exactly one classification run. Every output of the
/// transaction has a row from the start, so an output no detector voted for
/// still reports a score of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    txid: String,
    scores: BTreeMap<u32, u32>,
}

impl ScoreTable {
    /// Fresh table with every output of the transaction at zero
    pub fn for_transaction(tx: &Transaction) -> Self {
        Self {
            txid: tx.hash.clone(),
            scores: tx.outputs.iter().map(|output| (output.index, 0)).collect(),
        }
    }

    /// Add `weight` to every flagged output that exists in this table;
    /// indexes outside the transaction are ignored
    pub fn credit(&mut self, flagged: &BTreeSet<u32>, weight: u32) {
        for index in flagged {
            if let Some(score) = self.scores.get_mut(index) {
                *score += weight;
            }
        }
    }

    /// Transaction this table was built for
    pub fn txid(&self) -> &str {
        &self.txid
    }

    /// Score of one output, `None` if the index is not an output
    pub fn score(&self, index: u32) -> Option<u32> {
        self.scores.get(&index).copied()
    }

    /// All rows in ascending output order
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.scores.iter().map(|(&index, &score)| (index, score))
    }

    /// Output indexes scoring strictly below the threshold
    pub fn below(&self, threshold: u32) -> impl Iterator<Item = u32> + '_ {
        self.scores
            .iter()
            .filter(move |(_, &score)| score < threshold)
            .map(|(&index, _)| index)
    }

    /// Number of outputs tracked
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Catalogue-driven change classifier
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    catalogue: Vec<WeightedDetector>,
    threshold: u32,
}

impl ChangeClassifier {
    /// Classifier over an explicit catalogue
    pub fn new(catalogue: Vec<WeightedDetector>, threshold: u32) -> Self {
        Self {
            catalogue,
            threshold,
        }
    }

    /// Built-in detectors, documented default weights, threshold 8
    pub fn with_defaults() -> Self {
        Self::new(
            default_catalogue(&HeuristicWeights::default()),
            DEFAULT_SCORE_THRESHOLD,
        )
    }

    /// Built-in detectors with the weights and threshold of a configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(default_catalogue(&config.weights), config.threshold)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn catalogue(&self) -> &[WeightedDetector] {
        &self.catalogue
    }

    /// Run every detector and accumulate the weighted votes
    pub fn score(&self, tx: &Transaction) -> ScoreTable {
        let mut table = ScoreTable::for_transaction(tx);
        for entry in &self.catalogue {
            table.credit(&entry.flag(tx), entry.weight);
        }
        table
    }

    /// Addresses of the outputs judged likely true recipients
    ///
    /// An output at exactly the threshold is treated as change and excluded.
    /// A transaction with no outputs yields the empty set.
    pub fn classify(&self, tx: &Transaction) -> BTreeSet<String> {
        let table = self.score(tx);
        let mut recipients = BTreeSet::new();
        for index in table.below(self.threshold) {
            if let Some(output) = tx.outputs.iter().find(|output| output.index == index) {
                if !output.address.is_empty() {
                    recipients.insert(output.address.clone());
                }
            }
        }
        recipients
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_structures::{AddressType, OutPoint, SpentBy, TxInput, TxOutput};
    use rand::seq::SliceRandom;

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

    fn input(index: u32, value: i64, address: &str) -> TxInput {
        TxInput {
            index,
            value,
            address: address.to_string(),
            address_type: AddressType::PubkeyHash,
            spends: OutPoint::new("00", index),
        }
    }

    fn transaction(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            hash: "aa".to_string(),
            block_height: 100,
            timestamp: 1_600_000_000,
            size: 250,
            version: 2,
            locktime: 0,
            coinbase: false,
            inputs,
            outputs,
            tx_index: 1,
        }
    }

    /// One input from alice; change back to alice already spent onward.
    ///
    /// Under default weights the change output accumulates exactly the
    /// threshold: reuse 3 + optimal change 2 + client behavior 2 + spent 1.
    /// The payment output accumulates only optimal change 2.
    fn boundary_transaction() -> Transaction {
        let mut change = output(1, 3_100, "alice");
        change.spent = true;
        change.spent_by = Some(SpentBy {
            txid: "bb".to_string(),
            input_index: 0,
            value: 3_100,
        });
        transaction(
            vec![input(0, 10_000, "alice")],
            vec![output(0, 6_100, "bob"), change],
        )
    }

    #[test]
    fn test_score_at_threshold_is_excluded() {
        let tx = boundary_transaction();
        let classifier = ChangeClassifier::with_defaults();

        let table = classifier.score(&tx);
        assert_eq!(table.score(0), Some(2));
        assert_eq!(table.score(1), Some(8));

        let recipients = classifier.classify(&tx);
        assert_eq!(
            recipients.into_iter().collect::<Vec<_>>(),
            vec!["bob".to_string()]
        );
    }

    #[test]
    fn test_score_one_below_threshold_is_included() {
        // Same shape but the change was never spent onward: 7 < 8
        let mut tx = boundary_transaction();
        tx.outputs[1].spent = false;
        tx.outputs[1].spent_by = None;

        let classifier = ChangeClassifier::with_defaults();
        let table = classifier.score(&tx);
        assert_eq!(table.score(1), Some(7));

        let recipients = classifier.classify(&tx);
        assert_eq!(
            recipients.into_iter().collect::<Vec<_>>(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_zero_output_transaction_classifies_empty() {
        let tx = transaction(vec![input(0, 10_000, "alice")], vec![]);
        let classifier = ChangeClassifier::with_defaults();
        assert!(classifier.score(&tx).is_empty());
        assert!(classifier.classify(&tx).is_empty());
    }

    #[test]
    fn test_every_output_has_a_row_even_unflagged() {
        let tx = transaction(
            vec![input(0, 10_000, "alice")],
            vec![output(0, 4_000, "bob"), output(1, 3_000, "carol")],
        );
        let table = ScoreTable::for_transaction(&tx);
        assert_eq!(table.len(), 2);
        assert_eq!(table.score(0), Some(0));
        assert_eq!(table.score(1), Some(0));
        assert_eq!(table.score(2), None);
    }

    #[test]
    fn test_credit_ignores_foreign_indexes() {
        let tx = transaction(vec![input(0, 10_000, "alice")], vec![output(0, 4_000, "bob")]);
        let mut table = ScoreTable::for_transaction(&tx);
        table.credit(&[99].into_iter().collect(), 5);
        assert_eq!(table.len(), 1);
        assert_eq!(table.score(0), Some(0));
        assert_eq!(table.score(99), None);
    }

    #[test]
    fn test_scores_sum_weights_of_flagging_detectors() {
        let tx = boundary_transaction();
        let classifier = ChangeClassifier::with_defaults();
        let table = classifier.score(&tx);

        for (index, score) in table.entries() {
            let flagged: u32 = classifier
                .catalogue()
                .iter()
                .filter(|entry| entry.flag(&tx).contains(&index))
                .map(|entry| entry.weight)
                .sum();
            assert_eq!(score, flagged);
        }
    }

    #[test]
    fn test_catalogue_order_does_not_change_verdict() {
        let tx = boundary_transaction();
        let reference = ChangeClassifier::with_defaults().classify(&tx);

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let mut catalogue = default_catalogue(&HeuristicWeights::default());
            catalogue.shuffle(&mut rng);
            let shuffled = ChangeClassifier::new(catalogue, DEFAULT_SCORE_THRESHOLD);
            assert_eq!(shuffled.classify(&tx), reference);
        }
    }

    #[test]
    fn test_lower_threshold_reclassifies_payment() {
        let tx = boundary_transaction();
        // With the bar at 2, even the payment output's score is no longer
        // strictly below it
        let classifier = ChangeClassifier::new(
            default_catalogue(&HeuristicWeights::default()),
            2,
        );
        assert!(classifier.classify(&tx).is_empty());
    }

    #[test]
    fn test_from_config_applies_weights_and_threshold() {
        let mut config = EngineConfig::default();
        config.threshold = 3;
        config.weights.address_reuse = 9;
        let classifier = ChangeClassifier::from_config(&config);
        assert_eq!(classifier.threshold(), 3);

        let tx = boundary_transaction();
        let table = classifier.score(&tx);
        // reuse 9 + optimal 2 + client 2 + spent 1
        assert_eq!(table.score(1), Some(14));
    }
}
