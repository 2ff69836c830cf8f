//! Precision / recall / F1 against ground truth.
//!
//! Ground truth is assumed to use the same `lid < rid` convention as the
//! produced pairs. That cannot be verified, only checked for obvious
//! violations, which are reported through `tracing::warn!`.

use crate::rank::IdPair;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Evaluation counters and ratios.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Length of the matched list as reported (before set semantics).
    pub reported_count: usize,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Ground-truth pairs not in `lid < rid` order; they can never match.
    #[serde(default)]
    pub ordering_violations: usize,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Reported pairs:    {}", self.reported_count)?;
        writeln!(f, "  True positives:    {}", self.tp)?;
        writeln!(f, "  False positives:   {}", self.fp)?;
        writeln!(f, "  False negatives:   {}", self.fn_)?;
        writeln!(f, "  Precision:         {:.4}", self.precision)?;
        writeln!(f, "  Recall:            {:.4}", self.recall)?;
        write!(f, "  F1:                {:.4}", self.f1)?;
        if self.ordering_violations > 0 {
            write!(f, "\n  Misordered truth:  {}", self.ordering_violations)?;
        }
        Ok(())
    }
}

/// `num / den`, or `0.0` when `den` is zero.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Number of ground-truth pairs that are not in `lid < rid` order.
#[must_use]
pub fn ordering_violations(truth: &[IdPair]) -> usize {
    truth.iter().filter(|p| !p.is_canonical()).count()
}

/// Compare matched pairs with ground truth.
///
/// Both sides are treated as sets. Every zero denominator yields `0.0`.
#[must_use]
pub fn evaluate(matched: &[IdPair], truth: &[IdPair]) -> Metrics {
    let violations = ordering_violations(truth);
    if violations > 0 {
        tracing::warn!(
            violations,
            total = truth.len(),
            "ground truth pairs not in lid < rid order; they can never match"
        );
    }

    let matched_set: HashSet<&IdPair> = matched.iter().collect();
    let truth_set: HashSet<&IdPair> = truth.iter().collect();

    let tp = matched_set.intersection(&truth_set).count();
    let fp = matched_set.len() - tp;
    let fn_ = truth_set.len() - tp;

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    Metrics {
        reported_count: matched.len(),
        tp,
        fp,
        fn_,
        precision,
        recall,
        f1,
        ordering_violations: violations,
    }
}
