//! Quorum and majority evaluation.
//!
//! Evaluated exactly once per proposal, at execution time. A proposal
//! passes iff total participation meets the quorum and strictly more
//! power voted yes than no; a tie fails.

use serde::{Deserialize, Serialize};

/// Outcome of evaluating a proposal's tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    /// Weighted yes votes
    pub yes: u128,
    /// Weighted no votes
    pub no: u128,
    /// Weighted abstain votes
    pub abstain: u128,
    /// Total participation (yes + no + abstain)
    pub total: u128,
    /// Whether the quorum was met
    pub quorum_met: bool,
    /// Final decision
    pub passed: bool,
}

/// Evaluate the pass rule over final vote buckets.
///
/// Abstain power counts toward the quorum but not the majority.
pub fn evaluate(yes: u128, no: u128, abstain: u128, quorum: u128) -> TallyResult {
    let total = yes.saturating_add(no).saturating_add(abstain);
    let quorum_met = total >= quorum;
    let passed = quorum_met && yes > no;

    TallyResult {
        yes,
        no,
        abstain,
        total,
        quorum_met,
        passed,
    }
}
