//! Governance configuration.
//!
//! A single mutable settings record consumed by every subsystem.
//! Mutated only through the engine's admin surface.

use serde::{Deserialize, Serialize};

/// Governance settings.
///
/// All time quantities are in seconds; all power quantities are in
/// engine units (the same scale the power provider reports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Minimum voting power required to create a proposal
    pub proposal_threshold: u128,
    /// Length of the voting window
    pub voting_period: u64,
    /// Minimum total voting power that must participate for a result
    /// to be binding
    pub quorum_votes: u128,
    /// Delay between proposal creation and the start of voting
    pub execution_delay: u64,
    /// Minimum voting power required to cast a vote
    pub min_voting_power: u128,
    /// Upper clamp on any member's effective voting power
    pub max_voting_power: u128,
    /// Whether delegation is enabled
    pub allow_delegation: bool,
    /// Whether voters may change a cast vote within the voting window
    pub allow_vote_change: bool,
    /// Minimum elapsed time between consecutive proposals by one member
    pub proposal_cooldown: u64,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            proposal_threshold: 10_000,
            voting_period: 604_800,      // 7 days
            quorum_votes: 100_000,
            execution_delay: 86_400,     // 1 day
            min_voting_power: 1,
            max_voting_power: 1_000_000_000,
            allow_delegation: true,
            allow_vote_change: true,
            proposal_cooldown: 86_400,   // 1 day
        }
    }
}
