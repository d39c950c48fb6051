//! Governance notifications.
//!
//! One event is recorded per successful mutating operation, for external
//! indexers to drain via the engine's `take_events`.

use agora_types::Address;
use serde::{Deserialize, Serialize};
use crate::proposal::{ProposalType, VoteChoice};

/// Notification of a successful mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    ProposalCreated {
        id: u64,
        proposer: Address,
        proposal_type: ProposalType,
    },
    ProposalActivated {
        id: u64,
    },
    Voted {
        id: u64,
        voter: Address,
        choice: VoteChoice,
        power: u128,
    },
    VoteChanged {
        id: u64,
        voter: Address,
        choice: VoteChoice,
    },
    ProposalExecuted {
        id: u64,
        passed: bool,
        /// False when the proposal passed but its effect handler failed;
        /// the proposal status remains Executed either way.
        effect_applied: bool,
    },
    ProposalCanceled {
        id: u64,
    },
    DelegationUpdated {
        delegator: Address,
        /// None when the delegation was removed
        delegate: Option<Address>,
        amount: u128,
    },
    SnapshotCreated {
        id: u64,
    },
    SettingsUpdated,
    CouncilMemberAdded {
        member: Address,
    },
    CouncilMemberRemoved {
        member: Address,
    },
    ExecutorAdded {
        executor: Address,
    },
    ExecutorRemoved {
        executor: Address,
    },
}
