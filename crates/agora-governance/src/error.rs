use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// Every mutating operation is all-or-nothing: when one of these is
/// returned, no partial state change has been retained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Invalid proposal state: {0}")]
    State(String),

    #[error("Outside valid time window: {0}")]
    Timing(String),

    #[error("Insufficient voting power: required {required}, actual {actual}")]
    InsufficientPower { required: u128, actual: u128 },

    #[error("Proposal cooldown active: {remaining} seconds remaining")]
    CooldownActive { remaining: u64 },

    #[error("Already voted")]
    AlreadyVoted,

    #[error("No active delegation")]
    NoDelegation,

    #[error("Delegation is disabled")]
    DelegationDisabled,

    #[error("Vote changes are disabled")]
    VoteChangeDisabled,

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(u64),
}
