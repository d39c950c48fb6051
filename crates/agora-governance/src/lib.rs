//! Agora Governance - decision-making engine for decentralized
//! organizations.
//!
//! This crate provides:
//! - Proposal lifecycle management (Pending -> Active -> Passed/Failed ->
//!   Executed, with cancellation)
//! - Voting power from holdings, staked holdings, and reputation
//! - Single-target (star topology) delegation
//! - Immutable historical power snapshots
//! - Quorum and strict-majority tally evaluation
//!
//! The engine owns no clock and no token accounting: current time is a
//! parameter to every time-sensitive operation, and balances come from an
//! injected [`power::PowerProvider`].

pub mod delegation;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod power;
pub mod proposal;
pub mod settings;
pub mod snapshot;
pub mod tally;

pub use delegation::{Delegation, DelegationLedger};
pub use effects::{EffectHandler, HandlerRegistry};
pub use engine::{GovernanceEngine, GovernanceStats, SharedEngine};
pub use error::GovernanceError;
pub use events::GovernanceEvent;
pub use power::{compute_base_power, PowerComponents, PowerProvider};
pub use proposal::{Proposal, ProposalStatus, ProposalStore, ProposalType, Vote, VoteChoice};
pub use settings::GovernanceSettings;
pub use snapshot::{Snapshot, SnapshotStore};
pub use tally::TallyResult;
