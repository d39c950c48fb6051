//! Proposal lifecycle management.
//!
//! Proposals go through states: Pending -> Active -> Passed/Failed -> Executed,
//! with Pending and Active both able to transition to Canceled.

use std::collections::HashMap;
use agora_types::Address;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Proposal status in its lifecycle.
///
/// `Executed`, `Failed` and `Canceled` are terminal; no edge is ever
/// taken twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Proposal created, waiting for voting to start
    Pending,
    /// Voting is active
    Active,
    /// Voting ended, proposal passed (not yet executed)
    Passed,
    /// Voting ended, quorum unmet or majority against
    Failed,
    /// Proposal effect was dispatched
    Executed,
    /// Proposal was canceled before the outcome was decided
    Canceled,
}

impl ProposalStatus {
    /// Check if proposal is in active voting period.
    pub fn is_active(&self) -> bool {
        matches!(self, ProposalStatus::Active)
    }

    /// Check if this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Executed | ProposalStatus::Failed | ProposalStatus::Canceled
        )
    }

    /// Check if the proposal may still be canceled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ProposalStatus::Pending | ProposalStatus::Active)
    }
}

/// Type of governance proposal.
///
/// Each type maps to one registered effect handler, resolved at engine
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalType {
    /// Shared configuration change
    ParameterChange,
    /// Contract or system upgrade
    Upgrade,
    /// Treasury fund allocation
    FundAllocation,
    /// Policy change
    PolicyChange,
    /// Emergency action
    EmergencyAction,
    /// Community (non-binding) proposal
    Community,
}

impl ProposalType {
    /// Get type name.
    pub fn name(&self) -> &'static str {
        match self {
            ProposalType::ParameterChange => "Parameter Change",
            ProposalType::Upgrade => "Upgrade",
            ProposalType::FundAllocation => "Fund Allocation",
            ProposalType::PolicyChange => "Policy Change",
            ProposalType::EmergencyAction => "Emergency Action",
            ProposalType::Community => "Community",
        }
    }
}

/// Vote choice options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    /// Vote in favor
    Yes,
    /// Vote against
    No,
    /// Abstain (counts toward quorum but not the majority)
    Abstain,
}

/// A cast vote.
///
/// `power` is frozen at vote time and never re-read from the live
/// calculator afterwards; `change_vote` moves this same frozen amount
/// between buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The chosen option
    pub choice: VoteChoice,
    /// Voting power locked in at vote time
    pub power: u128,
    /// When the vote was cast or last changed
    pub timestamp: u64,
    /// Free-text reason
    pub reason: String,
}

/// A governance proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal ID
    pub id: u64,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Opaque metadata reference, interpreted by the effect handler
    pub metadata: String,
    /// Proposer address
    pub proposer: Address,
    /// Proposal type
    pub proposal_type: ProposalType,
    /// Current status
    pub status: ProposalStatus,
    /// When voting starts
    pub start_time: u64,
    /// When voting ends
    pub end_time: u64,
    /// Yes votes (weighted)
    pub yes_votes: u128,
    /// No votes (weighted)
    pub no_votes: u128,
    /// Abstain votes (weighted)
    pub abstain_votes: u128,
    /// Voters in cast order
    pub voters: Vec<Address>,
    /// Vote records by voter
    pub votes: HashMap<Address, Vote>,
    /// When executed
    pub executed_at: Option<u64>,
    /// When canceled
    pub canceled_at: Option<u64>,
}

impl Proposal {
    /// Create a new proposal in `Pending` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        title: String,
        description: String,
        metadata: String,
        proposal_type: ProposalType,
        proposer: Address,
        start_time: u64,
        end_time: u64,
    ) -> Self {
        Self {
            id,
            title,
            description,
            metadata,
            proposer,
            proposal_type,
            status: ProposalStatus::Pending,
            start_time,
            end_time,
            yes_votes: 0,
            no_votes: 0,
            abstain_votes: 0,
            voters: Vec::new(),
            votes: HashMap::new(),
            executed_at: None,
            canceled_at: None,
        }
    }

    /// Start voting (transition from Pending to Active).
    pub fn activate(&mut self, now: u64) -> Result<(), GovernanceError> {
        if self.status != ProposalStatus::Pending {
            return Err(GovernanceError::State(format!(
                "cannot activate from status {:?}",
                self.status
            )));
        }

        if now < self.start_time {
            return Err(GovernanceError::Timing(format!(
                "voting starts at {}, now {}",
                self.start_time, now
            )));
        }

        self.status = ProposalStatus::Active;
        Ok(())
    }

    /// Check that the proposal accepts votes right now.
    pub fn ensure_votable(&self, now: u64) -> Result<(), GovernanceError> {
        if !self.status.is_active() {
            return Err(GovernanceError::State(format!(
                "proposal is {:?}, not accepting votes",
                self.status
            )));
        }

        if now < self.start_time || now > self.end_time {
            return Err(GovernanceError::Timing(format!(
                "voting window is [{}, {}], now {}",
                self.start_time, self.end_time, now
            )));
        }

        Ok(())
    }

    /// Cast a vote with already-computed power.
    ///
    /// The caller is responsible for the minimum-power check; power
    /// recorded here is frozen for the lifetime of the vote.
    pub fn cast_vote(
        &mut self,
        voter: Address,
        choice: VoteChoice,
        power: u128,
        reason: String,
        now: u64,
    ) -> Result<(), GovernanceError> {
        self.ensure_votable(now)?;

        if self.votes.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        *self.bucket_mut(choice) = self.bucket(choice).saturating_add(power);
        self.voters.push(voter);
        self.votes.insert(voter, Vote { choice, power, timestamp: now, reason });

        Ok(())
    }

    /// Move an existing vote's frozen power to a new choice.
    ///
    /// The power moved is the one frozen at the original vote time; it is
    /// never recomputed.
    pub fn change_vote(
        &mut self,
        voter: Address,
        new_choice: VoteChoice,
        reason: String,
        now: u64,
    ) -> Result<(), GovernanceError> {
        self.ensure_votable(now)?;

        let (old_choice, power) = match self.votes.get(&voter) {
            Some(vote) => (vote.choice, vote.power),
            None => {
                return Err(GovernanceError::Validation(
                    "no existing vote to change".to_string(),
                ))
            }
        };

        *self.bucket_mut(old_choice) = self.bucket(old_choice).saturating_sub(power);
        *self.bucket_mut(new_choice) = self.bucket(new_choice).saturating_add(power);

        if let Some(vote) = self.votes.get_mut(&voter) {
            vote.choice = new_choice;
            vote.reason = reason;
            vote.timestamp = now;
        }

        Ok(())
    }

    /// Close voting with a decided outcome.
    ///
    /// Transitions Active -> Passed or Active -> Failed. Reaching
    /// `Executed` requires a separate [`Proposal::mark_executed`] call, so
    /// no path skips `Passed`.
    pub fn close(&mut self, passed: bool, now: u64) -> Result<ProposalStatus, GovernanceError> {
        if self.status != ProposalStatus::Active {
            return Err(GovernanceError::State(format!(
                "cannot close from status {:?}",
                self.status
            )));
        }

        if now <= self.end_time {
            return Err(GovernanceError::Timing(format!(
                "voting window open until {}, now {}",
                self.end_time, now
            )));
        }

        self.status = if passed {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        };
        Ok(self.status)
    }

    /// Mark a passed proposal as executed.
    pub fn mark_executed(&mut self, now: u64) -> Result<(), GovernanceError> {
        if self.status != ProposalStatus::Passed {
            return Err(GovernanceError::State(format!(
                "cannot execute from status {:?}",
                self.status
            )));
        }

        self.status = ProposalStatus::Executed;
        self.executed_at = Some(now);
        Ok(())
    }

    /// Cancel the proposal. Allowed from Pending or Active only; no
    /// quorum or vote check applies.
    pub fn cancel(&mut self, now: u64) -> Result<(), GovernanceError> {
        if !self.status.can_cancel() {
            return Err(GovernanceError::State(format!(
                "cannot cancel from status {:?}",
                self.status
            )));
        }

        self.status = ProposalStatus::Canceled;
        self.canceled_at = Some(now);
        Ok(())
    }

    /// Get total votes cast.
    pub fn total_votes(&self) -> u128 {
        self.yes_votes
            .saturating_add(self.no_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Check if voter has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.contains_key(voter)
    }

    /// Get a voter's vote record.
    pub fn vote_of(&self, voter: &Address) -> Option<&Vote> {
        self.votes.get(voter)
    }

    fn bucket(&self, choice: VoteChoice) -> u128 {
        match choice {
            VoteChoice::Yes => self.yes_votes,
            VoteChoice::No => self.no_votes,
            VoteChoice::Abstain => self.abstain_votes,
        }
    }

    fn bucket_mut(&mut self, choice: VoteChoice) -> &mut u128 {
        match choice {
            VoteChoice::Yes => &mut self.yes_votes,
            VoteChoice::No => &mut self.no_votes,
            VoteChoice::Abstain => &mut self.abstain_votes,
        }
    }
}

/// Proposal store managing all proposals.
#[derive(Debug, Default)]
pub struct ProposalStore {
    proposals: HashMap<u64, Proposal>,
    next_id: u64,
}

impl ProposalStore {
    /// Create a new store.
    pub fn new() -> Self {
        Self {
            proposals: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create a new proposal, allocating the next monotonic id.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        title: String,
        description: String,
        metadata: String,
        proposal_type: ProposalType,
        proposer: Address,
        start_time: u64,
        end_time: u64,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let proposal = Proposal::new(
            id,
            title,
            description,
            metadata,
            proposal_type,
            proposer,
            start_time,
            end_time,
        );

        self.proposals.insert(id, proposal);
        id
    }

    /// Get a proposal.
    pub fn get(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Get a proposal mutably.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    /// Get all proposals.
    pub fn all(&self) -> Vec<&Proposal> {
        self.proposals.values().collect()
    }

    /// Get proposals by status.
    pub fn by_status(&self, status: ProposalStatus) -> Vec<&Proposal> {
        self.proposals
            .values()
            .filter(|p| p.status == status)
            .collect()
    }

    /// Get active proposals.
    pub fn active(&self) -> Vec<&Proposal> {
        self.by_status(ProposalStatus::Active)
    }

    /// Get executed proposals.
    pub fn executed(&self) -> Vec<&Proposal> {
        self.by_status(ProposalStatus::Executed)
    }

    /// Number of proposals ever created.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_proposal(start: u64, end: u64) -> Proposal {
        Proposal::new(
            1,
            "Test Proposal".to_string(),
            "Description".to_string(),
            String::new(),
            ProposalType::ParameterChange,
            Address::ZERO,
            start,
            end,
        )
    }

    fn voter(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_proposal_creation() {
        let proposal = test_proposal(100, 200);
        assert_eq!(proposal.id, 1);
        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert_eq!(proposal.total_votes(), 0);
        assert!(proposal.voters.is_empty());
    }

    #[test]
    fn test_activate() {
        let mut proposal = test_proposal(100, 200);

        // Can't activate before start_time
        assert!(matches!(
            proposal.activate(50),
            Err(GovernanceError::Timing(_))
        ));

        // Can activate at or after start_time
        assert!(proposal.activate(100).is_ok());
        assert_eq!(proposal.status, ProposalStatus::Active);

        // Can't activate again
        assert!(matches!(
            proposal.activate(100),
            Err(GovernanceError::State(_))
        ));
    }

    #[test]
    fn test_cast_vote() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();

        proposal
            .cast_vote(voter(1), VoteChoice::Yes, 1000, String::new(), 150)
            .unwrap();
        assert_eq!(proposal.yes_votes, 1000);
        assert!(proposal.has_voted(&voter(1)));
        assert_eq!(proposal.voters, vec![voter(1)]);

        // Can't vote twice
        assert_eq!(
            proposal.cast_vote(voter(1), VoteChoice::No, 1000, String::new(), 151),
            Err(GovernanceError::AlreadyVoted)
        );

        // Can't vote outside the window
        assert!(matches!(
            proposal.cast_vote(voter(2), VoteChoice::Yes, 500, String::new(), 201),
            Err(GovernanceError::Timing(_))
        ));
    }

    #[test]
    fn test_vote_before_activation_fails() {
        let mut proposal = test_proposal(100, 200);
        assert!(matches!(
            proposal.cast_vote(voter(1), VoteChoice::Yes, 1000, String::new(), 150),
            Err(GovernanceError::State(_))
        ));
    }

    #[test]
    fn test_bucket_sum_equals_frozen_powers() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();

        proposal.cast_vote(voter(1), VoteChoice::Yes, 300, String::new(), 110).unwrap();
        proposal.cast_vote(voter(2), VoteChoice::No, 200, String::new(), 120).unwrap();
        proposal.cast_vote(voter(3), VoteChoice::Abstain, 100, String::new(), 130).unwrap();

        let frozen: u128 = proposal.votes.values().map(|v| v.power).sum();
        assert_eq!(proposal.total_votes(), frozen);
    }

    #[test]
    fn test_change_vote_moves_frozen_power() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();

        proposal.cast_vote(voter(1), VoteChoice::Yes, 1000, String::new(), 110).unwrap();
        proposal.cast_vote(voter(2), VoteChoice::No, 400, String::new(), 110).unwrap();

        let total_before = proposal.total_votes();
        proposal
            .change_vote(voter(1), VoteChoice::No, "changed my mind".to_string(), 150)
            .unwrap();

        // Sum and voter-set size preserved, power moved between buckets
        assert_eq!(proposal.total_votes(), total_before);
        assert_eq!(proposal.voters.len(), 2);
        assert_eq!(proposal.yes_votes, 0);
        assert_eq!(proposal.no_votes, 1400);
        assert_eq!(proposal.vote_of(&voter(1)).unwrap().choice, VoteChoice::No);
        assert_eq!(proposal.vote_of(&voter(1)).unwrap().reason, "changed my mind");
    }

    #[test]
    fn test_change_vote_without_prior_vote() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();

        assert!(matches!(
            proposal.change_vote(voter(1), VoteChoice::Yes, String::new(), 150),
            Err(GovernanceError::Validation(_))
        ));
    }

    #[test]
    fn test_close_and_execute() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();

        // Can't close while the window is open
        assert!(matches!(
            proposal.close(true, 200),
            Err(GovernanceError::Timing(_))
        ));

        assert_eq!(proposal.close(true, 201).unwrap(), ProposalStatus::Passed);
        proposal.mark_executed(201).unwrap();
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert_eq!(proposal.executed_at, Some(201));

        // Terminal: can't execute or close again
        assert!(proposal.mark_executed(202).is_err());
        assert!(proposal.close(true, 202).is_err());
    }

    #[test]
    fn test_no_execute_without_passed() {
        let mut proposal = test_proposal(100, 200);

        // Pending -> Executed is impossible
        assert!(proposal.mark_executed(50).is_err());

        proposal.activate(100).unwrap();
        // Active -> Executed is impossible
        assert!(proposal.mark_executed(150).is_err());

        // Failed -> Executed is impossible
        proposal.close(false, 201).unwrap();
        assert!(proposal.mark_executed(202).is_err());
    }

    #[test]
    fn test_cancel() {
        let mut proposal = test_proposal(100, 200);

        // Cancel from Pending
        assert!(proposal.cancel(50).is_ok());
        assert_eq!(proposal.status, ProposalStatus::Canceled);
        assert_eq!(proposal.canceled_at, Some(50));

        // Terminal: can't cancel again
        assert!(matches!(proposal.cancel(60), Err(GovernanceError::State(_))));
    }

    #[test]
    fn test_cancel_after_outcome_fails() {
        let mut proposal = test_proposal(100, 200);
        proposal.activate(100).unwrap();
        proposal.close(false, 201).unwrap();

        assert!(matches!(proposal.cancel(202), Err(GovernanceError::State(_))));
    }

    #[test]
    fn test_proposal_store_monotonic_ids() {
        let mut store = ProposalStore::new();

        let id1 = store.create(
            "First".to_string(),
            "Description".to_string(),
            String::new(),
            ProposalType::FundAllocation,
            Address::ZERO,
            100,
            200,
        );
        let id2 = store.create(
            "Second".to_string(),
            "Description".to_string(),
            String::new(),
            ProposalType::Community,
            Address::ZERO,
            100,
            200,
        );

        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(id1).unwrap().proposal_type, ProposalType::FundAllocation);
    }

    #[test]
    fn test_store_by_status() {
        let mut store = ProposalStore::new();
        let id1 = store.create(
            "A".to_string(), "d".to_string(), String::new(),
            ProposalType::Community, Address::ZERO, 100, 200,
        );
        let _id2 = store.create(
            "B".to_string(), "d".to_string(), String::new(),
            ProposalType::Community, Address::ZERO, 100, 200,
        );

        store.get_mut(id1).unwrap().activate(100).unwrap();

        assert_eq!(store.active().len(), 1);
        assert_eq!(store.by_status(ProposalStatus::Pending).len(), 1);
        assert!(store.executed().is_empty());
    }
}
