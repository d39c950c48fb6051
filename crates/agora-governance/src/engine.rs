//! The governance engine.
//!
//! Owns the proposal, delegation, and snapshot stores, the settings
//! record, and the council/executor role sets. Every mutating operation
//! checks all of its preconditions before the first state write, so a
//! returned error leaves no partial state. Time is an external input:
//! each time-sensitive operation takes `now` as a parameter and nothing
//! ever fires on an internal timer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use agora_types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::delegation::{Delegation, DelegationLedger};
use crate::effects::HandlerRegistry;
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;
use crate::power::{PowerComponents, PowerProvider};
use crate::proposal::{Proposal, ProposalStatus, ProposalStore, ProposalType, Vote, VoteChoice};
use crate::settings::GovernanceSettings;
use crate::snapshot::SnapshotStore;
use crate::tally;

/// Aggregate counters for ops tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceStats {
    /// Proposals ever created
    pub proposals: usize,
    /// Distinct voters ever seen
    pub voters: usize,
    /// Snapshots taken
    pub snapshots: usize,
}

/// Single authoritative governance state owner.
pub struct GovernanceEngine {
    settings: GovernanceSettings,
    admin: Address,
    council: HashSet<Address>,
    executors: HashSet<Address>,
    proposals: ProposalStore,
    delegations: DelegationLedger,
    snapshots: SnapshotStore,
    provider: Arc<dyn PowerProvider>,
    handlers: HandlerRegistry,
    /// Every address that has ever cast a vote, in first-vote order
    voters: Vec<Address>,
    voter_index: HashSet<Address>,
    /// Last proposal-creating action per member, for the cooldown
    last_action: HashMap<Address, u64>,
    events: Vec<GovernanceEvent>,
}

impl GovernanceEngine {
    /// Create a new engine.
    ///
    /// `provider` is the external balance/stake/reputation source;
    /// `handlers` maps proposal types to their effect executors and is
    /// fixed for the engine's lifetime.
    pub fn new(
        admin: Address,
        settings: GovernanceSettings,
        provider: Arc<dyn PowerProvider>,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            settings,
            admin,
            council: HashSet::new(),
            executors: HashSet::new(),
            proposals: ProposalStore::new(),
            delegations: DelegationLedger::new(),
            snapshots: SnapshotStore::new(),
            provider,
            handlers,
            voters: Vec::new(),
            voter_index: HashSet::new(),
            last_action: HashMap::new(),
            events: Vec::new(),
        }
    }

    // ---- proposal lifecycle ----

    /// Create a proposal.
    ///
    /// `start_time = now + execution_delay`, `end_time = start_time +
    /// voting_period`. Records the proposer's last action for the
    /// cooldown.
    pub fn create_proposal(
        &mut self,
        title: String,
        description: String,
        metadata: String,
        proposal_type: ProposalType,
        proposer: Address,
        now: u64,
    ) -> Result<u64, GovernanceError> {
        if title.trim().is_empty() {
            return Err(GovernanceError::Validation("title is empty".to_string()));
        }
        if description.trim().is_empty() {
            return Err(GovernanceError::Validation(
                "description is empty".to_string(),
            ));
        }

        let power = self.voting_power(&proposer);
        if power < self.settings.proposal_threshold {
            return Err(GovernanceError::InsufficientPower {
                required: self.settings.proposal_threshold,
                actual: power,
            });
        }

        if let Some(last) = self.last_action.get(&proposer) {
            let ready_at = last.saturating_add(self.settings.proposal_cooldown);
            if now < ready_at {
                return Err(GovernanceError::CooldownActive {
                    remaining: ready_at - now,
                });
            }
        }

        let start_time = now.saturating_add(self.settings.execution_delay);
        let end_time = start_time.saturating_add(self.settings.voting_period);

        let id = self.proposals.create(
            title,
            description,
            metadata,
            proposal_type,
            proposer,
            start_time,
            end_time,
        );
        self.last_action.insert(proposer, now);

        info!("Proposal #{} ({}) created by {}", id, proposal_type.name(), proposer);
        self.events.push(GovernanceEvent::ProposalCreated {
            id,
            proposer,
            proposal_type,
        });
        Ok(id)
    }

    /// Activate a pending proposal once its start time has been reached.
    pub fn activate_proposal(
        &mut self,
        id: u64,
        caller: Address,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if !self.can_manage(&caller, &proposal.proposer) {
            return Err(GovernanceError::Authorization(
                "only the proposer, council, or admin may activate".to_string(),
            ));
        }

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.activate(now)?;

        info!("Proposal #{} activated", id);
        self.events.push(GovernanceEvent::ProposalActivated { id });
        Ok(())
    }

    /// Cancel a pending or active proposal. No vote or quorum check.
    pub fn cancel_proposal(
        &mut self,
        id: u64,
        caller: Address,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if !self.can_manage(&caller, &proposal.proposer) {
            return Err(GovernanceError::Authorization(
                "only the proposer, council, or admin may cancel".to_string(),
            ));
        }

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.cancel(now)?;

        info!("Proposal #{} canceled", id);
        self.events.push(GovernanceEvent::ProposalCanceled { id });
        Ok(())
    }

    /// Execute a proposal after its voting window has closed.
    ///
    /// Evaluates the tally exactly once. On pass, status advances Passed
    /// -> Executed and the type's effect handler is invoked once; a
    /// handler failure is logged and reflected in the event but does NOT
    /// roll back the status (see DESIGN.md). On fail, status becomes
    /// Failed.
    pub fn execute_proposal(
        &mut self,
        id: u64,
        caller: Address,
        now: u64,
    ) -> Result<ProposalStatus, GovernanceError> {
        let proposal = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::State(format!(
                "cannot execute from status {:?}",
                proposal.status
            )));
        }
        if now <= proposal.end_time {
            return Err(GovernanceError::Timing(format!(
                "voting window open until {}, now {}",
                proposal.end_time, now
            )));
        }
        if !self.can_execute(&caller, &proposal.proposer) {
            return Err(GovernanceError::Authorization(
                "only the proposer, an authorized executor, council, or admin may execute"
                    .to_string(),
            ));
        }

        let result = tally::evaluate(
            proposal.yes_votes,
            proposal.no_votes,
            proposal.abstain_votes,
            self.settings.quorum_votes,
        );
        debug!(
            "Proposal #{} tally: yes={} no={} abstain={} quorum_met={} passed={}",
            id, result.yes, result.no, result.abstain, result.quorum_met, result.passed
        );

        let proposal_type = proposal.proposal_type;
        let metadata = proposal.metadata.clone();

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.close(result.passed, now)?;

        let mut effect_applied = false;
        if result.passed {
            // Status commits before the effect handler runs.
            proposal.mark_executed(now)?;

            match self.handlers.apply(id, proposal_type, &metadata) {
                Ok(()) => effect_applied = true,
                Err(e) => {
                    warn!(
                        "Proposal #{} effect handler failed (status stays Executed): {}",
                        id, e
                    );
                }
            }
            info!("Proposal #{} passed and executed", id);
        } else {
            info!("Proposal #{} failed ({})", id, if result.quorum_met {
                "majority against"
            } else {
                "quorum unmet"
            });
        }

        self.events.push(GovernanceEvent::ProposalExecuted {
            id,
            passed: result.passed,
            effect_applied,
        });

        Ok(if result.passed {
            ProposalStatus::Executed
        } else {
            ProposalStatus::Failed
        })
    }

    // ---- voting ----

    /// Cast a vote on an active proposal.
    ///
    /// The voter's power is read live, frozen into the vote record, and
    /// never recomputed for this vote afterwards.
    pub fn vote(
        &mut self,
        id: u64,
        voter: Address,
        choice: VoteChoice,
        reason: String,
        now: u64,
    ) -> Result<(), GovernanceError> {
        {
            let proposal = self
                .proposals
                .get(id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            proposal.ensure_votable(now)?;
            if proposal.has_voted(&voter) {
                return Err(GovernanceError::AlreadyVoted);
            }
        }

        let power = self.voting_power(&voter);
        if power < self.settings.min_voting_power {
            return Err(GovernanceError::InsufficientPower {
                required: self.settings.min_voting_power,
                actual: power,
            });
        }

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.cast_vote(voter, choice, power, reason, now)?;

        if self.voter_index.insert(voter) {
            self.voters.push(voter);
        }

        info!("Vote on proposal #{}: {} -> {:?} ({})", id, voter, choice, power);
        self.events.push(GovernanceEvent::Voted {
            id,
            voter,
            choice,
            power,
        });
        Ok(())
    }

    /// Change an existing vote within the voting window.
    ///
    /// Moves the originally frozen power between buckets; the live
    /// calculator is not consulted.
    pub fn change_vote(
        &mut self,
        id: u64,
        voter: Address,
        new_choice: VoteChoice,
        reason: String,
        now: u64,
    ) -> Result<(), GovernanceError> {
        if !self.settings.allow_vote_change {
            return Err(GovernanceError::VoteChangeDisabled);
        }

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.change_vote(voter, new_choice, reason, now)?;

        info!("Vote changed on proposal #{}: {} -> {:?}", id, voter, new_choice);
        self.events.push(GovernanceEvent::VoteChanged {
            id,
            voter,
            choice: new_choice,
        });
        Ok(())
    }

    // ---- voting power ----

    /// Base power of an address from live components, before delegation.
    pub fn base_power(&self, address: &Address) -> u128 {
        PowerComponents::read(self.provider.as_ref(), address).base_power()
    }

    /// Effective voting power of an address, recomputed from live data on
    /// every call.
    ///
    /// base power - delegated away + delegated in, clamped to
    /// `[0, max_voting_power]`. Delegated amounts are re-validated only
    /// at delegation time, so the subtraction saturates.
    pub fn voting_power(&self, address: &Address) -> u128 {
        let base = self.base_power(address);
        let away = self.delegations.delegated_away(address);
        let incoming = self.delegations.delegated_in(address);

        base.saturating_sub(away)
            .saturating_add(incoming)
            .min(self.settings.max_voting_power)
    }

    /// Historical base power from a snapshot's frozen components.
    ///
    /// Ignores delegation entirely: the figure reflects only owned,
    /// staked, and reputation power at snapshot time. Addresses unknown
    /// to the snapshot have zero power.
    pub fn voting_power_at_snapshot(
        &self,
        address: &Address,
        snapshot_id: u64,
    ) -> Result<u128, GovernanceError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or(GovernanceError::SnapshotNotFound(snapshot_id))?;

        Ok(snapshot
            .components_of(address)
            .map(|c| c.base_power())
            .unwrap_or(0))
    }

    // ---- delegation ----

    /// Delegate a fixed power amount, replacing any existing delegation.
    ///
    /// The capacity check consults base power only: delegated-in power is
    /// excluded, so received power can never be re-delegated.
    pub fn delegate(
        &mut self,
        delegator: Address,
        delegate: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), GovernanceError> {
        if !self.settings.allow_delegation {
            return Err(GovernanceError::DelegationDisabled);
        }
        if delegate.is_zero() {
            return Err(GovernanceError::Validation(
                "delegate is the zero address".to_string(),
            ));
        }
        if delegate == delegator {
            return Err(GovernanceError::Validation(
                "cannot delegate to self".to_string(),
            ));
        }
        if amount == 0 {
            return Err(GovernanceError::Validation(
                "delegation amount is zero".to_string(),
            ));
        }

        let base = self.base_power(&delegator);
        if amount > base {
            return Err(GovernanceError::InsufficientPower {
                required: amount,
                actual: base,
            });
        }

        self.delegations.set(delegator, delegate, amount, now);

        info!("Delegation: {} -> {} ({})", delegator, delegate, amount);
        self.events.push(GovernanceEvent::DelegationUpdated {
            delegator,
            delegate: Some(delegate),
            amount,
        });
        Ok(())
    }

    /// Remove the caller's active delegation.
    pub fn remove_delegation(
        &mut self,
        delegator: Address,
        now: u64,
    ) -> Result<(), GovernanceError> {
        let removed = self.delegations.remove(delegator, now)?;

        info!("Delegation removed: {} -> {}", delegator, removed.delegate);
        self.events.push(GovernanceEvent::DelegationUpdated {
            delegator,
            delegate: None,
            amount: 0,
        });
        Ok(())
    }

    // ---- snapshots ----

    /// Take a snapshot of every known voter's raw power components.
    /// Admin-only.
    pub fn create_snapshot(
        &mut self,
        caller: Address,
        reference_time: u64,
        now: u64,
    ) -> Result<u64, GovernanceError> {
        self.ensure_admin(&caller, "create snapshots")?;

        let mut balances = HashMap::with_capacity(self.voters.len());
        for voter in &self.voters {
            balances.insert(*voter, PowerComponents::read(self.provider.as_ref(), voter));
        }

        let id = self.snapshots.create(now, reference_time, balances);

        info!("Snapshot #{} created ({} addresses)", id, self.voters.len());
        self.events.push(GovernanceEvent::SnapshotCreated { id });
        Ok(id)
    }

    // ---- administration ----

    /// Replace the settings record. Admin-only.
    pub fn update_settings(
        &mut self,
        caller: Address,
        settings: GovernanceSettings,
    ) -> Result<(), GovernanceError> {
        self.ensure_admin(&caller, "update settings")?;

        self.settings = settings;
        info!("Governance settings updated");
        self.events.push(GovernanceEvent::SettingsUpdated);
        Ok(())
    }

    /// Add a council member. Admin-only.
    pub fn add_council_member(
        &mut self,
        caller: Address,
        member: Address,
    ) -> Result<(), GovernanceError> {
        self.ensure_admin(&caller, "manage the council")?;

        if self.council.insert(member) {
            info!("Council member added: {}", member);
            self.events
                .push(GovernanceEvent::CouncilMemberAdded { member });
        }
        Ok(())
    }

    /// Remove a council member. Admin-only.
    pub fn remove_council_member(
        &mut self,
        caller: Address,
        member: Address,
    ) -> Result<(), GovernanceError> {
        self.ensure_admin(&caller, "manage the council")?;

        if self.council.remove(&member) {
            info!("Council member removed: {}", member);
            self.events
                .push(GovernanceEvent::CouncilMemberRemoved { member });
        }
        Ok(())
    }

    /// Add an authorized executor. Admin-only.
    pub fn add_authorized_executor(
        &mut self,
        caller: Address,
        executor: Address,
    ) -> Result<(), GovernanceError> {
        self.ensure_admin(&caller, "manage executors")?;

        if self.executors.insert(executor) {
            info!("Authorized executor added: {}", executor);
            self.events.push(GovernanceEvent::ExecutorAdded { executor });
        }
        Ok(())
    }

    /// Remove an authorized executor. Admin-only.
    pub fn remove_authorized_executor(
        &mut self,
        caller: Address,
        executor: Address,
    ) -> Result<(), GovernanceError> {
        self.ensure_admin(&caller, "manage executors")?;

        if self.executors.remove(&executor) {
            info!("Authorized executor removed: {}", executor);
            self.events.push(GovernanceEvent::ExecutorRemoved { executor });
        }
        Ok(())
    }

    // ---- read-only queries ----

    /// Get a proposal.
    pub fn get_proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(id)
    }

    /// Get a voter's vote on a proposal.
    pub fn get_user_vote(&self, id: u64, voter: &Address) -> Option<&Vote> {
        self.proposals.get(id).and_then(|p| p.vote_of(voter))
    }

    /// Proposals currently accepting votes.
    pub fn active_proposals(&self) -> Vec<&Proposal> {
        self.proposals.active()
    }

    /// Proposals that passed and were executed.
    pub fn executed_proposals(&self) -> Vec<&Proposal> {
        self.proposals.executed()
    }

    /// Every address that has ever voted, in first-vote order.
    pub fn all_voters(&self) -> &[Address] {
        &self.voters
    }

    /// Delegation record of a delegator (active or revoked).
    pub fn get_delegation(&self, delegator: &Address) -> Option<&Delegation> {
        self.delegations.get(delegator)
    }

    /// Delegators with an active delegation to an address.
    pub fn get_delegators(&self, delegate: &Address) -> Vec<Address> {
        self.delegations.delegators_of(delegate)
    }

    /// Current settings.
    pub fn settings(&self) -> &GovernanceSettings {
        &self.settings
    }

    /// Aggregate counters.
    pub fn stats(&self) -> GovernanceStats {
        GovernanceStats {
            proposals: self.proposals.len(),
            voters: self.voters.len(),
            snapshots: self.snapshots.len(),
        }
    }

    /// Drain the pending notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- internal ----

    fn ensure_admin(&self, caller: &Address, action: &str) -> Result<(), GovernanceError> {
        if *caller != self.admin {
            return Err(GovernanceError::Authorization(format!(
                "only the admin may {}",
                action
            )));
        }
        Ok(())
    }

    fn can_manage(&self, caller: &Address, proposer: &Address) -> bool {
        caller == proposer || *caller == self.admin || self.council.contains(caller)
    }

    fn can_execute(&self, caller: &Address, proposer: &Address) -> bool {
        self.can_manage(caller, proposer) || self.executors.contains(caller)
    }
}

/// Thread-safe engine handle: writers are serialized, readers run
/// concurrently.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<GovernanceEngine>>,
}

impl SharedEngine {
    /// Wrap an engine for shared use.
    pub fn new(engine: GovernanceEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Run a read-only query under the shared read lock.
    pub fn read<R>(&self, f: impl FnOnce(&GovernanceEngine) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a mutating operation under the exclusive write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut GovernanceEngine) -> R) -> R {
        f(&mut self.inner.write())
    }
}
