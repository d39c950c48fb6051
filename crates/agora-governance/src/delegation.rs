//! Voting power delegation.
//!
//! Delegation transfers the exercise of a fixed power amount from one
//! member to another. The topology is a star, not a chain: received
//! power is added to a delegate's effective voting power but never
//! enters the delegate's own delegation capacity check, which consults
//! base power only. Power can therefore not be re-delegated.

use std::collections::HashMap;
use agora_types::Address;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Delegation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegator (who is delegating)
    pub delegator: Address,
    /// Delegate (who receives voting power)
    pub delegate: Address,
    /// Amount of power delegated
    pub amount: u128,
    /// When the delegation was created
    pub since: u64,
    /// Whether delegation is still active
    pub active: bool,
    /// When revoked (if revoked)
    pub revoked_at: Option<u64>,
}

impl Delegation {
    /// Create a new active delegation.
    pub fn new(delegator: Address, delegate: Address, amount: u128, since: u64) -> Self {
        Self {
            delegator,
            delegate,
            amount,
            since,
            active: true,
            revoked_at: None,
        }
    }

    /// Revoke the delegation.
    pub fn revoke(&mut self, now: u64) {
        self.active = false;
        self.revoked_at = Some(now);
    }
}

/// Ledger of all delegations.
///
/// At most one active delegation per delegator; setting a new one
/// replaces (never adds to) the existing one.
#[derive(Debug, Default)]
pub struct DelegationLedger {
    /// delegator -> current delegation (latest, active or revoked)
    delegations: HashMap<Address, Delegation>,
    /// delegate -> delegators with an active delegation to them
    delegators: HashMap<Address, Vec<Address>>,
}

impl DelegationLedger {
    /// Create a new ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delegation for `delegator`, replacing any existing one.
    ///
    /// Input validation and the capacity check against base power are the
    /// engine's responsibility; this records the already-validated result.
    pub fn set(&mut self, delegator: Address, delegate: Address, amount: u128, now: u64) {
        if let Some(existing) = self.delegations.get(&delegator) {
            if existing.active {
                let old_delegate = existing.delegate;
                if let Some(list) = self.delegators.get_mut(&old_delegate) {
                    list.retain(|d| *d != delegator);
                }
            }
        }

        self.delegators.entry(delegate).or_default().push(delegator);
        self.delegations
            .insert(delegator, Delegation::new(delegator, delegate, amount, now));
    }

    /// Remove the active delegation of `delegator`.
    pub fn remove(&mut self, delegator: Address, now: u64) -> Result<Delegation, GovernanceError> {
        let delegation = self
            .delegations
            .get_mut(&delegator)
            .filter(|d| d.active)
            .ok_or(GovernanceError::NoDelegation)?;

        delegation.revoke(now);
        let removed = delegation.clone();

        if let Some(list) = self.delegators.get_mut(&removed.delegate) {
            list.retain(|d| *d != delegator);
        }

        Ok(removed)
    }

    /// Amount the address has delegated away (0 if none active).
    pub fn delegated_away(&self, address: &Address) -> u128 {
        self.delegations
            .get(address)
            .filter(|d| d.active)
            .map(|d| d.amount)
            .unwrap_or(0)
    }

    /// Total amount actively delegated to the address.
    pub fn delegated_in(&self, address: &Address) -> u128 {
        self.delegators
            .get(address)
            .map(|list| {
                list.iter()
                    .filter_map(|d| self.delegations.get(d))
                    .filter(|d| d.active && d.delegate == *address)
                    .map(|d| d.amount)
                    .fold(0u128, |acc, amount| acc.saturating_add(amount))
            })
            .unwrap_or(0)
    }

    /// Delegators with an active delegation to the address.
    pub fn delegators_of(&self, delegate: &Address) -> Vec<Address> {
        self.delegators.get(delegate).cloned().unwrap_or_default()
    }

    /// Get the delegation record of a delegator (active or revoked).
    pub fn get(&self, delegator: &Address) -> Option<&Delegation> {
        self.delegations.get(delegator)
    }

    /// Check if an address has an active delegation.
    pub fn is_delegating(&self, address: &Address) -> bool {
        self.delegations
            .get(address)
            .map(|d| d.active)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    #[test]
    fn test_set_and_get() {
        let mut ledger = DelegationLedger::new();
        let alice = addr(1);
        let bob = addr(2);

        ledger.set(alice, bob, 100, 50);
        assert!(ledger.is_delegating(&alice));
        assert_eq!(ledger.delegated_away(&alice), 100);
        assert_eq!(ledger.delegated_in(&bob), 100);
        assert_eq!(ledger.delegators_of(&bob), vec![alice]);

        let record = ledger.get(&alice).unwrap();
        assert_eq!(record.delegate, bob);
        assert_eq!(record.since, 50);
    }

    #[test]
    fn test_replace_semantics() {
        let mut ledger = DelegationLedger::new();
        let alice = addr(1);
        let bob = addr(2);
        let charlie = addr(3);

        ledger.set(alice, bob, 100, 50);
        ledger.set(alice, charlie, 60, 60);

        // Replaced, not additive
        assert_eq!(ledger.delegated_away(&alice), 60);
        assert_eq!(ledger.delegated_in(&bob), 0);
        assert_eq!(ledger.delegated_in(&charlie), 60);
        assert!(ledger.delegators_of(&bob).is_empty());
    }

    #[test]
    fn test_remove() {
        let mut ledger = DelegationLedger::new();
        let alice = addr(1);
        let bob = addr(2);

        ledger.set(alice, bob, 100, 50);
        let removed = ledger.remove(alice, 70).unwrap();
        assert_eq!(removed.amount, 100);
        assert_eq!(removed.revoked_at, Some(70));

        assert!(!ledger.is_delegating(&alice));
        assert_eq!(ledger.delegated_away(&alice), 0);
        assert_eq!(ledger.delegated_in(&bob), 0);

        // Can't remove twice
        assert_eq!(ledger.remove(alice, 80), Err(GovernanceError::NoDelegation));
    }

    #[test]
    fn test_remove_without_delegation() {
        let mut ledger = DelegationLedger::new();
        assert_eq!(ledger.remove(addr(1), 10), Err(GovernanceError::NoDelegation));
    }

    #[test]
    fn test_multiple_delegators() {
        let mut ledger = DelegationLedger::new();
        let alice = addr(1);
        let bob = addr(2);
        let charlie = addr(3);

        ledger.set(alice, charlie, 100, 50);
        ledger.set(bob, charlie, 250, 51);

        assert_eq!(ledger.delegated_in(&charlie), 350);
        let delegators = ledger.delegators_of(&charlie);
        assert_eq!(delegators.len(), 2);
        assert!(delegators.contains(&alice));
        assert!(delegators.contains(&bob));
    }

    #[test]
    fn test_re_delegate_to_same_delegate() {
        let mut ledger = DelegationLedger::new();
        let alice = addr(1);
        let bob = addr(2);

        ledger.set(alice, bob, 100, 50);
        ledger.set(alice, bob, 40, 60);

        assert_eq!(ledger.delegated_away(&alice), 40);
        assert_eq!(ledger.delegated_in(&bob), 40);
        // Reverse index holds alice exactly once
        assert_eq!(ledger.delegators_of(&bob), vec![alice]);
    }
}
