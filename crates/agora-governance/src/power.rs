//! Voting power calculation.
//!
//! Base power = balance + staked * 3/2, plus a one-time reputation bonus
//! of floor(reputation / 100) percent. Integer arithmetic throughout.

use agora_types::Address;
use serde::{Deserialize, Serialize};

/// External source of balance, staked balance, and reputation.
///
/// The engine reads live components through this trait on every power
/// query; it never caches. Token accounting itself is out of scope.
pub trait PowerProvider: Send + Sync {
    /// Liquid balance of an address.
    fn balance(&self, address: &Address) -> u128;

    /// Staked balance of an address.
    fn staked_balance(&self, address: &Address) -> u128;

    /// Reputation score (0-100+ scale, no fixed upper bound).
    fn reputation(&self, address: &Address) -> u64;
}

/// The raw power components of one address at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerComponents {
    /// Liquid balance
    pub balance: u128,
    /// Staked balance
    pub staked: u128,
    /// Reputation score
    pub reputation: u64,
}

impl PowerComponents {
    /// Read the current components of an address from a provider.
    pub fn read(provider: &dyn PowerProvider, address: &Address) -> Self {
        Self {
            balance: provider.balance(address),
            staked: provider.staked_balance(address),
            reputation: provider.reputation(address),
        }
    }

    /// Base voting power of these components.
    pub fn base_power(&self) -> u128 {
        compute_base_power(self.balance, self.staked, self.reputation)
    }
}

/// Compute base voting power from raw components.
///
/// Staked holdings weigh 1.5x; reputation grants a single bonus of
/// floor(reputation / 100) percent on top. The bonus is applied exactly
/// once, with no compounding.
pub fn compute_base_power(balance: u128, staked: u128, reputation: u64) -> u128 {
    let power = balance.saturating_add(staked.saturating_mul(3) / 2);
    let bonus_percent = reputation as u128 / 100;
    power.saturating_add(power.saturating_mul(bonus_percent) / 100)
}
