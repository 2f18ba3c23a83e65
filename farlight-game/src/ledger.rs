//! Resource ledger and the per-tick rate vector.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::ResourceKind;

/// Mapping of resource kind to a non-negative stock. The single source of
/// truth for player wealth; every write path clamps at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceLedger(BTreeMap<ResourceKind, f64>);

impl ResourceLedger {
    /// Current balance for a kind; missing entries read as zero.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    /// Add to a balance, clamping the result at zero.
    pub fn credit(&mut self, kind: ResourceKind, amount: f64) {
        let entry = self.0.entry(kind).or_insert(0.0);
        *entry = (*entry + amount).max(0.0);
    }

    /// Remove from a balance. Debiting more than is stored yields exactly
    /// zero; it never goes negative and never fails.
    pub fn debit(&mut self, kind: ResourceKind, amount: f64) {
        self.credit(kind, -amount);
    }

    /// True iff every cost entry is covered by the current balance.
    #[must_use]
    pub fn can_afford(&self, cost: &BTreeMap<ResourceKind, f64>) -> bool {
        cost.iter().all(|(kind, amount)| self.get(*kind) >= *amount)
    }

    /// Debit every entry of a cost map. Callers check `can_afford` first;
    /// the clamp still holds if they do not.
    pub fn pay(&mut self, cost: &BTreeMap<ResourceKind, f64>) {
        for (kind, amount) in cost {
            self.debit(*kind, *amount);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.0.iter().map(|(kind, amount)| (*kind, *amount))
    }

    /// Repair pass for loaded snapshots: floors every entry at zero.
    pub fn clamp_non_negative(&mut self) {
        for amount in self.0.values_mut() {
            *amount = amount.max(0.0);
        }
    }
}

/// Signed per-tick deltas for the flow-capable kinds. Rebuilt from scratch
/// every tick, applied to the ledger once, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct RateVector(BTreeMap<ResourceKind, f64>);

impl RateVector {
    /// A zeroed vector covering every flow kind.
    #[must_use]
    pub fn new() -> Self {
        Self(
            ResourceKind::FLOW
                .iter()
                .map(|kind| (*kind, 0.0))
                .collect(),
        )
    }

    /// Accumulate a contribution. Non-flow kinds are not representable as
    /// rates and are dropped.
    pub fn add(&mut self, kind: ResourceKind, amount: f64) {
        if let Some(rate) = self.0.get_mut(&kind) {
            *rate += amount;
        }
    }

    pub fn sub(&mut self, kind: ResourceKind, amount: f64) {
        self.add(kind, -amount);
    }

    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    /// Sum the vector into the ledger with clamped credits.
    pub fn apply_to(&self, ledger: &mut ResourceLedger) {
        for (kind, rate) in &self.0 {
            ledger.credit(*kind, *rate);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.0.iter().map(|(kind, rate)| (*kind, *rate))
    }
}

impl Default for RateVector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;

    #[test]
    fn debit_clamps_at_zero_instead_of_failing() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Metal, 3.0);
        ledger.debit(ResourceKind::Metal, 10.0);
        assert!(ledger.get(ResourceKind::Metal).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn credit_with_negative_amount_clamps() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Fuel, -4.0);
        assert!(ledger.get(ResourceKind::Fuel).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn can_afford_treats_missing_entries_as_zero() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Metal, 10.0);
        let mut cost = BTreeMap::new();
        cost.insert(ResourceKind::Metal, 5.0);
        cost.insert(ResourceKind::Rare, 1.0);
        assert!(!ledger.can_afford(&cost));
        ledger.credit(ResourceKind::Rare, 1.0);
        assert!(ledger.can_afford(&cost));
    }

    #[test]
    fn rate_vector_applies_with_clamped_credit() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Power, 1.0);
        let mut rates = RateVector::new();
        rates.add(ResourceKind::Power, 0.5);
        rates.sub(ResourceKind::Power, 2.0);
        assert!((rates.get(ResourceKind::Power) + 1.5).abs() < FLOAT_EPSILON);
        rates.apply_to(&mut ledger);
        assert!(ledger.get(ResourceKind::Power).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn rate_vector_drops_non_flow_kinds() {
        let mut rates = RateVector::new();
        rates.add(ResourceKind::Habitat, 5.0);
        assert!(rates.get(ResourceKind::Habitat).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn pay_debits_every_entry() {
        let mut ledger = ResourceLedger::default();
        ledger.credit(ResourceKind::Metal, 20.0);
        ledger.credit(ResourceKind::Organics, 8.0);
        let mut cost = BTreeMap::new();
        cost.insert(ResourceKind::Metal, 10.0);
        cost.insert(ResourceKind::Organics, 5.0);
        ledger.pay(&cost);
        assert!((ledger.get(ResourceKind::Metal) - 10.0).abs() < FLOAT_EPSILON);
        assert!((ledger.get(ResourceKind::Organics) - 3.0).abs() < FLOAT_EPSILON);
    }
}
