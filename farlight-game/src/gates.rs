//! Unlock gating. Catalog entries become visible once the colony's current
//! signal stock clears the entry's threshold and every prerequisite tech is
//! owned. Visibility tracks the live balance, so spending signal can hide
//! an entry again; ownership is never revoked.
use crate::catalog::{Body, Building, Catalog, ResourceKind, Tech};
use crate::state::ColonyState;

#[must_use]
pub fn entry_unlocked(state: &ColonyState, unlock: f64, requires: &[String]) -> bool {
    state.ledger.get(ResourceKind::Signal) >= unlock
        && requires.iter().all(|tech| state.owns_tech(tech))
}

#[must_use]
pub fn body_unlocked(state: &ColonyState, body: &Body) -> bool {
    entry_unlocked(state, body.unlock, &body.requires)
}

#[must_use]
pub fn building_unlocked(state: &ColonyState, building: &Building) -> bool {
    entry_unlocked(state, building.unlock, &building.requires)
}

#[must_use]
pub fn tech_unlocked(state: &ColonyState, tech: &Tech) -> bool {
    entry_unlocked(state, tech.unlock, &tech.requires)
}

/// Bodies currently visible as mission targets.
#[must_use]
pub fn unlocked_bodies<'a>(catalog: &'a Catalog, state: &ColonyState) -> Vec<&'a Body> {
    catalog
        .bodies
        .iter()
        .filter(|body| body_unlocked(state, body))
        .collect()
}

/// Buildings currently visible in the construction list.
#[must_use]
pub fn unlocked_buildings<'a>(catalog: &'a Catalog, state: &ColonyState) -> Vec<&'a Building> {
    catalog
        .buildings
        .iter()
        .filter(|building| building_unlocked(state, building))
        .collect()
}

/// Techs currently visible for research, owned ones excluded.
#[must_use]
pub fn unlocked_techs<'a>(catalog: &'a Catalog, state: &ColonyState) -> Vec<&'a Tech> {
    catalog
        .techs
        .iter()
        .filter(|tech| !state.owns_tech(&tech.id) && tech_unlocked(state, tech))
        .collect()
}
