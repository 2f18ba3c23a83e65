//! Per-tick production pass: rebuild the flow-rate vector from owned
//! buildings and tech passives, apply it to the ledger, charge crew food
//! upkeep, and recompute satisfaction from supply sufficiency.
use crate::catalog::{Catalog, ResourceKind};
use crate::colony::UpkeepCfg;
use crate::constants::{SATISFACTION_MAX, SATISFACTION_MIN};
use crate::crew::{morale_multiplier, role_multiplier};
use crate::ledger::RateVector;
use crate::state::ColonyState;

/// Flow summary for one production pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionOutcome {
    pub rates: RateVector,
    pub power_ok: bool,
    pub food_ok: bool,
}

/// Run one production pass over `state`.
///
/// Order matters: rates land on the ledger first, then the per-worker food
/// upkeep is debited outside the rate vector, and only then is satisfaction
/// recomputed so the food check sees the post-upkeep stock.
pub fn apply_production(
    catalog: &Catalog,
    cfg: &UpkeepCfg,
    state: &mut ColonyState,
) -> ProductionOutcome {
    let rates = flow_rates(catalog, state);
    rates.apply_to(&mut state.ledger);

    let need = f64::from(state.workers.total) * cfg.food_per_worker;
    state.ledger.debit(ResourceKind::Food, need);

    let power_ok = rates.get(ResourceKind::Power) >= 0.0;
    let food_ok = state.ledger.get(ResourceKind::Food) >= need * cfg.food_ok_ratio;

    let mut base = 1.0;
    if !food_ok {
        base *= cfg.food_short_factor;
    }
    if !power_ok {
        base *= cfg.power_short_factor;
    }
    state.workers.satisfaction =
        (base + rates.get(ResourceKind::Morale)).clamp(SATISFACTION_MIN, SATISFACTION_MAX);

    ProductionOutcome {
        rates,
        power_ok,
        food_ok,
    }
}

/// Rebuild the tick's rate vector from scratch. Crew and morale factors
/// scale production of the productivity-scaled kinds only; consumption runs
/// unscaled, and flat kinds (signal, power, morale) ignore crew entirely.
/// Building or tech ids missing from the catalog are skipped.
#[must_use]
pub fn flow_rates(catalog: &Catalog, state: &ColonyState) -> RateVector {
    let mut rates = RateVector::new();
    let morale = morale_multiplier(state);
    for (id, level) in &state.buildings {
        if *level == 0 {
            continue;
        }
        let Some(building) = catalog.building(id) else {
            continue;
        };
        let level = f64::from(*level);
        let crew = role_multiplier(state, building) * morale;
        for (kind, amount) in &building.produces {
            let scale = if kind.productivity_scaled() { crew } else { 1.0 };
            rates.add(*kind, amount * level * scale);
        }
        for (kind, amount) in &building.consumes {
            rates.sub(*kind, amount * level);
        }
    }
    for tech_id in &state.tech {
        let Some(tech) = catalog.tech(tech_id) else {
            continue;
        };
        for (kind, amount) in &tech.passive {
            rates.add(*kind, *amount);
        }
    }
    rates
}
