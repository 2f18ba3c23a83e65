//! Mission scheduling and resolution. Missions are polled, not timed:
//! launches record an absolute deadline and the tick scan resolves every
//! record whose deadline has passed, so irregular cadence (a suspended
//! host) never loses an expedition.
use rand::Rng;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::catalog::{Body, Catalog, ResourceKind};
use crate::colony::{CommandError, MissionsCfg};
use crate::gates::body_unlocked;
use crate::state::{ColonyState, Mission};

/// What one resolved expedition brought home.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub body_id: String,
    /// The hazard roll landed and cargo was cut to the penalty share.
    pub struck: bool,
    /// Credited cargo per kind, post-multiplier, zero entries omitted.
    pub cargo: BTreeMap<ResourceKind, f64>,
}

/// Fuel price for a launch. The first launch of a colony is free; after
/// that the price scales with travel distance under a fixed floor.
#[must_use]
pub fn fuel_cost(cfg: &MissionsCfg, body: &Body, first_launch_done: bool) -> u32 {
    if !first_launch_done {
        return 0;
    }
    (body.travel / cfg.fuel_cost_divisor).max(cfg.fuel_cost_floor)
}

/// Concurrent-mission capacity, recomputed from current upgrades at call
/// time rather than cached.
#[must_use]
pub fn slot_capacity(catalog: &Catalog, cfg: &MissionsCfg, state: &ColonyState) -> u32 {
    let mut slots = cfg.base_slots;
    for (id, level) in &state.buildings {
        if let Some(building) = catalog.building(id) {
            slots += building.slots * level;
        }
    }
    for tech_id in &state.tech {
        if let Some(tech) = catalog.tech(tech_id) {
            slots += tech.slots;
        }
    }
    slots
}

/// Total hazard probability shaved off by owned tech.
#[must_use]
pub fn hazard_reduction(catalog: &Catalog, state: &ColonyState) -> f64 {
    state
        .tech
        .iter()
        .filter_map(|id| catalog.tech(id))
        .map(|tech| tech.hazard_reduction)
        .sum()
}

/// Cargo multiplier applied on a clean return: 1 plus every owned tech's
/// drone and rare-retrieval bonuses.
#[must_use]
pub fn cargo_multiplier(catalog: &Catalog, state: &ColonyState) -> f64 {
    1.0 + state
        .tech
        .iter()
        .filter_map(|id| catalog.tech(id))
        .map(|tech| tech.cargo_bonus + tech.rare_bonus)
        .sum::<f64>()
}

/// Launch an expedition toward `body_id` at wall-clock `now`.
///
/// # Errors
/// Rejects when the body is unknown or still locked, all slots are busy,
/// or the fuel price cannot be paid. Rejection leaves state untouched.
pub fn start_mission(
    catalog: &Catalog,
    cfg: &MissionsCfg,
    state: &mut ColonyState,
    body_id: &str,
    now: u64,
) -> Result<String, CommandError> {
    let Some(body) = catalog.body(body_id) else {
        return Err(CommandError::UnknownId {
            id: body_id.to_string(),
        });
    };
    if !body_unlocked(state, body) {
        return Err(CommandError::TargetLocked {
            id: body_id.to_string(),
        });
    }
    let slots = slot_capacity(catalog, cfg, state);
    if state.missions.len() >= slots as usize {
        return Err(CommandError::SlotsBusy { slots });
    }
    let cost = fuel_cost(cfg, body, state.first_launch_done);
    let have = state.ledger.get(ResourceKind::Fuel);
    if f64::from(cost) > have {
        return Err(CommandError::InsufficientFuel { need: cost, have });
    }

    state.ledger.debit(ResourceKind::Fuel, f64::from(cost));
    state.first_launch_done = true;
    state.missions.push(Mission {
        body_id: body.id.clone(),
        ends_at: now + u64::from(body.travel) * cfg.travel_ms_per_unit,
        hazard: body.hazard,
    });
    Ok(format!("Launch window green: crew en route to {}.", body.name))
}

/// Resolve every mission whose deadline has passed, crediting cargo and
/// removing the records. A mission whose body has vanished from the catalog
/// is dropped with no cargo and no report.
pub fn resolve_due_missions<R: Rng>(
    catalog: &Catalog,
    cfg: &MissionsCfg,
    state: &mut ColonyState,
    now: u64,
    rng: &mut R,
) -> SmallVec<[MissionReport; 2]> {
    let mut reports = SmallVec::new();
    let mut index = 0;
    while index < state.missions.len() {
        if state.missions[index].ends_at > now {
            index += 1;
            continue;
        }
        let mission = state.missions.remove(index);
        let Some(body) = catalog.body(&mission.body_id) else {
            continue;
        };
        let threat = (mission.hazard - hazard_reduction(catalog, state)).max(0.0);
        let struck = rng.r#gen::<f64>() < threat;
        let multiplier = if struck {
            cfg.hazard_cargo_factor
        } else {
            cargo_multiplier(catalog, state)
        };
        let mut cargo = BTreeMap::new();
        for (kind, base) in &body.cargo {
            let amount = (base * multiplier).floor();
            if amount > 0.0 {
                state.ledger.credit(*kind, amount);
                cargo.insert(*kind, amount);
            }
        }
        state.missions_completed += 1;
        reports.push(MissionReport {
            body_id: mission.body_id,
            struck,
            cargo,
        });
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use rand::rngs::mock::StepRng;

    fn ready_state() -> ColonyState {
        let mut state = ColonyState::default();
        state.first_launch_done = true;
        state
    }

    #[test]
    fn fuel_cost_floors_and_waives_first_launch() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let debris = catalog.body("debris").unwrap();
        let ice = catalog.body("ice").unwrap();
        assert_eq!(fuel_cost(&cfg, debris, false), 0);
        assert_eq!(fuel_cost(&cfg, debris, true), 10);
        assert_eq!(fuel_cost(&cfg, ice, true), 20);

        let short_hop: Body = serde_json::from_str(
            r#"{ "id": "moonlet", "name": "Moonlet", "travel": 9 }"#,
        )
        .unwrap();
        assert_eq!(fuel_cost(&cfg, &short_hop, true), 5, "3 floors up to 5");
    }

    #[test]
    fn slot_capacity_counts_gantries_and_nav_tech() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ColonyState::default();
        assert_eq!(slot_capacity(&catalog, &cfg, &state), 1);
        state.buildings.insert("gantry".to_string(), 2);
        state.tech.insert("nav_ai".to_string());
        assert_eq!(slot_capacity(&catalog, &cfg, &state), 4);
    }

    #[test]
    fn first_launch_is_free_and_schedules_by_travel() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ColonyState::default();
        let now = 10_000;

        start_mission(&catalog, &cfg, &mut state, "debris", now).unwrap();
        assert!((state.ledger.get(ResourceKind::Fuel) - 12.0).abs() < FLOAT_EPSILON);
        assert!(state.first_launch_done);
        assert_eq!(state.missions.len(), 1);
        assert_eq!(state.missions[0].ends_at, now + 30_000);
    }

    #[test]
    fn unaffordable_launch_leaves_ledger_unchanged() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ready_state();
        state.ledger.debit(ResourceKind::Fuel, 9.0);
        state.ledger.credit(ResourceKind::Signal, 500.0);

        let err = start_mission(&catalog, &cfg, &mut state, "ice", 0).unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientFuel {
                need: 20,
                have: 3.0
            }
        );
        assert!((state.ledger.get(ResourceKind::Fuel) - 3.0).abs() < FLOAT_EPSILON);
        assert!(state.missions.is_empty());
    }

    #[test]
    fn locked_and_unknown_targets_reject() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ColonyState::default();
        assert_eq!(
            start_mission(&catalog, &cfg, &mut state, "ice", 0).unwrap_err(),
            CommandError::TargetLocked {
                id: "ice".to_string()
            }
        );
        assert_eq!(
            start_mission(&catalog, &cfg, &mut state, "oort_nine", 0).unwrap_err(),
            CommandError::UnknownId {
                id: "oort_nine".to_string()
            }
        );
    }

    #[test]
    fn slot_bound_holds_at_launch() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ColonyState::default();
        start_mission(&catalog, &cfg, &mut state, "debris", 0).unwrap();
        let err = start_mission(&catalog, &cfg, &mut state, "debris", 0).unwrap_err();
        assert_eq!(err, CommandError::SlotsBusy { slots: 1 });
        assert_eq!(state.missions.len(), 1);
    }

    #[test]
    fn hazard_strike_cuts_cargo_to_penalty_share() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ready_state();
        state.missions.push(Mission {
            body_id: "asteroid".to_string(),
            ends_at: 100,
            hazard: 0.25,
        });

        // A zero draw always lands below a positive threat.
        let mut rng = StepRng::new(0, 0);
        let reports = resolve_due_missions(&catalog, &cfg, &mut state, 100, &mut rng);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].struck);
        assert!((reports[0].cargo[&ResourceKind::Metal] - 10.0).abs() < FLOAT_EPSILON);
        assert!(
            !reports[0].cargo.contains_key(&ResourceKind::Rare),
            "floor(1 * 0.4) rounds away"
        );
        assert!((state.ledger.get(ResourceKind::Metal) - 10.0).abs() < FLOAT_EPSILON);
        assert_eq!(state.missions_completed, 1);
    }

    #[test]
    fn clean_return_applies_drone_and_rare_bonuses() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ready_state();
        state.tech.insert("drone_cargo".to_string());
        state.tech.insert("rare_magnetics".to_string());
        state.missions.push(Mission {
            body_id: "asteroid".to_string(),
            ends_at: 100,
            hazard: 0.25,
        });

        let mut rng = StepRng::new(u64::MAX, 0);
        let reports = resolve_due_missions(&catalog, &cfg, &mut state, 100, &mut rng);
        assert!(!reports[0].struck);
        assert!((reports[0].cargo[&ResourceKind::Metal] - 35.0).abs() < FLOAT_EPSILON);
        assert!((reports[0].cargo[&ResourceKind::Rare] - 1.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn shielding_clamps_threat_to_zero() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ready_state();
        state.tech.insert("hazard_shielding".to_string());
        state.missions.push(Mission {
            body_id: "debris".to_string(),
            ends_at: 0,
            hazard: 0.05,
        });

        let mut rng = StepRng::new(0, 0);
        let reports = resolve_due_missions(&catalog, &cfg, &mut state, 0, &mut rng);
        assert!(!reports[0].struck, "threat clamps at zero, zero draw passes");
    }

    #[test]
    fn stale_bodies_drop_silently_and_pending_stay() {
        let catalog = Catalog::standard();
        let cfg = MissionsCfg::default_config();
        let mut state = ready_state();
        state.missions.push(Mission {
            body_id: "retired_site".to_string(),
            ends_at: 50,
            hazard: 0.1,
        });
        state.missions.push(Mission {
            body_id: "debris".to_string(),
            ends_at: 9_999,
            hazard: 0.05,
        });

        let mut rng = StepRng::new(u64::MAX, 0);
        let before = state.ledger.clone();
        let reports = resolve_due_missions(&catalog, &cfg, &mut state, 100, &mut rng);
        assert!(reports.is_empty());
        assert_eq!(state.ledger, before);
        assert_eq!(state.missions_completed, 0);
        assert_eq!(state.missions.len(), 1);
        assert_eq!(state.missions[0].body_id, "debris");
    }
}
