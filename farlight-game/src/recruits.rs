//! Recruitment pool: cooldown-gated rolls of fresh candidates and the hire
//! path that folds a candidate's bonus into the crew permanently.
use rand::Rng;
use std::collections::BTreeMap;

use crate::catalog::{CrewRole, ResourceKind};
use crate::colony::{CommandError, RecruitsCfg};
use crate::state::{ColonyState, RecruitCandidate};

const RECRUIT_NAMES: &[&str] = &[
    "Joss Imara",
    "Rin Okafor",
    "Sela Voss",
    "Marek Thorn",
    "Ada Lune",
    "Teo Castellan",
    "Yuki Andress",
    "Pax Meridian",
    "Iris Kovalenko",
    "Dmitri Sol",
    "Nia Ferrand",
    "Orin Vega",
    "Lupe Arcturus",
    "Ember Halloway",
    "Casta Nym",
    "Jun Palewater",
];

/// Weighted random selection from a list of options.
pub fn weighted_pick<T, R>(options: &[(T, u32)], rng: &mut R) -> Option<T>
where
    R: Rng,
    T: Clone,
{
    let total_weight: u32 = options.iter().map(|(_, weight)| *weight).sum();
    if total_weight == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total_weight);
    let mut current_weight = 0;

    let mut selected = None;
    for (item, weight) in options {
        if selected.is_none() {
            current_weight += weight;
            if roll < current_weight {
                selected = Some(item.clone());
            }
        }
    }

    selected.or_else(|| options.first().map(|(item, _)| item.clone()))
}

/// Refresh the candidate pool. A non-forced call inside the cooldown is a
/// quiet no-op while candidates remain; once the pool has been emptied by
/// hiring, a non-forced call tops it up regardless of the clock. A forced
/// re-roll inside the cooldown is refused with a notice instead.
///
/// Returns whether a fresh pool was generated.
///
/// # Errors
/// Returns an error for a forced re-roll before the cooldown elapses.
pub fn roll_recruits<R: Rng>(
    cfg: &RecruitsCfg,
    state: &mut ColonyState,
    now: u64,
    force: bool,
    rng: &mut R,
) -> Result<bool, CommandError> {
    if now < state.recruit_ready_at {
        if force {
            return Err(CommandError::CooldownActive {
                remaining_ms: state.recruit_ready_at - now,
            });
        }
        if !state.recruits.is_empty() {
            return Ok(false);
        }
    }

    state.recruits.clear();
    for _ in 0..cfg.pool_size {
        let candidate = generate_candidate(cfg, &mut state.next_recruit_id, rng);
        state.recruits.push(candidate);
    }
    state.recruit_ready_at = now + cfg.cooldown_ms;
    Ok(true)
}

fn generate_candidate<R: Rng>(
    cfg: &RecruitsCfg,
    next_id: &mut u32,
    rng: &mut R,
) -> RecruitCandidate {
    let role = CrewRole::ALL[rng.gen_range(0..CrewRole::ALL.len())];
    let name = RECRUIT_NAMES[rng.gen_range(0..RECRUIT_NAMES.len())];
    let tier_options = [
        (1u8, cfg.tier_weights[0]),
        (2, cfg.tier_weights[1]),
        (3, cfg.tier_weights[2]),
    ];
    let tier = weighted_pick(&tier_options, rng).unwrap_or(1);
    let bonus = cfg.tier_bonus[usize::from(tier - 1)];

    let mut cost = BTreeMap::new();
    cost.insert(ResourceKind::Food, cfg.food_cost_per_tier * f64::from(tier));
    cost.insert(
        ResourceKind::Metal,
        cfg.metal_cost_per_tier * f64::from(tier),
    );

    let id = format!("recruit-{}", *next_id);
    *next_id = next_id.wrapping_add(1);
    RecruitCandidate {
        id,
        name: name.to_string(),
        role,
        tier,
        bonus,
        cost,
    }
}

/// Hire a candidate out of the pool: pay the cost, grow the head-count,
/// assign them to their role, and bank their bonus for good.
///
/// # Errors
/// Rejects when the candidate id is unknown, housing is full, or the cost
/// cannot be paid. Rejection leaves the pool and ledger untouched.
pub fn hire(state: &mut ColonyState, candidate_id: &str) -> Result<String, CommandError> {
    let Some(index) = state
        .recruits
        .iter()
        .position(|candidate| candidate.id == candidate_id)
    else {
        return Err(CommandError::UnknownId {
            id: candidate_id.to_string(),
        });
    };
    if state.ledger.get(ResourceKind::Habitat) <= f64::from(state.workers.total) {
        return Err(CommandError::NoHousing);
    }
    if !state.ledger.can_afford(&state.recruits[index].cost) {
        return Err(CommandError::CannotAfford {
            what: state.recruits[index].name.clone(),
        });
    }

    let candidate = state.recruits.remove(index);
    state.ledger.pay(&candidate.cost);
    state.workers.total += 1;
    *state.workers.assigned.entry(candidate.role).or_insert(0) += 1;
    *state.workers.bonus.entry(candidate.role).or_insert(0.0) += candidate.bonus;
    Ok(format!("{} signs on as a {}.", candidate.name, candidate.role))
}
