//! Crew assignment and the morale factors feeding production.
use crate::catalog::{Building, CrewRole};
use crate::colony::CommandError;
use crate::constants::{MORALE_MULTIPLIER_MAX, MORALE_MULTIPLIER_MIN};
use crate::state::ColonyState;

/// Crew efficiency factor for one building: 1.0 plus the linked role's
/// assigned head-count scaled by the building's per-worker bonus, plus that
/// role's accumulated hire bonus.
#[must_use]
pub fn role_multiplier(state: &ColonyState, building: &Building) -> f64 {
    1.0 + f64::from(state.workers.assigned_for(building.role)) * building.role_bonus
        + state.workers.bonus_for(building.role)
}

/// Colony-wide morale factor. Satisfaction can sink below the multiplier
/// floor; the clamp keeps even a starving colony at 60% output.
#[must_use]
pub fn morale_multiplier(state: &ColonyState) -> f64 {
    state
        .workers
        .satisfaction
        .clamp(MORALE_MULTIPLIER_MIN, MORALE_MULTIPLIER_MAX)
}

#[must_use]
pub fn idle_workers(state: &ColonyState) -> u32 {
    state
        .workers
        .total
        .saturating_sub(state.workers.assigned_total())
}

/// Reassign crew in place. Positive `delta` moves idle workers into the
/// role, negative moves them back to idle; the head-count never changes
/// here. Rejection leaves the assignment map untouched.
///
/// # Errors
/// Returns an error when the role would drop below zero or the colony has
/// no idle workers left to assign.
pub fn change_crew(
    state: &mut ColonyState,
    role: CrewRole,
    delta: i32,
) -> Result<(), CommandError> {
    let current = state.workers.assigned_for(role);
    let next = i64::from(current) + i64::from(delta);
    if next < 0 {
        return Err(CommandError::CrewUnderflow { role });
    }
    let others = i64::from(state.workers.assigned_total()) - i64::from(current);
    if others + next > i64::from(state.workers.total) {
        return Err(CommandError::CrewOverflow {
            total: state.workers.total,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let next = next as u32;
    if next == 0 {
        state.workers.assigned.remove(&role);
    } else {
        state.workers.assigned.insert(role, next);
    }
    Ok(())
}
