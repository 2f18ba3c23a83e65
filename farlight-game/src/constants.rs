//! Centralized balance and tuning constants for the Farlight engine.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control; the authored catalog JSON
//! carries entry data, never engine math.

// Tick cadence -------------------------------------------------------------
pub(crate) const TICK_MS: u64 = 500;

// Event log ----------------------------------------------------------------
pub(crate) const LOG_CAP: usize = 80;

// Manual actions -----------------------------------------------------------
pub(crate) const COLLECT_SIGNAL_GAIN: f64 = 1.0;
pub(crate) const PULSE_SCAN_COST: f64 = 25.0;
pub(crate) const PULSE_SCAN_REWARD_MIN: f64 = 5.0;
pub(crate) const PULSE_SCAN_REWARD_MAX: f64 = 20.0;
pub(crate) const PULSE_SCAN_RARE_DIVISOR: f64 = 5.0;
pub(crate) const PULSE_SCAN_RESEARCH_WEIGHT: u32 = 3;
pub(crate) const PULSE_SCAN_METAL_WEIGHT: u32 = 2;
pub(crate) const PULSE_SCAN_RARE_WEIGHT: u32 = 1;

// Crew & morale ------------------------------------------------------------
pub(crate) const SATISFACTION_MIN: f64 = 0.4;
pub(crate) const SATISFACTION_MAX: f64 = 1.2;
pub(crate) const MORALE_MULTIPLIER_MIN: f64 = 0.6;
pub(crate) const MORALE_MULTIPLIER_MAX: f64 = 1.4;
pub(crate) const FOOD_SHORT_FACTOR: f64 = 0.6;
pub(crate) const POWER_SHORT_FACTOR: f64 = 0.8;
pub(crate) const FOOD_OK_NEED_RATIO: f64 = 0.5;
pub(crate) const FOOD_UPKEEP_PER_WORKER: f64 = 0.05;

// Missions -----------------------------------------------------------------
pub(crate) const FUEL_COST_FLOOR: u32 = 5;
pub(crate) const FUEL_COST_DIVISOR: u32 = 3;
pub(crate) const HAZARD_CARGO_FACTOR: f64 = 0.4;
pub(crate) const BASE_MISSION_SLOTS: u32 = 1;
pub(crate) const TRAVEL_MS_PER_UNIT: u64 = 1_000;

// Recruitment --------------------------------------------------------------
pub(crate) const RECRUIT_COOLDOWN_MS: u64 = 45_000;
pub(crate) const RECRUIT_POOL_SIZE: usize = 3;
pub(crate) const RECRUIT_TIER_BONUS: [f64; 3] = [0.05, 0.12, 0.20];
pub(crate) const RECRUIT_TIER_WEIGHTS: [u32; 3] = [60, 30, 10];
pub(crate) const RECRUIT_FOOD_COST_PER_TIER: f64 = 12.0;
pub(crate) const RECRUIT_METAL_COST_PER_TIER: f64 = 8.0;

// Starting stocks ----------------------------------------------------------
pub(crate) const START_FUEL: f64 = 12.0;
pub(crate) const START_FOOD: f64 = 30.0;
pub(crate) const START_HABITAT: f64 = 4.0;
pub(crate) const START_WORKERS: u32 = 3;

// Milestone thresholds -----------------------------------------------------
pub(crate) const MILESTONE_FIRST_RESEARCH_SIGNAL: f64 = 300.0;
pub(crate) const MILESTONE_FIRST_RESEARCH_GRANT: f64 = 20.0;
pub(crate) const MILESTONE_POWER_GRID_POWER: f64 = 100.0;
pub(crate) const MILESTONE_POWER_GRID_GRANT: f64 = 25.0;
pub(crate) const MILESTONE_FIRST_HAUL_GRANT: f64 = 10.0;
pub(crate) const MILESTONE_GROWING_CREW_TOTAL: u32 = 5;
pub(crate) const MILESTONE_RARE_CACHE_RARE: f64 = 10.0;
pub(crate) const MILESTONE_FOOTPRINT_LEVELS: u32 = 10;
pub(crate) const MILESTONE_FOOTPRINT_GRANT: f64 = 4.0;
pub(crate) const MILESTONE_BEACON_SIGNAL: f64 = 1_500.0;
pub(crate) const MILESTONE_BEACON_GRANT: f64 = 10.0;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
