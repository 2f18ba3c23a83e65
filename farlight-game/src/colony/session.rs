use crate::catalog::{Catalog, CrewRole};
use crate::colony::{ColonyCfg, ColonyController, CommandError, TickOutcome};
use crate::state::ColonyState;

/// High-level session wrapper binding a colony controller to a mutable
/// colony state. The persistence layer talks to this type: snapshots out,
/// snapshots in, commands and ticks in between.
#[derive(Debug, Clone)]
pub struct ColonySession {
    controller: ColonyController,
    state: ColonyState,
}

impl ColonySession {
    /// Construct a fresh session over the shipped catalog and config.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            controller: ColonyController::new(seed),
            state: ColonyState::default().with_seed(seed),
        }
    }

    /// Construct a fresh session with explicit catalog and configuration.
    ///
    /// # Panics
    /// Panics when the supplied configuration violates validation rules.
    #[must_use]
    pub fn with_parts(catalog: Catalog, cfg: ColonyCfg, seed: u64) -> Self {
        Self {
            controller: ColonyController::with_parts(catalog, cfg, seed),
            state: ColonyState::default().with_seed(seed),
        }
    }

    /// Build a session from an existing state. RNG streams restart from the
    /// state's recorded seed.
    #[must_use]
    pub fn from_state(state: ColonyState) -> Self {
        let controller = ColonyController::new(state.seed);
        Self { controller, state }
    }

    /// Build a session from an existing state over explicit catalog and
    /// configuration, for callers that source data outside the shipped
    /// assets.
    ///
    /// # Panics
    /// Panics when the supplied configuration violates validation rules.
    #[must_use]
    pub fn from_state_with_parts(catalog: Catalog, cfg: ColonyCfg, state: ColonyState) -> Self {
        let controller = ColonyController::with_parts(catalog, cfg, state.seed);
        Self { controller, state }
    }

    /// Rebuild a session from a persisted snapshot blob. A malformed blob
    /// falls back to a fresh default state rather than failing the load,
    /// and every loaded state is re-clamped before use.
    #[must_use]
    pub fn from_snapshot(blob: &str) -> Self {
        let state = serde_json::from_str::<ColonyState>(blob)
            .unwrap_or_default()
            .rehydrate();
        Self::from_state(state)
    }

    /// Serialize the entire mutable state tree.
    ///
    /// # Errors
    /// Returns the underlying serializer error, which for this state shape
    /// indicates a bug rather than bad data.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.state)
    }

    /// Run one tick at wall-clock `now`.
    pub fn tick(&mut self, now: u64) -> TickOutcome {
        self.controller.tick(&mut self.state, now)
    }

    /// Drive the tick scheduler from an external clock.
    pub fn advance(&mut self, now: u64) -> Option<TickOutcome> {
        self.controller.advance(&mut self.state, now)
    }

    /// Manual signal collection.
    pub fn collect_signal(&mut self) -> f64 {
        self.controller.collect_signal(&mut self.state)
    }

    /// Spend signal on a randomized scan reward.
    ///
    /// # Errors
    /// See [`ColonyController::pulse_scan`].
    pub fn pulse_scan(&mut self, now: u64) -> Result<String, CommandError> {
        self.controller.pulse_scan(&mut self.state, now)
    }

    /// Pick a mission target for the presentation layer.
    ///
    /// # Errors
    /// See [`ColonyController::set_target`].
    pub fn set_target(&mut self, body_id: &str) -> Result<(), CommandError> {
        self.controller.set_target(&mut self.state, body_id)
    }

    /// Construct one level of a building.
    ///
    /// # Errors
    /// See [`ColonyController::build`].
    pub fn build(&mut self, building_id: &str, now: u64) -> Result<String, CommandError> {
        self.controller.build(&mut self.state, building_id, now)
    }

    /// Research a technology.
    ///
    /// # Errors
    /// See [`ColonyController::buy_tech`].
    pub fn buy_tech(&mut self, tech_id: &str, now: u64) -> Result<String, CommandError> {
        self.controller.buy_tech(&mut self.state, tech_id, now)
    }

    /// Reassign crew between idle and a role.
    ///
    /// # Errors
    /// See [`ColonyController::change_crew`].
    pub fn change_crew(&mut self, role: CrewRole, delta: i32) -> Result<(), CommandError> {
        self.controller.change_crew(&mut self.state, role, delta)
    }

    /// Launch an expedition.
    ///
    /// # Errors
    /// See [`ColonyController::start_mission`].
    pub fn start_mission(&mut self, body_id: &str, now: u64) -> Result<String, CommandError> {
        self.controller.start_mission(&mut self.state, body_id, now)
    }

    /// Refresh the recruit pool.
    ///
    /// # Errors
    /// See [`ColonyController::roll_recruits`].
    pub fn roll_recruits(&mut self, now: u64, force: bool) -> Result<bool, CommandError> {
        self.controller.roll_recruits(&mut self.state, now, force)
    }

    /// Hire a candidate from the pool.
    ///
    /// # Errors
    /// See [`ColonyController::hire`].
    pub fn hire(&mut self, candidate_id: &str, now: u64) -> Result<String, CommandError> {
        self.controller.hire(&mut self.state, candidate_id, now)
    }

    /// Borrow the underlying immutable colony state.
    #[must_use]
    pub const fn state(&self) -> &ColonyState {
        &self.state
    }

    /// Borrow the underlying mutable colony state.
    pub const fn state_mut(&mut self) -> &mut ColonyState {
        &mut self.state
    }

    /// Apply a closure to the mutable colony state.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut ColonyState) -> R) -> R {
        f(&mut self.state)
    }

    /// Borrow the controller.
    #[must_use]
    pub const fn controller(&self) -> &ColonyController {
        &self.controller
    }

    /// Deterministically reseed the session.
    pub fn reseed(&mut self, seed: u64) {
        self.controller.reseed(seed);
        self.state.seed = seed;
    }

    /// Consume the session, returning the underlying colony state.
    #[must_use]
    pub fn into_state(self) -> ColonyState {
        self.state
    }
}
