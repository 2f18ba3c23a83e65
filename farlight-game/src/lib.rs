//! Farlight Game Engine
//!
//! Platform-agnostic core game logic for the Farlight incremental colony game.
//! This crate provides all simulation mechanics without UI or platform-specific
//! dependencies.

pub mod catalog;
pub mod colony;
pub mod constants;
pub mod crew;
pub mod gates;
pub mod ledger;
pub mod milestones;
pub mod missions;
pub mod production;
pub mod recruits;
pub mod state;

// Re-export commonly used types
pub use catalog::{Body, Building, Catalog, CatalogError, CrewRole, ResourceKind, Tech};
pub use colony::{
    ColonyCfg, ColonyConfigError, ColonyController, ColonySession, CommandError, MissionsCfg,
    RecruitsCfg, RngBundle, ScanCfg, TickOutcome, TickTag, TickTagSet, UpkeepCfg,
};
pub use crew::{change_crew, idle_workers, morale_multiplier, role_multiplier};
pub use gates::{unlocked_bodies, unlocked_buildings, unlocked_techs};
pub use ledger::{RateVector, ResourceLedger};
pub use milestones::MilestoneId;
pub use missions::{MissionReport, fuel_cost, slot_capacity};
pub use production::{ProductionOutcome, apply_production};
pub use state::{ColonyState, EventLog, LogEntry, Mission, RecruitCandidate, Workers};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the content catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save colony state
    ///
    /// # Errors
    ///
    /// Returns an error if the colony state cannot be saved.
    fn save_game(&self, save_name: &str, state: &ColonyState) -> Result<(), Self::Error>;

    /// Load colony state
    ///
    /// # Errors
    ///
    /// Returns an error if the colony state cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<ColonyState>, Self::Error>;

    /// Delete saved colony
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for managing colony instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Create a new colony with the specified seed
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_game(&self, seed: u64) -> Result<ColonyState, L::Error> {
        self.create_session(seed).map(ColonySession::into_state)
    }

    /// Construct a new colony session encompassing controller and state.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_session(&self, seed: u64) -> Result<ColonySession, L::Error> {
        let catalog = self.data_loader.load_catalog()?;
        let cfg = ColonyCfg::standard().clone();
        Ok(ColonySession::with_parts(catalog, cfg, seed))
    }

    /// Save a colony state
    ///
    /// # Errors
    ///
    /// Returns an error if the colony state cannot be saved.
    pub fn save_game(&self, save_name: &str, state: &ColonyState) -> Result<(), S::Error> {
        self.storage.save_game(save_name, state)
    }

    /// Load a colony state
    ///
    /// # Errors
    ///
    /// Returns an error if the colony state cannot be loaded, or if the
    /// current catalog fails validation on resume.
    pub fn load_game(&self, save_name: &str) -> Result<Option<ColonyState>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        if let Some(state) = self.storage.load_game(save_name).map_err(Into::into)? {
            // Confirm the shipped data still holds up before resuming a
            // save against it, then re-clamp whatever was persisted.
            self.data_loader.load_catalog().map_err(Into::into)?.validate()?;
            Ok(Some(state.rehydrate()))
        } else {
            Ok(None)
        }
    }

    /// Resume a saved colony as a live session.
    ///
    /// # Errors
    ///
    /// Returns an error if the colony state or catalog cannot be loaded.
    pub fn load_session(&self, save_name: &str) -> Result<Option<ColonySession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(state) = self.load_game(save_name)? else {
            return Ok(None);
        };
        let catalog = self.data_loader.load_catalog().map_err(Into::into)?;
        let cfg = ColonyCfg::standard().clone();
        Ok(Some(ColonySession::from_state_with_parts(catalog, cfg, state)))
    }
}
