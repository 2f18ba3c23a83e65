//! Static catalog of mission bodies, buildings, and technologies.
//!
//! Catalog entries are pure authored data: the player state stores only
//! counts, levels, and ownership flags keyed by entry id, never copies of
//! the entries themselves.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

/// Closed set of resource kinds tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Signal,
    Research,
    Metal,
    Organics,
    Fuel,
    Power,
    Food,
    Habitat,
    Morale,
    Rare,
}

impl ResourceKind {
    /// Kinds that participate in the per-tick rate vector. Habitat is a
    /// capacity stock credited directly, never a flow.
    pub const FLOW: &'static [Self] = &[
        Self::Signal,
        Self::Research,
        Self::Metal,
        Self::Organics,
        Self::Fuel,
        Self::Power,
        Self::Food,
        Self::Morale,
        Self::Rare,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Research => "research",
            Self::Metal => "metal",
            Self::Organics => "organics",
            Self::Fuel => "fuel",
            Self::Power => "power",
            Self::Food => "food",
            Self::Habitat => "habitat",
            Self::Morale => "morale",
            Self::Rare => "rare",
        }
    }

    /// Whether this kind flows through the per-tick rate vector.
    #[must_use]
    pub const fn is_flow(self) -> bool {
        !matches!(self, Self::Habitat)
    }

    /// Whether building output of this kind scales with crew and morale.
    /// Signal, power, and morale are flat baselines.
    #[must_use]
    pub const fn productivity_scaled(self) -> bool {
        !matches!(self, Self::Signal | Self::Power | Self::Morale | Self::Habitat)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signal" => Ok(Self::Signal),
            "research" => Ok(Self::Research),
            "metal" => Ok(Self::Metal),
            "organics" => Ok(Self::Organics),
            "fuel" => Ok(Self::Fuel),
            "power" => Ok(Self::Power),
            "food" => Ok(Self::Food),
            "habitat" => Ok(Self::Habitat),
            "morale" => Ok(Self::Morale),
            "rare" => Ok(Self::Rare),
            _ => Err(()),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(value: ResourceKind) -> Self {
        value.as_str().to_string()
    }
}

/// Crew roles buildings can link to for per-worker output bonuses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CrewRole {
    Miner,
    #[default]
    Engineer,
    Botanist,
    Scientist,
}

impl CrewRole {
    pub const ALL: &'static [Self] = &[Self::Miner, Self::Engineer, Self::Botanist, Self::Scientist];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miner => "miner",
            Self::Engineer => "engineer",
            Self::Botanist => "botanist",
            Self::Scientist => "scientist",
        }
    }
}

impl fmt::Display for CrewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrewRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miner" => Ok(Self::Miner),
            "engineer" => Ok(Self::Engineer),
            "botanist" => Ok(Self::Botanist),
            "scientist" => Ok(Self::Scientist),
            _ => Err(()),
        }
    }
}

impl From<CrewRole> for String {
    fn from(value: CrewRole) -> Self {
        value.as_str().to_string()
    }
}

/// A mission target: somewhere crews can be sent for cargo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: String,
    pub name: String,
    /// One-way travel figure; the mission timer runs `travel` seconds.
    pub travel: u32,
    /// Base chance of a hazardous return, before tech reductions.
    #[serde(default)]
    pub hazard: f64,
    /// Signal threshold gating visibility and launches.
    #[serde(default)]
    pub unlock: f64,
    #[serde(default)]
    pub requires: Vec<String>,
    /// Base cargo deposited per successful mission.
    #[serde(default)]
    pub cargo: BTreeMap<ResourceKind, f64>,
}

/// A constructible structure. Levels are unbounded; cost is flat per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    /// Grouping for presentation: "hub" or a biome tag.
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub unlock: f64,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub cost: BTreeMap<ResourceKind, f64>,
    /// Per-tick output per level, before multipliers.
    #[serde(default)]
    pub produces: BTreeMap<ResourceKind, f64>,
    /// Per-tick draw per level, never discounted by crew efficiency.
    #[serde(default)]
    pub consumes: BTreeMap<ResourceKind, f64>,
    /// Flat habitat capacity credited immediately on construction.
    #[serde(default)]
    pub habitat: f64,
    /// Mission slots granted per level.
    #[serde(default)]
    pub slots: u32,
    /// Linked crew role for the per-worker output bonus.
    #[serde(default)]
    pub role: CrewRole,
    #[serde(default = "default_role_bonus")]
    pub role_bonus: f64,
}

fn default_group() -> String {
    "hub".to_string()
}

fn default_role_bonus() -> f64 {
    0.05
}

/// A researchable technology. Owned flags are permanent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tech {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unlock: f64,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub cost: BTreeMap<ResourceKind, f64>,
    /// Flat passive rates added to every tick while owned.
    #[serde(default)]
    pub passive: BTreeMap<ResourceKind, f64>,
    /// Subtracted from body hazard at mission resolution.
    #[serde(default)]
    pub hazard_reduction: f64,
    /// Added to the successful-cargo multiplier.
    #[serde(default)]
    pub cargo_bonus: f64,
    #[serde(default)]
    pub rare_bonus: f64,
    /// Mission slots granted while owned.
    #[serde(default)]
    pub slots: u32,
    /// Narration logged once when the tech is first acquired.
    #[serde(default)]
    pub reveal: Option<String>,
}

/// Validation failures for authored catalog data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("duplicate catalog id: {id}")]
    DuplicateId { id: String },
    #[error("{entry} requires unknown tech {tech}")]
    UnknownTechRequirement { entry: String, tech: String },
    #[error("{id} hazard must be between 0 and 1 (got {value:.2})")]
    HazardRange { id: String, value: f64 },
    #[error("{id} travel must be at least 1")]
    ZeroTravel { id: String },
    #[error("{entry} rates non-flow kind {kind}")]
    NonFlowRate { entry: String, kind: ResourceKind },
}

/// Container for all authored catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub bodies: Vec<Body>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub techs: Vec<Tech>,
}

impl Catalog {
    /// Create an empty catalog (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into catalog data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The embedded standard catalog shipped with the engine.
    ///
    /// # Panics
    ///
    /// Panics if the embedded asset is malformed; that is a build defect,
    /// not a runtime condition.
    #[must_use]
    pub fn standard() -> &'static Self {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let catalog =
                Self::from_json(DEFAULT_CATALOG_DATA).expect("valid embedded catalog JSON");
            catalog.validate().expect("consistent embedded catalog");
            catalog
        })
    }

    #[must_use]
    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.iter().find(|body| body.id == id)
    }

    #[must_use]
    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|building| building.id == id)
    }

    #[must_use]
    pub fn tech(&self, id: &str) -> Option<&Tech> {
        self.techs.iter().find(|tech| tech.id == id)
    }

    /// Check authored data for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first `CatalogError` found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = std::collections::BTreeSet::new();
        for id in self
            .bodies
            .iter()
            .map(|b| &b.id)
            .chain(self.buildings.iter().map(|b| &b.id))
            .chain(self.techs.iter().map(|t| &t.id))
        {
            if !seen.insert(id.clone()) {
                return Err(CatalogError::DuplicateId { id: id.clone() });
            }
        }

        for body in &self.bodies {
            if body.travel == 0 {
                return Err(CatalogError::ZeroTravel {
                    id: body.id.clone(),
                });
            }
            if !(0.0..=1.0).contains(&body.hazard) {
                return Err(CatalogError::HazardRange {
                    id: body.id.clone(),
                    value: body.hazard,
                });
            }
            self.check_requirements(&body.id, &body.requires)?;
        }

        for building in &self.buildings {
            self.check_requirements(&building.id, &building.requires)?;
            check_flow_rates(&building.id, &building.produces)?;
            check_flow_rates(&building.id, &building.consumes)?;
        }

        for tech in &self.techs {
            self.check_requirements(&tech.id, &tech.requires)?;
            check_flow_rates(&tech.id, &tech.passive)?;
        }

        Ok(())
    }

    fn check_requirements(&self, entry: &str, requires: &[String]) -> Result<(), CatalogError> {
        for tech in requires {
            if self.tech(tech).is_none() {
                return Err(CatalogError::UnknownTechRequirement {
                    entry: entry.to_string(),
                    tech: tech.clone(),
                });
            }
        }
        Ok(())
    }
}

fn check_flow_rates(
    entry: &str,
    rates: &BTreeMap<ResourceKind, f64>,
) -> Result<(), CatalogError> {
    for kind in rates.keys() {
        if !kind.is_flow() {
            return Err(CatalogError::NonFlowRate {
                entry: entry.to_string(),
                kind: *kind,
            });
        }
    }
    Ok(())
}
