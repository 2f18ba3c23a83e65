//! Mutable colony state: the single owned value every command and tick
//! mutates. The whole tree is the persisted snapshot contract, so every
//! field carries a serde default and older snapshots merge onto a fresh
//! baseline instead of leaving holes.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::catalog::{CrewRole, ResourceKind};
use crate::constants::{
    LOG_CAP, RECRUIT_POOL_SIZE, SATISFACTION_MAX, SATISFACTION_MIN, START_FOOD, START_FUEL,
    START_HABITAT, START_WORKERS,
};
use crate::ledger::ResourceLedger;

/// Crew head-count, assignments, hire bonuses, and the satisfaction scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workers {
    #[serde(default = "default_worker_total")]
    pub total: u32,
    /// Per-role assignment; the unassigned remainder is idle.
    #[serde(default)]
    pub assigned: BTreeMap<CrewRole, u32>,
    /// Accumulated fractional hire bonuses per role. Grows only through
    /// hiring; never decays.
    #[serde(default)]
    pub bonus: BTreeMap<CrewRole, f64>,
    #[serde(default = "default_satisfaction")]
    pub satisfaction: f64,
}

impl Default for Workers {
    fn default() -> Self {
        Self {
            total: default_worker_total(),
            assigned: BTreeMap::new(),
            bonus: BTreeMap::new(),
            satisfaction: default_satisfaction(),
        }
    }
}

impl Workers {
    #[must_use]
    pub fn assigned_total(&self) -> u32 {
        self.assigned.values().sum()
    }

    #[must_use]
    pub fn assigned_for(&self, role: CrewRole) -> u32 {
        self.assigned.get(&role).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn bonus_for(&self, role: CrewRole) -> f64 {
        self.bonus.get(&role).copied().unwrap_or(0.0)
    }

    /// Restore invariants after a load: satisfaction inside its band,
    /// bonuses non-negative, assignments summing to at most `total`.
    pub fn clamp(&mut self) {
        self.satisfaction = self.satisfaction.clamp(SATISFACTION_MIN, SATISFACTION_MAX);
        for bonus in self.bonus.values_mut() {
            *bonus = bonus.max(0.0);
        }
        let mut excess = self.assigned_total().saturating_sub(self.total);
        if excess > 0 {
            for count in self.assigned.values_mut() {
                let shed = (*count).min(excess);
                *count -= shed;
                excess -= shed;
                if excess == 0 {
                    break;
                }
            }
        }
    }
}

/// An expedition in flight. Created by a successful launch, removed exactly
/// once by the resolution scan at or after `ends_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub body_id: String,
    /// Absolute wall-clock deadline in milliseconds.
    pub ends_at: u64,
    /// Hazard captured from the body at launch time.
    #[serde(default)]
    pub hazard: f64,
}

/// A hireable candidate in the rolling recruitment pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruitCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: CrewRole,
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default)]
    pub bonus: f64,
    #[serde(default)]
    pub cost: BTreeMap<ResourceKind, f64>,
}

fn default_tier() -> u8 {
    1
}

/// One narration line with its wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: u64,
    pub text: String,
}

/// Append-only ring buffer of narration entries, consumed read-only by the
/// presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventLog(VecDeque<LogEntry>);

impl EventLog {
    pub fn push(&mut self, at: u64, text: impl Into<String>) {
        if self.0.len() >= LOG_CAP {
            self.0.pop_front();
        }
        self.0.push_back(LogEntry {
            at,
            text: text.into(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.0.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.0.back()
    }

    pub(crate) fn truncate_to_cap(&mut self) {
        while self.0.len() > LOG_CAP {
            self.0.pop_front();
        }
    }
}

/// The full mutable state tree for one colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyState {
    /// User-visible seed the RNG streams derive from.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub tick_count: u64,
    /// Wall-clock time of the last completed tick, in milliseconds.
    #[serde(default)]
    pub last_tick_at: u64,
    /// The scheduler re-arms this after each tick body finishes.
    #[serde(default)]
    pub next_tick_due: u64,
    #[serde(default = "default_ledger")]
    pub ledger: ResourceLedger,
    /// Building id to owned level. Never decremented.
    #[serde(default)]
    pub buildings: BTreeMap<String, u32>,
    /// Owned technologies. Membership is permanent.
    #[serde(default)]
    pub tech: BTreeSet<String>,
    #[serde(default)]
    pub workers: Workers,
    #[serde(default)]
    pub missions: Vec<Mission>,
    /// Set once; the first launch ever is fuel-free.
    #[serde(default)]
    pub first_launch_done: bool,
    #[serde(default)]
    pub missions_completed: u32,
    /// UI-selected mission target, persisted for the presentation layer.
    #[serde(default)]
    pub selected_body: Option<String>,
    #[serde(default)]
    pub recruits: Vec<RecruitCandidate>,
    /// Absolute deadline after which the recruit pool may re-roll.
    #[serde(default)]
    pub recruit_ready_at: u64,
    #[serde(default = "default_next_recruit_id")]
    pub next_recruit_id: u32,
    /// Achieved milestone ids, stored as strings so stale saves with
    /// retired ids still load.
    #[serde(default)]
    pub milestones: BTreeSet<String>,
    #[serde(default)]
    pub log: EventLog,
}

impl Default for ColonyState {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_count: 0,
            last_tick_at: 0,
            next_tick_due: 0,
            ledger: default_ledger(),
            buildings: BTreeMap::new(),
            tech: BTreeSet::new(),
            workers: Workers::default(),
            missions: Vec::new(),
            first_launch_done: false,
            missions_completed: 0,
            selected_body: None,
            recruits: Vec::new(),
            recruit_ready_at: 0,
            next_recruit_id: default_next_recruit_id(),
            milestones: BTreeSet::new(),
            log: EventLog::default(),
        }
    }
}

impl ColonyState {
    /// Record the user seed on a fresh state.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn building_level(&self, id: &str) -> u32 {
        self.buildings.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn building_levels_total(&self) -> u32 {
        self.buildings.values().sum()
    }

    #[must_use]
    pub fn owns_tech(&self, id: &str) -> bool {
        self.tech.contains(id)
    }

    pub fn log_event(&mut self, at: u64, text: impl Into<String>) {
        self.log.push(at, text);
    }

    /// Restore invariants on a freshly deserialized snapshot. Loading
    /// merges field-by-field onto defaults; this pass re-clamps anything a
    /// hand-edited or stale snapshot may have bent.
    #[must_use]
    pub fn rehydrate(mut self) -> Self {
        self.ledger.clamp_non_negative();
        self.workers.clamp();
        self.recruits.truncate(RECRUIT_POOL_SIZE);
        self.log.truncate_to_cap();
        self
    }
}

fn default_ledger() -> ResourceLedger {
    let mut ledger = ResourceLedger::default();
    ledger.credit(ResourceKind::Fuel, START_FUEL);
    ledger.credit(ResourceKind::Food, START_FOOD);
    ledger.credit(ResourceKind::Habitat, START_HABITAT);
    ledger
}

fn default_worker_total() -> u32 {
    START_WORKERS
}

fn default_satisfaction() -> f64 {
    1.0
}

fn default_next_recruit_id() -> u32 {
    1
}
