use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::Result;
use crate::parser::{
    load_exclusions, load_requirements, load_skips, load_slot_rows, load_unavailable, resolve_exclusions,
    resolve_unavailable,
};
use crate::platoon::demand::{prepare_phase, PlanMode};
use crate::platoon::engine::{AssignmentEngine, AssignmentResult};
use crate::platoon::event::EventType;
use crate::platoon::readiness::{guild_readiness, GuildReadiness, ReadinessRow};
use crate::platoon::types::{PlatoonKey, SlotRow, Territory};
use crate::roster::provider::{fetch_snapshot, CsvDirProvider, JsonProvider, RosterProvider};
use crate::roster::types::{ExclusionMap, Snapshot, UnavailableSet};

/// Everything one run reads, captured before any computation starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInputs {
    pub snapshot: Snapshot,
    #[serde(default)]
    pub exclusions: ExclusionMap,
    #[serde(default)]
    pub unavailable: UnavailableSet,
    #[serde(default)]
    pub skips: BTreeSet<PlatoonKey>,
    #[serde(default)]
    pub default_slice: Vec<SlotRow>,
    #[serde(default)]
    pub current_grid: Vec<SlotRow>,
    #[serde(default)]
    pub requirements: Vec<ReadinessRow>,
}

fn optional<T: Default>(path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    if !path.exists() {
        warn!("{} not found, treating as empty", path.display());
        return Ok(T::default());
    }
    load(path)
}

impl PhaseInputs {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        PhaseInputs {
            snapshot,
            exclusions: Default::default(),
            unavailable: Default::default(),
            skips: Default::default(),
            default_slice: Vec::new(),
            current_grid: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Reads a grid directory. The roster comes from `snapshot.json` when
    /// present, otherwise from the CSV files; the rest of the grid files are
    /// optional and default to empty.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let json = JsonProvider::new(dir.join("snapshot.json"));
        let csv = CsvDirProvider::new(dir);
        let providers: Vec<&dyn RosterProvider> = if dir.join("snapshot.json").exists() {
            vec![&json as &dyn RosterProvider, &csv]
        } else {
            vec![&csv as &dyn RosterProvider]
        };
        let snapshot = fetch_snapshot(&providers)?;
        let exclusions = optional(&dir.join("exclusions.csv"), |p| load_exclusions(p))?;
        let unavailable = optional(&dir.join("unavailable.csv"), |p| load_unavailable(p))?;

        Ok(PhaseInputs {
            exclusions: resolve_exclusions(exclusions, &snapshot.members),
            unavailable: resolve_unavailable(unavailable, &snapshot.members),
            snapshot,
            skips: optional(&dir.join("skips.csv"), |p| load_skips(p))?,
            default_slice: optional(&dir.join("slice.csv"), |p| load_slot_rows(p))?,
            current_grid: optional(&dir.join("platoons.csv"), |p| load_slot_rows(p))?,
            requirements: optional(&dir.join("requirements.csv"), |p| load_requirements(p))?,
        })
    }
}

/// Result of planning one phase, with donors written onto the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasePlan {
    pub event: EventType,
    pub phase: u8,
    pub mode: PlanMode,
    pub territories: Vec<Territory>,
    pub result: AssignmentResult,
}

/// Prepares the phase grid for `mode` and runs the assignment engine.
///
/// Fails only when the configuration cannot name an event and phase.
pub fn plan_phase(
    inputs: &PhaseInputs,
    config: &PlannerConfig,
    mode: PlanMode,
    now: DateTime<Utc>,
) -> Result<PhasePlan> {
    let event = config.event_type()?;
    let phase = config.resolve_phase(event, now)?;
    if inputs.snapshot.is_stale(now, config.cache_ttl()) {
        warn!(
            "Roster snapshot from {} is older than {} hours",
            inputs.snapshot.fetched_at, config.cache_ttl_hours
        );
    }
    info!("Planning {} phase {} ({:?})", event, phase, mode);

    let mut territories = prepare_phase(event, phase, mode, &inputs.default_slice, &inputs.current_grid);
    let engine = AssignmentEngine {
        snapshot: &inputs.snapshot,
        exclusions: &inputs.exclusions,
        unavailable: &inputs.unavailable,
        event,
        phase,
        settings: config.settings(),
        rarity_override: config.rarity_override(),
    };
    let result = engine.run(&territories, &inputs.skips);
    result.apply_to(&mut territories);

    Ok(PhasePlan {
        event,
        phase,
        mode,
        territories,
        result,
    })
}

pub fn readiness(inputs: &PhaseInputs) -> GuildReadiness {
    guild_readiness(&inputs.snapshot, &inputs.requirements)
}
