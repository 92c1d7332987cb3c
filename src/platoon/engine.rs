//! Greedy donor assignment for one Territory Battle phase.
//!
//! A run walks every slot once in a fixed order and never backtracks:
//!
//! 1. territories in index order, platoons from 5 down to 0, slots 0..15;
//! 2. feasibility: each non-empty slot counts toward unit demand, and a slot
//!    with no eligible donor makes its platoon impossible;
//! 3. officer skip markers force a platoon impossible;
//! 4. each slot of a possible platoon takes the weakest eligible donor who has
//!    not given this unit yet and is still under the territory cap;
//! 5. slots of impossible platoons get the `Skip` sentinel;
//! 6. every slot is highlighted from demand vs. eligible supply.
//!
//! Later platoons are usually filled last by officers, so resolving them first
//! keeps them from running out of donors.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::roster::types::{ExclusionMap, MemberId, Snapshot, UnavailableSet, UnitId};
use super::eligibility::{EligibilityFilter, EligibilityRecord};
use super::event::{EventType, RarityRule};
use super::types::{PlatoonKey, Slot, SlotKey, Territory, TerritoryKind};

pub const DEFAULT_MAX_DONATIONS_PER_TERRITORY: u32 = 10;
pub const DEFAULT_RARE_MARGIN: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    pub max_donations_per_territory: u32,
    /// Slots whose unit has fewer than `demand + rare_margin` donors are rare
    pub rare_margin: u32,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        AssignmentSettings {
            max_donations_per_territory: DEFAULT_MAX_DONATIONS_PER_TERRITORY,
            rare_margin: DEFAULT_RARE_MARGIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "member")]
pub enum Donor {
    Member(MemberId),
    /// Feasible platoon, but every candidate was used up or capped
    Unassigned,
    /// The platoon will not be filled this phase
    Skip,
}

impl Donor {
    pub fn member(&self) -> Option<&str> {
        match self {
            Donor::Member(id) => Some(id),
            _ => None,
        }
    }
}

/// Severity shown on a slot in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Normal,
    Rare,
    Missing,
}

impl Highlight {
    pub fn classify(demand: u32, eligible: usize, rare_margin: u32) -> Self {
        let eligible = eligible as u64;
        if u64::from(demand) > eligible {
            Highlight::Missing
        } else if u64::from(demand) + u64::from(rare_margin) > eligible {
            Highlight::Rare
        } else {
            Highlight::Normal
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Highlight::Normal => "black",
            Highlight::Rare => "blue",
            Highlight::Missing => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOutcome {
    pub key: SlotKey,
    pub unit_id: Option<UnitId>,
    pub donor: Donor,
    pub highlight: Highlight,
    /// Size of the eligible pool for this slot's unit
    pub eligible: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatoonOutcome {
    pub key: PlatoonKey,
    pub possible: bool,
    pub manual_skip: bool,
    /// Units in this platoon nobody can donate
    pub insufficient: Vec<UnitId>,
    pub value: u64,
}

/// Everything one run produces. Slots and platoons are in iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub slots: Vec<SlotOutcome>,
    pub platoons: Vec<PlatoonOutcome>,
    pub demand: BTreeMap<UnitId, u32>,
    pub placements: BTreeMap<u8, BTreeMap<MemberId, u32>>,
}

impl AssignmentResult {
    pub fn slot(&self, key: SlotKey) -> Option<&SlotOutcome> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn platoon(&self, key: PlatoonKey) -> Option<&PlatoonOutcome> {
        self.platoons.iter().find(|p| p.key == key)
    }

    pub fn assigned(&self) -> impl Iterator<Item = (&SlotOutcome, &str)> {
        self.slots
            .iter()
            .filter_map(|s| s.donor.member().map(|m| (s, m)))
    }

    pub fn unassigned_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.unit_id.is_some() && s.donor == Donor::Unassigned)
            .count()
    }

    pub fn skipped_platoons(&self) -> impl Iterator<Item = &PlatoonOutcome> {
        self.platoons.iter().filter(|p| !p.possible)
    }

    /// Units demanded by more slots than there are eligible donors
    pub fn missing_units(&self) -> BTreeSet<&str> {
        self.slots
            .iter()
            .filter(|s| s.highlight == Highlight::Missing)
            .filter_map(|s| s.unit_id.as_deref())
            .collect()
    }

    /// Copies chosen donors back onto the slot grid.
    pub fn apply_to(&self, territories: &mut [Territory]) {
        for outcome in &self.slots {
            let key = outcome.key;
            if let Some(slot) = territories
                .get_mut(key.territory as usize)
                .and_then(|t| t.slot_mut(key.platoon, key.slot))
            {
                slot.assigned = outcome.donor.member().map(str::to_string);
            }
        }
    }
}

/// Slots of live territories in engine order: territories ascending,
/// platoons descending, slots ascending.
pub fn ordered_slots(territories: &[Territory]) -> Vec<(SlotKey, TerritoryKind, &Slot)> {
    let mut ordered = Vec::new();
    for territory in territories.iter().filter(|t| t.is_live()) {
        for platoon in territory.platoons.iter().rev() {
            for (idx, slot) in platoon.slots.iter().enumerate() {
                let key = SlotKey {
                    territory: territory.index,
                    platoon: platoon.index,
                    slot: idx as u8,
                };
                ordered.push((key, territory.kind, slot));
            }
        }
    }
    ordered
}

pub struct AssignmentEngine<'a> {
    pub snapshot: &'a Snapshot,
    pub exclusions: &'a ExclusionMap,
    pub unavailable: &'a UnavailableSet,
    pub event: EventType,
    pub phase: u8,
    pub settings: AssignmentSettings,
    /// Replaces the event's rarity rule for every territory when set
    pub rarity_override: Option<RarityRule>,
}

impl<'a> AssignmentEngine<'a> {
    fn filter_for(&self, kind: TerritoryKind) -> EligibilityFilter<'a> {
        EligibilityFilter {
            exclusions: self.exclusions,
            unavailable: self.unavailable,
            required_tag: Some(self.event.required_tag()),
            rule: self
                .rarity_override
                .unwrap_or_else(|| self.event.rarity_rule(kind)),
            phase: self.phase,
        }
    }

    /// Runs one full assignment pass. All counters live only for this call.
    pub fn run(&self, territories: &[Territory], skips: &BTreeSet<PlatoonKey>) -> AssignmentResult {
        let order = ordered_slots(territories);

        // Eligible pools, computed once per (territory kind, unit)
        let mut pools: BTreeMap<(TerritoryKind, UnitId), Vec<EligibilityRecord>> = BTreeMap::new();
        let mut demand: BTreeMap<UnitId, u32> = BTreeMap::new();
        let mut platoons: Vec<PlatoonOutcome> = Vec::new();

        for (key, kind, slot) in &order {
            let pkey = key.platoon_key();
            if platoons.last().map(|p| p.key) != Some(pkey) {
                let value = territories
                    .get(key.territory as usize)
                    .and_then(|t| t.platoons.get(key.platoon as usize))
                    .map_or(0, |p| p.value);
                platoons.push(PlatoonOutcome {
                    key: pkey,
                    possible: true,
                    manual_skip: false,
                    insufficient: Vec::new(),
                    value,
                });
            }
            let Some(unit_id) = slot.required_unit.as_deref() else {
                continue;
            };
            *demand.entry(unit_id.to_string()).or_insert(0) += 1;

            let pool = pools
                .entry((*kind, unit_id.to_string()))
                .or_insert_with(|| self.filter_for(*kind).donors(unit_id, self.snapshot));
            if pool.is_empty() {
                if let Some(platoon) = platoons.last_mut() {
                    platoon.possible = false;
                    if !platoon.insufficient.iter().any(|u| u == unit_id) {
                        platoon.insufficient.push(unit_id.to_string());
                    }
                }
            }
        }

        for platoon in &mut platoons {
            if skips.contains(&platoon.key) {
                platoon.manual_skip = true;
                platoon.possible = false;
            }
            if !platoon.possible {
                debug!(
                    "Platoon {}/{} skipped (manual: {}, insufficient: {:?})",
                    platoon.key.territory, platoon.key.platoon, platoon.manual_skip, platoon.insufficient
                );
            }
        }
        let possible: BTreeMap<PlatoonKey, bool> =
            platoons.iter().map(|p| (p.key, p.possible)).collect();

        let mut used: BTreeSet<(UnitId, MemberId)> = BTreeSet::new();
        let mut placements: BTreeMap<u8, BTreeMap<MemberId, u32>> = BTreeMap::new();
        let mut slots = Vec::with_capacity(order.len());

        for (key, kind, slot) in &order {
            let Some(unit_id) = slot.required_unit.as_deref() else {
                slots.push(SlotOutcome {
                    key: *key,
                    unit_id: None,
                    donor: Donor::Unassigned,
                    highlight: Highlight::Normal,
                    eligible: 0,
                });
                continue;
            };
            let pool = pools
                .get(&(*kind, unit_id.to_string()))
                .map(Vec::as_slice)
                .unwrap_or_default();

            let donor = if !possible.get(&key.platoon_key()).copied().unwrap_or(false) {
                Donor::Skip
            } else {
                let territory_counts = placements.entry(key.territory).or_default();
                let pick = pool.iter().find(|candidate| {
                    !used.contains(&(unit_id.to_string(), candidate.member_id.clone()))
                        && territory_counts
                            .get(&candidate.member_id)
                            .copied()
                            .unwrap_or(0)
                            < self.settings.max_donations_per_territory
                });
                match pick {
                    Some(candidate) => {
                        used.insert((unit_id.to_string(), candidate.member_id.clone()));
                        *territory_counts.entry(candidate.member_id.clone()).or_insert(0) += 1;
                        Donor::Member(candidate.member_id.clone())
                    }
                    None => Donor::Unassigned,
                }
            };

            let unit_demand = demand.get(unit_id).copied().unwrap_or(0);
            slots.push(SlotOutcome {
                key: *key,
                unit_id: Some(unit_id.to_string()),
                donor,
                highlight: Highlight::classify(unit_demand, pool.len(), self.settings.rare_margin),
                eligible: pool.len(),
            });
        }
        placements.retain(|_, counts| !counts.is_empty());

        let result = AssignmentResult {
            slots,
            platoons,
            demand,
            placements,
        };
        info!(
            "{} phase {}: {} donors assigned, {} slots unassigned, {} platoons skipped",
            self.event,
            self.phase,
            result.assigned().count(),
            result.unassigned_count(),
            result.skipped_platoons().count()
        );
        result
    }
}
