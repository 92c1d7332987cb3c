//! Guild readiness against the event's required units.
//!
//! Rows come ordered by phase, then squad. A member earns credit for a row
//! when their copy meets the rarity, gear and level bar. Credit is counted
//! per squad run and summed per phase; only the first [`SQUAD_SIZE`] met
//! units of a run reach the phase total.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::roster::types::{Member, MemberId, Snapshot, UnitId, UnitInstance};

pub const SQUAD_SIZE: u32 = 5;

/// Marker text used in the requirements grid to close a phase
pub const PHASE_COUNT_MARKER: &str = "Phase Count";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub phase: u8,
    pub squad: String,
    pub unit_id: UnitId,
    pub min_rarity: u8,
    pub min_gear: u32,
    pub min_level: u32,
    #[serde(default)]
    pub mandatory: bool,
}

impl Requirement {
    pub fn is_met_by(&self, owned: Option<&UnitInstance>) -> bool {
        owned.is_some_and(|u| {
            u.rarity >= self.min_rarity && u.gear_level >= self.min_gear && u.level >= self.min_level
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "row")]
pub enum ReadinessRow {
    Unit(Requirement),
    /// Closes the running phase; a blank phase takes the phase of the rows
    /// above it
    PhaseCount {
        #[serde(default)]
        phase: Option<u8>,
    },
}

/// What a member's cell shows for one required unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessCell {
    Met { rarity: u8 },
    Short { rarity: u8, level: u32, gear: u32 },
    NotOwned,
}

impl ReadinessCell {
    pub fn evaluate(requirement: &Requirement, owned: Option<&UnitInstance>) -> Self {
        match owned {
            None => ReadinessCell::NotOwned,
            Some(u) if requirement.is_met_by(Some(u)) => ReadinessCell::Met { rarity: u.rarity },
            Some(u) => ReadinessCell::Short {
                rarity: u.rarity,
                level: u.level,
                gear: u.gear_level,
            },
        }
    }

    pub const fn is_met(&self) -> bool {
        matches!(self, ReadinessCell::Met { .. })
    }
}

impl fmt::Display for ReadinessCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessCell::Met { rarity } => write!(f, "{}", rarity),
            ReadinessCell::Short { rarity, level, gear } => write!(f, "{}*L{}G{}", rarity, level, gear),
            ReadinessCell::NotOwned => Ok(()),
        }
    }
}

/// Running squad/phase counters for one member.
#[derive(Debug, Clone, Default)]
pub struct ReadinessCounter {
    squad_counter: u32,
    phase_counter: u32,
    last_squad: Option<(u8, String)>,
    last_mandatory: bool,
}

impl ReadinessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, requirement: &Requirement, met: bool) {
        let squad = (requirement.phase, requirement.squad.clone());
        if self.last_squad.as_ref() != Some(&squad) {
            self.squad_counter = 0;
        }
        // Mandatory units replace whatever optional credit the squad had so far
        if requirement.mandatory && !self.last_mandatory {
            self.squad_counter = 0;
        }
        if met {
            self.squad_counter += 1;
            if self.squad_counter <= SQUAD_SIZE {
                self.phase_counter += 1;
            }
        }
        self.last_mandatory = requirement.mandatory;
        self.last_squad = Some(squad);
    }

    pub const fn squad_count(&self) -> u32 {
        self.squad_counter
    }

    pub const fn phase_count(&self) -> u32 {
        self.phase_counter
    }

    /// Emits the phase total and zeroes both counters.
    pub fn close_phase(&mut self) -> u32 {
        let count = self.phase_counter;
        *self = Self::default();
        count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSegment {
    pub phase: u8,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReadiness {
    pub member_id: MemberId,
    /// One cell per unit row, in row order
    pub cells: Vec<ReadinessCell>,
    pub phases: Vec<PhaseSegment>,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildReadiness {
    /// Column headers matching each member's cells
    pub columns: Vec<Requirement>,
    pub members: Vec<MemberReadiness>,
    pub phase_totals: BTreeMap<u8, u32>,
    pub total: u32,
}

pub fn member_readiness(member: &Member, rows: &[ReadinessRow]) -> MemberReadiness {
    let mut counter = ReadinessCounter::new();
    let mut cells = Vec::new();
    let mut phases = Vec::new();
    let mut current_phase: Option<u8> = None;
    let mut open_rows = false;

    for row in rows {
        match row {
            ReadinessRow::Unit(requirement) => {
                let cell = ReadinessCell::evaluate(requirement, member.owned(&requirement.unit_id));
                counter.observe(requirement, cell.is_met());
                cells.push(cell);
                current_phase = Some(requirement.phase);
                open_rows = true;
            }
            ReadinessRow::PhaseCount { phase } => {
                phases.push(PhaseSegment {
                    phase: phase.or(current_phase).unwrap_or(0),
                    count: counter.close_phase(),
                });
                open_rows = false;
            }
        }
    }
    if open_rows {
        phases.push(PhaseSegment {
            phase: current_phase.unwrap_or(0),
            count: counter.close_phase(),
        });
    }

    let total = phases.iter().map(|p| p.count).sum();
    MemberReadiness {
        member_id: member.id.clone(),
        cells,
        phases,
        total,
    }
}

pub fn guild_readiness(snapshot: &Snapshot, rows: &[ReadinessRow]) -> GuildReadiness {
    let columns = rows
        .iter()
        .filter_map(|r| match r {
            ReadinessRow::Unit(req) => Some(req.clone()),
            ReadinessRow::PhaseCount { .. } => None,
        })
        .collect();
    let members: Vec<MemberReadiness> = snapshot
        .members
        .iter()
        .map(|m| member_readiness(m, rows))
        .collect();

    let mut phase_totals: BTreeMap<u8, u32> = BTreeMap::new();
    for segment in members.iter().flat_map(|m| &m.phases) {
        *phase_totals.entry(segment.phase).or_insert(0) += segment.count;
    }
    let total = members.iter().map(|m| m.total).sum();
    log::info!("Readiness computed for {} members, guild total {}", members.len(), total);

    GuildReadiness {
        columns,
        members,
        phase_totals,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(phase: u8, squad: &str, unit: &str, mandatory: bool) -> Requirement {
        Requirement {
            phase,
            squad: squad.to_string(),
            unit_id: unit.to_string(),
            min_rarity: 7,
            min_gear: 12,
            min_level: 85,
            mandatory,
        }
    }

    fn owned(unit: &str, rarity: u8, level: u32, gear: u32) -> (String, UnitInstance) {
        (
            unit.to_string(),
            UnitInstance {
                unit_id: unit.to_string(),
                owner_id: "m".to_string(),
                rarity,
                level,
                gear_level: gear,
                power: 1,
            },
        )
    }

    fn member(units: Vec<(String, UnitInstance)>) -> Member {
        Member {
            id: "m".to_string(),
            name: "m".to_string(),
            ally_code: String::new(),
            gp: 0,
            heroes_gp: 0,
            ships_gp: 0,
            owned_units: units.into_iter().collect(),
        }
    }

    #[test]
    fn mandatory_after_optional_restarts_squad_count() {
        let mut counter = ReadinessCounter::new();
        counter.observe(&req(1, "s1", "A", true), true);
        assert_eq!(counter.squad_count(), 1);
        counter.observe(&req(1, "s1", "B", false), true);
        assert_eq!(counter.squad_count(), 2);
        counter.observe(&req(1, "s1", "C", true), true);
        assert_eq!(counter.squad_count(), 1);
        assert_eq!(counter.phase_count(), 3);
    }

    #[test]
    fn consecutive_mandatory_rows_keep_counting() {
        let mut counter = ReadinessCounter::new();
        counter.observe(&req(1, "s1", "A", true), true);
        counter.observe(&req(1, "s1", "B", true), true);
        assert_eq!(counter.squad_count(), 2);
    }

    #[test]
    fn last_mandatory_tracks_unmet_rows_too() {
        let mut counter = ReadinessCounter::new();
        counter.observe(&req(1, "s1", "A", false), true);
        counter.observe(&req(1, "s1", "B", true), false);
        // B reset the count even though it was not met; C follows a mandatory row
        counter.observe(&req(1, "s1", "C", true), true);
        assert_eq!(counter.squad_count(), 1);
    }

    #[test]
    fn squad_change_resets_squad_counter() {
        let mut counter = ReadinessCounter::new();
        counter.observe(&req(1, "s1", "A", false), true);
        counter.observe(&req(1, "s1", "B", false), true);
        counter.observe(&req(1, "s2", "C", false), true);
        assert_eq!(counter.squad_count(), 1);
        assert_eq!(counter.phase_count(), 3);
    }

    #[test]
    fn only_five_met_units_per_squad_reach_the_phase() {
        let mut counter = ReadinessCounter::new();
        for unit in ["A", "B", "C", "D", "E", "F", "G"] {
            counter.observe(&req(1, "s1", unit, false), true);
        }
        assert_eq!(counter.squad_count(), 7);
        assert_eq!(counter.phase_count(), 5);
        assert_eq!(counter.close_phase(), 5);
        assert_eq!(counter.phase_count(), 0);
        assert_eq!(counter.squad_count(), 0);
    }

    #[test]
    fn cells_show_rarity_or_shortfall() {
        let requirement = req(1, "s1", "A", false);
        let (_, good) = owned("A", 7, 85, 12);
        let (_, weak) = owned("A", 5, 80, 9);
        assert_eq!(ReadinessCell::evaluate(&requirement, Some(&good)).to_string(), "7");
        assert_eq!(ReadinessCell::evaluate(&requirement, Some(&weak)).to_string(), "5*L80G9");
        assert_eq!(ReadinessCell::evaluate(&requirement, None).to_string(), "");
    }

    #[test]
    fn phase_segments_sum_to_total() {
        let rows = vec![
            ReadinessRow::Unit(req(1, "s1", "A", false)),
            ReadinessRow::Unit(req(1, "s1", "B", false)),
            ReadinessRow::PhaseCount { phase: Some(1) },
            ReadinessRow::Unit(req(2, "s1", "A", true)),
            ReadinessRow::Unit(req(2, "s2", "C", false)),
            ReadinessRow::PhaseCount { phase: Some(2) },
            ReadinessRow::Unit(req(3, "s1", "B", false)),
        ];
        let m = member(vec![owned("A", 7, 85, 12), owned("B", 7, 85, 13), owned("C", 6, 85, 12)]);
        let readiness = member_readiness(&m, &rows);
        let counts: Vec<(u8, u32)> = readiness.phases.iter().map(|p| (p.phase, p.count)).collect();
        assert_eq!(counts, vec![(1, 2), (2, 1), (3, 1)]);
        assert_eq!(readiness.total, readiness.phases.iter().map(|p| p.count).sum::<u32>());
        assert_eq!(readiness.cells.len(), 5);
        assert_eq!(readiness.cells[3].to_string(), "6*L85G12");
    }

    #[test]
    fn guild_totals_add_up_across_members() {
        let rows = vec![
            ReadinessRow::Unit(req(1, "s1", "A", false)),
            ReadinessRow::PhaseCount { phase: Some(1) },
            ReadinessRow::Unit(req(2, "s1", "B", false)),
            ReadinessRow::PhaseCount { phase: Some(2) },
        ];
        let mut other = member(vec![owned("B", 7, 85, 12)]);
        other.id = "n".to_string();
        let snapshot = Snapshot::new(
            chrono::Utc::now(),
            vec![],
            vec![member(vec![owned("A", 7, 85, 12), owned("B", 7, 85, 12)]), other],
        );
        let guild = guild_readiness(&snapshot, &rows);
        assert_eq!(guild.phase_totals[&1], 1);
        assert_eq!(guild.phase_totals[&2], 2);
        assert_eq!(guild.total, 3);
        assert_eq!(guild.total, guild.phase_totals.values().sum::<u32>());
        assert_eq!(guild.columns.len(), 2);
    }

    #[test]
    fn blank_marker_phase_follows_the_rows_above() {
        let rows = vec![
            ReadinessRow::Unit(req(1, "s1", "A", false)),
            ReadinessRow::PhaseCount { phase: None },
            ReadinessRow::Unit(req(2, "s1", "B", false)),
            ReadinessRow::PhaseCount { phase: None },
        ];
        let snapshot = Snapshot::new(
            chrono::Utc::now(),
            vec![],
            vec![member(vec![owned("A", 7, 85, 12), owned("B", 7, 85, 12)])],
        );
        let guild = guild_readiness(&snapshot, &rows);
        let totals: Vec<(u8, u32)> = guild.phase_totals.into_iter().collect();
        assert_eq!(totals, vec![(1, 1), (2, 1)]);
    }
}
