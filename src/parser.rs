use csv::{Reader, StringRecord};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use log::warn;

use crate::error::{PlannerError, Result};
use crate::platoon::readiness::{ReadinessRow, Requirement, PHASE_COUNT_MARKER};
use crate::platoon::types::{PlatoonKey, SlotRow};
use crate::roster::types::{ExclusionMap, Member, UnavailableSet, UnitDefinition, UnitInstance};

/// Stats decoded from an ownership cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipStats {
    pub rarity: u8,
    pub level: u32,
    /// `None` for ships, whose cells carry no `G` part
    pub gear_level: Option<u32>,
    pub power: u64,
}

/// Parses `"{rarity}*L{level}G{gear}P{power}"` (ships omit the `G` part).
/// An empty cell means the member does not own the unit.
pub fn parse_ownership(cell: &str) -> Result<Option<OwnershipStats>> {
    let clean = cell.trim();
    if clean.is_empty() {
        return Ok(None);
    }
    let malformed = || PlannerError::MalformedOwnership(cell.to_string());

    let (rarity, rest) = clean.split_once('*').ok_or_else(malformed)?;
    let rest = rest.strip_prefix('L').ok_or_else(malformed)?;
    let (before_power, power) = rest.split_once('P').ok_or_else(malformed)?;
    let (level, gear) = match before_power.split_once('G') {
        Some((level, gear)) => (level, Some(gear)),
        None => (before_power, None),
    };

    let rarity: u8 = rarity.trim().parse().map_err(|_| malformed())?;
    if !(1..=7).contains(&rarity) {
        return Err(malformed());
    }
    Ok(Some(OwnershipStats {
        rarity,
        level: level.parse().map_err(|_| malformed())?,
        gear_level: gear.map(|g| g.parse()).transpose().map_err(|_| malformed())?,
        power: power.parse().map_err(|_| malformed())?,
    }))
}

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1" || lower == "x"
}

/// Parses a number, returning 0 if empty or invalid
fn parse_number<T: std::str::FromStr + Default>(value: &str) -> T {
    value.trim().replace(',', "").parse().unwrap_or_default()
}

fn column(headers: &StringRecord, needle: &str, fallback: usize) -> usize {
    headers
        .iter()
        .position(|h| h.trim().to_lowercase().contains(needle))
        .unwrap_or(fallback)
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Unit catalog rows: `name, id, tags` where tags are comma separated
pub fn read_units<R: Read>(source: R) -> Result<Vec<UnitDefinition>> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let name_col = column(&headers, "name", 0);
    let id_col = column(&headers, "id", 1);
    let tags_col = column(&headers, "tag", 2);

    let mut units = Vec::new();
    for result in reader.records() {
        let record = result?;
        let id = field(&record, id_col);
        if id.is_empty() {
            continue;
        }
        let tags: BTreeSet<String> = field(&record, tags_col)
            .split(',')
            .filter_map(non_empty)
            .collect();
        units.push(UnitDefinition {
            id: id.to_string(),
            name: field(&record, name_col).to_string(),
            tags,
        });
    }
    Ok(units)
}

/// Roster rows: `member, ally code, gp, heroes gp, ships gp`, optional `id`.
/// The ally code doubles as the member id when no id column is present.
pub fn read_roster<R: Read>(source: R) -> Result<Vec<Member>> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let name_col = column(&headers, "member", 0);
    let ally_col = column(&headers, "ally", 1);
    let gp_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("gp"))
        .unwrap_or(2);
    let heroes_col = column(&headers, "hero", 3);
    let ships_col = column(&headers, "ship", 4);
    let id_col = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("id"));

    let mut members = Vec::new();
    for result in reader.records() {
        let record = result?;
        let name = field(&record, name_col);
        let ally_code = field(&record, ally_col).replace('-', "");
        if name.is_empty() || ally_code.is_empty() {
            continue;
        }
        let id = id_col
            .and_then(|c| non_empty(field(&record, c)))
            .unwrap_or_else(|| ally_code.clone());
        members.push(Member {
            id,
            name: name.to_string(),
            ally_code,
            gp: parse_number(field(&record, gp_col)),
            heroes_gp: parse_number(field(&record, heroes_col)),
            ships_gp: parse_number(field(&record, ships_col)),
            owned_units: Default::default(),
        });
    }
    Ok(members)
}

/// Finds the roster entry a grid column header refers to, by id then by name.
/// A name shared by several members resolves to the first of them.
fn member_index(members: &[Member], header: &str) -> Option<usize> {
    let header = header.trim();
    if let Some(idx) = members.iter().position(|m| m.id == header) {
        return Some(idx);
    }
    let mut by_name = members
        .iter()
        .enumerate()
        .filter(|(_, m)| m.name == header)
        .map(|(idx, _)| idx);
    let first = by_name.next()?;
    if by_name.next().is_some() {
        warn!(
            "{:?} matches several members by name, using {}; use the ally code instead",
            header, members[first].id
        );
    }
    Some(first)
}

/// Rekeys an exclusion grid read with member names or ids onto roster ids.
/// Columns that match no member are dropped with a warning.
pub fn resolve_exclusions(exclusions: ExclusionMap, members: &[Member]) -> ExclusionMap {
    let mut resolved = ExclusionMap::new();
    for (key, units) in exclusions {
        match member_index(members, &key) {
            Some(idx) => resolved
                .entry(members[idx].id.clone())
                .or_default()
                .extend(units),
            None => warn!("Exclusion column {:?} matches no member, ignored", key),
        }
    }
    resolved
}

pub fn resolve_unavailable(unavailable: UnavailableSet, members: &[Member]) -> UnavailableSet {
    unavailable
        .into_iter()
        .filter_map(|key| match member_index(members, &key) {
            Some(idx) => Some(members[idx].id.clone()),
            None => {
                warn!("Unavailable member {:?} not in roster, ignored", key);
                None
            }
        })
        .collect()
}

/// Ownership grid: one row per unit, one column per member.
///
/// Malformed cells are skipped with a warning; columns for members not in
/// the roster are ignored. Replaces every member's owned units wholesale.
pub fn read_ownership<R: Read>(source: R, members: &mut [Member]) -> Result<usize> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let columns: Vec<(usize, usize)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(col, h)| member_index(members, h).map(|m| (col, m)))
        .collect();

    for member in members.iter_mut() {
        member.owned_units.clear();
    }
    let mut owned = 0;
    for result in reader.records() {
        let record = result?;
        let unit_id = field(&record, 0);
        if unit_id.is_empty() {
            continue;
        }
        for &(col, idx) in &columns {
            let stats = match parse_ownership(field(&record, col)) {
                Ok(Some(stats)) => stats,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Skipping {} for column {}: {}", unit_id, col, err);
                    continue;
                }
            };
            let member = &mut members[idx];
            member.owned_units.insert(
                unit_id.to_string(),
                UnitInstance {
                    unit_id: unit_id.to_string(),
                    owner_id: member.id.clone(),
                    rarity: stats.rarity,
                    level: stats.level,
                    gear_level: stats.gear_level.unwrap_or(0),
                    power: stats.power,
                },
            );
            owned += 1;
        }
    }
    Ok(owned)
}

/// Exclusion grid: one row per unit, one boolean column per member id
pub fn read_exclusions<R: Read>(source: R) -> Result<ExclusionMap> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let mut exclusions = ExclusionMap::new();
    for result in reader.records() {
        let record = result?;
        let unit_id = field(&record, 0);
        if unit_id.is_empty() {
            continue;
        }
        for (col, member_id) in headers.iter().enumerate().skip(1) {
            if parse_bool(field(&record, col)) {
                exclusions
                    .entry(member_id.trim().to_string())
                    .or_default()
                    .insert(unit_id.to_string(), true);
            }
        }
    }
    Ok(exclusions)
}

/// One member id per row in the first column
pub fn read_unavailable<R: Read>(source: R) -> Result<UnavailableSet> {
    let mut reader = Reader::from_reader(source);
    let mut unavailable = UnavailableSet::new();
    for result in reader.records() {
        let record = result?;
        if let Some(id) = non_empty(field(&record, 0)) {
            unavailable.insert(id);
        }
    }
    Ok(unavailable)
}

/// Slice or platoon grid rows: `phase, territory, platoon, slot, unit`.
/// The phase column may be missing or blank.
pub fn read_slot_rows<R: Read>(source: R) -> Result<Vec<SlotRow>> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let phase_col = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("phase"));
    let offset = usize::from(phase_col.is_some());
    let territory_col = column(&headers, "territory", offset);
    let platoon_col = column(&headers, "platoon", offset + 1);
    let slot_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("slot"))
        .unwrap_or(offset + 2);
    let unit_col = column(&headers, "unit", offset + 3);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let (Ok(territory), Ok(platoon), Ok(slot)) = (
            field(&record, territory_col).parse(),
            field(&record, platoon_col).parse(),
            field(&record, slot_col).parse(),
        ) else {
            warn!("Skipping slot row with bad coordinates: {:?}", record);
            continue;
        };
        rows.push(SlotRow {
            phase: phase_col.and_then(|c| field(&record, c).parse().ok()),
            territory,
            platoon,
            slot,
            unit: non_empty(field(&record, unit_col)),
        });
    }
    Ok(rows)
}

/// Skip checkboxes: `territory, platoon, skip`
pub fn read_skips<R: Read>(source: R) -> Result<BTreeSet<PlatoonKey>> {
    let mut reader = Reader::from_reader(source);
    let mut skips = BTreeSet::new();
    for result in reader.records() {
        let record = result?;
        if !parse_bool(field(&record, 2)) {
            continue;
        }
        if let (Ok(territory), Ok(platoon)) = (field(&record, 0).parse(), field(&record, 1).parse()) {
            skips.insert(PlatoonKey { territory, platoon });
        }
    }
    Ok(skips)
}

/// Required-unit grid for readiness:
/// `phase, squad, unit, min rarity, min gear, min level, mandatory`.
/// A row whose unit cell reads `Phase Count` closes the phase.
pub fn read_requirements<R: Read>(source: R) -> Result<Vec<ReadinessRow>> {
    let mut reader = Reader::from_reader(source);
    let headers = reader.headers()?.clone();
    let phase_col = column(&headers, "phase", 0);
    let squad_col = column(&headers, "squad", 1);
    let unit_col = column(&headers, "unit", 2);
    let rarity_col = column(&headers, "rarity", 3);
    let gear_col = column(&headers, "gear", 4);
    let level_col = column(&headers, "level", 5);
    let mandatory_col = column(&headers, "mandatory", 6);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let unit = field(&record, unit_col);
        let phase_cell = field(&record, phase_col);
        if unit.eq_ignore_ascii_case(PHASE_COUNT_MARKER) {
            rows.push(ReadinessRow::PhaseCount {
                phase: phase_cell.parse().ok(),
            });
            continue;
        }
        let phase: u8 = parse_number(phase_cell);
        if unit.is_empty() {
            continue;
        }
        rows.push(ReadinessRow::Unit(Requirement {
            phase,
            squad: field(&record, squad_col).to_string(),
            unit_id: unit.to_string(),
            min_rarity: parse_number(field(&record, rarity_col)),
            min_gear: parse_number(field(&record, gear_col)),
            min_level: parse_number(field(&record, level_col)),
            mandatory: parse_bool(field(&record, mandatory_col)),
        }));
    }
    Ok(rows)
}

fn open<P: AsRef<Path>>(path: P) -> Result<std::fs::File> {
    let path = path.as_ref();
    std::fs::File::open(path)
        .map_err(|e| PlannerError::DataUnavailable(format!("{}: {}", path.display(), e)))
}

pub fn load_units<P: AsRef<Path>>(path: P) -> Result<Vec<UnitDefinition>> {
    read_units(open(path)?)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<Member>> {
    read_roster(open(path)?)
}

pub fn load_ownership<P: AsRef<Path>>(path: P, members: &mut [Member]) -> Result<usize> {
    read_ownership(open(path)?, members)
}

pub fn load_exclusions<P: AsRef<Path>>(path: P) -> Result<ExclusionMap> {
    read_exclusions(open(path)?)
}

pub fn load_unavailable<P: AsRef<Path>>(path: P) -> Result<UnavailableSet> {
    read_unavailable(open(path)?)
}

pub fn load_slot_rows<P: AsRef<Path>>(path: P) -> Result<Vec<SlotRow>> {
    read_slot_rows(open(path)?)
}

pub fn load_skips<P: AsRef<Path>>(path: P) -> Result<BTreeSet<PlatoonKey>> {
    read_skips(open(path)?)
}

pub fn load_requirements<P: AsRef<Path>>(path: P) -> Result<Vec<ReadinessRow>> {
    read_requirements(open(path)?)
}
