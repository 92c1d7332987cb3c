use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::display::format_donor;
use crate::error::Result;
use crate::platoon::engine::{AssignmentResult, Highlight};
use crate::platoon::readiness::GuildReadiness;
use crate::roster::types::MemberId;

fn highlight_label(highlight: Highlight) -> &'static str {
    match highlight {
        Highlight::Normal => "normal",
        Highlight::Rare => "rare",
        Highlight::Missing => "missing",
    }
}

/// Writes the donor grid, one record per slot that names a unit.
///
/// Indices are zero based, matching what the grid readers accept, so an
/// exported file can be fed back in as `platoons.csv`.
pub fn write_donor_grid<W: Write>(
    result: &AssignmentResult,
    names: &BTreeMap<MemberId, String>,
    writer: W,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    wtr.write_record(["territory", "platoon", "slot", "unit", "donor", "highlight"])?;

    for outcome in result.slots.iter().filter(|s| s.unit_id.is_some()) {
        wtr.write_record([
            outcome.key.territory.to_string(),
            outcome.key.platoon.to_string(),
            outcome.key.slot.to_string(),
            outcome.unit_id.clone().unwrap_or_default(),
            format_donor(&outcome.donor, names),
            highlight_label(outcome.highlight).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_donor_grid<P: AsRef<Path>>(
    result: &AssignmentResult,
    names: &BTreeMap<MemberId, String>,
    path: P,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_donor_grid(result, names, file)
}

/// Writes the readiness grid: one row per member, one column per unit
/// requirement, then one column per phase and the member total.
pub fn write_readiness_grid<W: Write>(
    guild: &GuildReadiness,
    names: &BTreeMap<MemberId, String>,
    writer: W,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);

    let phases: Vec<u8> = guild.phase_totals.keys().copied().collect();
    let mut header = vec!["member".to_string()];
    header.extend(
        guild
            .columns
            .iter()
            .map(|c| format!("P{} {} {}", c.phase, c.squad, c.unit_id)),
    );
    header.extend(phases.iter().map(|p| format!("Phase {}", p)));
    header.push("Total".to_string());
    wtr.write_record(&header)?;

    for member in &guild.members {
        let mut record = Vec::with_capacity(header.len());
        record.push(
            names
                .get(&member.member_id)
                .cloned()
                .unwrap_or_else(|| member.member_id.clone()),
        );
        record.extend(member.cells.iter().map(|c| c.to_string()));
        for phase in &phases {
            let count: u32 = member
                .phases
                .iter()
                .filter(|s| s.phase == *phase)
                .map(|s| s.count)
                .sum();
            record.push(count.to_string());
        }
        record.push(member.total.to_string());
        wtr.write_record(&record)?;
    }

    let mut totals = vec!["Guild".to_string()];
    totals.extend(guild.columns.iter().map(|_| String::new()));
    totals.extend(
        phases
            .iter()
            .map(|p| guild.phase_totals.get(p).copied().unwrap_or(0).to_string()),
    );
    totals.push(guild.total.to_string());
    wtr.write_record(&totals)?;

    wtr.flush()?;
    Ok(())
}

pub fn export_readiness_grid<P: AsRef<Path>>(
    guild: &GuildReadiness,
    names: &BTreeMap<MemberId, String>,
    path: P,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_readiness_grid(guild, names, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::read_slot_rows;
    use crate::platoon::engine::{Donor, SlotOutcome};
    use crate::platoon::readiness::{guild_readiness, ReadinessRow, Requirement};
    use crate::platoon::types::SlotKey;
    use crate::roster::types::{Member, Snapshot, UnitInstance};
    use chrono::Utc;

    fn outcome(slot: u8, unit: Option<&str>, donor: Donor, highlight: Highlight) -> SlotOutcome {
        SlotOutcome {
            key: SlotKey { territory: 1, platoon: 5, slot },
            unit_id: unit.map(str::to_string),
            donor,
            highlight,
            eligible: 1,
        }
    }

    #[test]
    fn donor_grid_skips_empty_slots_and_reads_back() {
        let result = AssignmentResult {
            slots: vec![
                outcome(0, Some("VADER"), Donor::Member("a".to_string()), Highlight::Rare),
                outcome(1, None, Donor::Unassigned, Highlight::Normal),
                outcome(2, Some("TARKIN"), Donor::Skip, Highlight::Missing),
            ],
            platoons: Vec::new(),
            demand: Default::default(),
            placements: Default::default(),
        };
        let names = [("a".to_string(), "Anna".to_string())].into_iter().collect();
        let mut buf = Vec::new();
        write_donor_grid(&result, &names, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "territory,platoon,slot,unit,donor,highlight\n\
             1,5,0,VADER,Anna,rare\n\
             1,5,2,TARKIN,Skip,missing\n"
        );
        let rows = read_slot_rows(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].unit.as_deref(), Some("TARKIN"));
    }

    #[test]
    fn readiness_grid_has_phase_and_total_columns() {
        let mut member = Member {
            id: "a".to_string(),
            name: "Anna".to_string(),
            ally_code: "111".to_string(),
            gp: 0,
            heroes_gp: 0,
            ships_gp: 0,
            owned_units: Default::default(),
        };
        member.owned_units.insert(
            "VADER".to_string(),
            UnitInstance {
                unit_id: "VADER".to_string(),
                owner_id: "a".to_string(),
                rarity: 7,
                level: 85,
                gear_level: 12,
                power: 30_000,
            },
        );
        let snapshot = Snapshot::new(Utc::now(), Vec::new(), vec![member]);
        let rows = vec![
            ReadinessRow::Unit(Requirement {
                phase: 1,
                squad: "Empire".to_string(),
                unit_id: "VADER".to_string(),
                min_rarity: 7,
                min_gear: 12,
                min_level: 85,
                mandatory: true,
            }),
            ReadinessRow::PhaseCount { phase: Some(1) },
        ];
        let guild = guild_readiness(&snapshot, &rows);

        let mut buf = Vec::new();
        write_readiness_grid(&guild, &BTreeMap::new(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "member,P1 Empire VADER,Phase 1,Total");
        assert_eq!(lines[1], "a,7,1,1");
        assert_eq!(lines[2], "Guild,,1,1");
    }
}
