use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::planner::PhasePlan;
use crate::platoon::engine::{Donor, Highlight};
use crate::platoon::readiness::GuildReadiness;
use crate::platoon::types::PlatoonKey;
use crate::roster::types::{MemberId, UnitInstance};

/// Grid encoding of an owned copy; ships leave out the gear part
pub fn format_ownership(instance: &UnitInstance, ship: bool) -> String {
    if ship {
        format!("{}*L{}P{}", instance.rarity, instance.level, instance.power)
    } else {
        format!(
            "{}*L{}G{}P{}",
            instance.rarity, instance.level, instance.gear_level, instance.power
        )
    }
}

/// Name shown in a donor cell
pub fn format_donor(donor: &Donor, names: &BTreeMap<MemberId, String>) -> String {
    match donor {
        Donor::Member(id) => names.get(id).cloned().unwrap_or_else(|| id.clone()),
        Donor::Skip => "Skip".to_string(),
        Donor::Unassigned => String::new(),
    }
}

fn severity_marker(highlight: Highlight) -> &'static str {
    match highlight {
        Highlight::Normal => "",
        Highlight::Rare => " (rare)",
        Highlight::Missing => " (missing)",
    }
}

/// Text rendering of a planned phase, one line per non-empty slot
pub fn render_plan(plan: &PhasePlan, names: &BTreeMap<MemberId, String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "** {} - Phase {} **", plan.event, plan.phase);

    for territory in &plan.territories {
        let _ = writeln!(out, "\n{} [{}]", territory.name, territory.kind);
        for platoon in territory.platoons.iter().rev() {
            let key = PlatoonKey {
                territory: territory.index,
                platoon: platoon.index,
            };
            let status = match plan.result.platoon(key) {
                Some(p) if p.manual_skip => " - SKIPPED (manual)",
                Some(p) if !p.possible => " - SKIPPED (not enough donors)",
                _ => "",
            };
            let _ = writeln!(
                out,
                "  {} {} (value {}){}",
                territory.kind.group_label(),
                platoon.index + 1,
                platoon.value,
                status
            );
            for outcome in plan
                .result
                .slots
                .iter()
                .filter(|s| s.key.platoon_key() == key && s.unit_id.is_some())
            {
                let donor = format_donor(&outcome.donor, names);
                let _ = writeln!(
                    out,
                    "    {:>2}. {:<24} -> {}{}",
                    outcome.key.slot + 1,
                    outcome.unit_id.as_deref().unwrap_or(""),
                    if donor.is_empty() { "[EMPTY]" } else { donor.as_str() },
                    severity_marker(outcome.highlight)
                );
            }
        }
    }

    let missing = plan.result.missing_units();
    if !missing.is_empty() {
        let _ = writeln!(out, "\nMissing units ({}):", missing.len());
        for unit in missing {
            let demand = plan.result.demand.get(unit).copied().unwrap_or(0);
            let _ = writeln!(out, "  - {} (needed {})", unit, demand);
        }
    }
    out
}

pub fn print_plan(plan: &PhasePlan, names: &BTreeMap<MemberId, String>) {
    println!("{}", render_plan(plan, names));
}

/// Writes the rendered plan to a file
pub fn write_plan_to_file<P: AsRef<Path>>(
    plan: &PhasePlan,
    names: &BTreeMap<MemberId, String>,
    path: P,
) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(render_plan(plan, names).as_bytes())?;
    Ok(())
}

/// Per-phase guild totals followed by the members furthest behind
pub fn render_readiness(guild: &GuildReadiness, names: &BTreeMap<MemberId, String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "** Readiness **");
    for (phase, count) in &guild.phase_totals {
        let _ = writeln!(out, "  Phase {}: {}", phase, count);
    }
    let _ = writeln!(out, "  Total: {}", guild.total);

    let mut members: Vec<_> = guild.members.iter().collect();
    members.sort_by(|a, b| a.total.cmp(&b.total).then_with(|| a.member_id.cmp(&b.member_id)));
    let _ = writeln!(out, "\nBy member:");
    for member in members {
        let name = names.get(&member.member_id).unwrap_or(&member.member_id);
        let phases: Vec<String> = member
            .phases
            .iter()
            .map(|p| format!("P{}={}", p.phase, p.count))
            .collect();
        let _ = writeln!(out, "  {:<24} {:>4}  {}", name, member.total, phases.join(" "));
    }
    out
}

pub fn print_readiness(guild: &GuildReadiness, names: &BTreeMap<MemberId, String>) {
    println!("{}", render_readiness(guild, names));
}
