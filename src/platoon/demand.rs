use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::event::EventType;
use super::types::{SlotRow, Territory, TERRITORIES_PER_PHASE};

/// Where slot requirements come from for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Reload the precomputed default slice, then compute donors
    Reset,
    /// Keep whatever officers wrote into the platoon grid, only compute donors
    Recommend,
}

/// Builds the three territories of `phase` with empty slots.
pub fn build_phase(event: EventType, phase: u8) -> Vec<Territory> {
    let values = event.platoon_values(phase);
    (0..TERRITORIES_PER_PHASE)
        .map(|idx| {
            let kind = event.territory_kind(phase, idx);
            let name = event.territory_name(idx).to_string();
            if kind.is_open() {
                Territory::new(idx as u8, kind, name, &values)
            } else {
                Territory::closed(idx as u8, name)
            }
        })
        .collect()
}

/// Writes the unit of every matching row into the territories.
///
/// Territories are matched on their own index, so any subset of a phase
/// can be passed in.
/// Rows for other phases are skipped silently; rows pointing at a closed
/// territory or outside the 6x15 grid are dropped with a warning.
/// Returns the number of slots written.
pub fn apply_rows(territories: &mut [Territory], rows: &[SlotRow], phase: u8) -> usize {
    let mut applied = 0;
    for row in rows.iter().filter(|r| r.applies_to(phase)) {
        let Some(territory) = territories.iter_mut().find(|t| t.index == row.territory) else {
            warn!("Slot row for unknown territory {} ignored", row.territory);
            continue;
        };
        if !territory.is_live() {
            if row.unit.is_some() {
                debug!("Territory {} is closed in phase {}, row ignored", territory.name, phase);
            }
            continue;
        }
        match territory.slot_mut(row.platoon, row.slot) {
            Some(slot) => {
                slot.required_unit = row.unit.clone().filter(|u| !u.trim().is_empty());
                slot.assigned = None;
                applied += 1;
            }
            None => warn!(
                "Slot row out of range (territory {}, platoon {}, slot {}) ignored",
                row.territory, row.platoon, row.slot
            ),
        }
    }
    applied
}

/// Clears one territory and refills it from the default slice.
pub fn reset_territory(territory: &mut Territory, default_slice: &[SlotRow], phase: u8) -> usize {
    territory.clear();
    let index = territory.index;
    let rows: Vec<SlotRow> = default_slice
        .iter()
        .filter(|r| r.territory == index)
        .cloned()
        .collect();
    apply_rows(std::slice::from_mut(territory), &rows, phase)
}

/// Builds the phase and fills slot requirements for the chosen mode.
///
/// `Reset` always starts from the default slice. `Recommend` starts from the
/// officer-authored grid as it currently stands.
pub fn prepare_phase(
    event: EventType,
    phase: u8,
    mode: PlanMode,
    default_slice: &[SlotRow],
    current_grid: &[SlotRow],
) -> Vec<Territory> {
    let mut territories = build_phase(event, phase);
    let applied = match mode {
        PlanMode::Reset => territories
            .iter_mut()
            .map(|t| reset_territory(t, default_slice, phase))
            .sum(),
        PlanMode::Recommend => apply_rows(&mut territories, current_grid, phase),
    };
    debug!("Prepared {} phase {} ({:?}): {} slot rows applied", event, phase, mode, applied);
    territories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platoon::types::TerritoryKind;

    fn row(phase: Option<u8>, territory: u8, platoon: u8, slot: u8, unit: &str) -> SlotRow {
        SlotRow {
            phase,
            territory,
            platoon,
            slot,
            unit: Some(unit.to_string()),
        }
    }

    #[test]
    fn build_phase_marks_unopened_territories_closed() {
        let territories = build_phase(EventType::HothLight, 1);
        assert_eq!(territories.len(), 3);
        assert_eq!(territories[0].kind, TerritoryKind::Closed);
        assert!(territories[0].platoons.is_empty());
        assert_eq!(territories[1].kind, TerritoryKind::Ground);
        assert_eq!(territories[1].platoons.len(), 6);
    }

    #[test]
    fn reset_uses_default_slice_and_ignores_grid() {
        let slice = vec![row(Some(2), 1, 0, 0, "HAN"), row(Some(3), 1, 0, 1, "LUKE")];
        let grid = vec![row(None, 1, 0, 0, "LEIA")];
        let territories = prepare_phase(EventType::HothLight, 2, PlanMode::Reset, &slice, &grid);
        let platoon = &territories[1].platoons[0];
        assert_eq!(platoon.slots[0].required_unit.as_deref(), Some("HAN"));
        assert!(platoon.slots[1].required_unit.is_none());
    }

    #[test]
    fn recommend_uses_current_grid() {
        let slice = vec![row(Some(2), 1, 0, 0, "HAN")];
        let grid = vec![row(None, 1, 0, 0, "LEIA"), row(None, 2, 5, 14, "CHEWIE")];
        let territories = prepare_phase(EventType::HothLight, 2, PlanMode::Recommend, &slice, &grid);
        assert_eq!(territories[1].platoons[0].slots[0].required_unit.as_deref(), Some("LEIA"));
        assert_eq!(territories[2].platoons[5].slots[14].required_unit.as_deref(), Some("CHEWIE"));
    }

    #[test]
    fn rows_for_closed_or_out_of_range_cells_are_dropped() {
        let mut territories = build_phase(EventType::HothLight, 1);
        let rows = vec![
            row(None, 0, 0, 0, "XWING"),
            row(None, 1, 6, 0, "HAN"),
            row(None, 1, 0, 15, "HAN"),
            row(None, 7, 0, 0, "HAN"),
            row(None, 1, 0, 0, "HAN"),
        ];
        assert_eq!(apply_rows(&mut territories, &rows, 1), 1);
    }

    #[test]
    fn blank_units_leave_the_slot_empty() {
        let mut territories = build_phase(EventType::HothDark, 1);
        let rows = vec![row(None, 1, 0, 0, "  ")];
        apply_rows(&mut territories, &rows, 1);
        assert!(territories[1].platoons[0].slots[0].is_empty());
    }

    #[test]
    fn reset_territory_clears_previous_requirements() {
        let mut territories = build_phase(EventType::HothDark, 1);
        apply_rows(&mut territories, &[row(None, 1, 3, 3, "TARKIN")], 1);
        let slice = vec![row(Some(1), 1, 0, 0, "VADER")];
        reset_territory(&mut territories[1], &slice, 1);
        assert!(territories[1].platoons[3].slots[3].is_empty());
        assert_eq!(territories[1].platoons[0].slots[0].required_unit.as_deref(), Some("VADER"));
    }

    #[test]
    fn reset_fills_every_open_territory() {
        let slice = vec![
            row(Some(3), 0, 5, 0, "XWING"),
            row(Some(3), 1, 4, 1, "HAN"),
            row(Some(3), 2, 0, 14, "LUKE"),
        ];
        let territories = prepare_phase(EventType::HothLight, 3, PlanMode::Reset, &slice, &[]);
        assert_eq!(territories[0].platoons[5].slots[0].required_unit.as_deref(), Some("XWING"));
        assert_eq!(territories[1].platoons[4].slots[1].required_unit.as_deref(), Some("HAN"));
        assert_eq!(territories[2].name, "Ion Cannon");
        assert_eq!(territories[2].platoons[0].slots[14].required_unit.as_deref(), Some("LUKE"));
    }

    #[test]
    fn reset_territory_works_on_a_single_territory() {
        let mut territories = build_phase(EventType::HothLight, 2);
        let slice = vec![row(Some(2), 2, 1, 1, "CHEWIE"), row(Some(2), 1, 1, 1, "HAN")];
        assert_eq!(reset_territory(&mut territories[2], &slice, 2), 1);
        assert_eq!(territories[2].platoons[1].slots[1].required_unit.as_deref(), Some("CHEWIE"));
        assert!(territories[1].platoons[1].slots[1].is_empty());
    }
}
