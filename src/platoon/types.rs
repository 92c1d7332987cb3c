use std::fmt;

use serde::{Deserialize, Serialize};

use crate::roster::types::{MemberId, UnitId};

pub const TERRITORIES_PER_PHASE: usize = 3;
pub const PLATOONS_PER_TERRITORY: usize = 6;
pub const SLOTS_PER_PLATOON: usize = 15;

/// What a territory holds in the current phase.
///
/// Each kind owns its slot layout; a closed territory has no live platoons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryKind {
    Closed,
    Ground,
    Airspace,
}

impl TerritoryKind {
    pub const fn platoon_count(self) -> usize {
        match self {
            TerritoryKind::Closed => 0,
            TerritoryKind::Ground | TerritoryKind::Airspace => PLATOONS_PER_TERRITORY,
        }
    }

    pub const fn slot_count(self) -> usize {
        match self {
            TerritoryKind::Closed => 0,
            TerritoryKind::Ground | TerritoryKind::Airspace => SLOTS_PER_PLATOON,
        }
    }

    pub const fn is_open(self) -> bool {
        !matches!(self, TerritoryKind::Closed)
    }

    /// Squadrons are the airspace flavour of a platoon
    pub const fn group_label(self) -> &'static str {
        match self {
            TerritoryKind::Airspace => "Squadron",
            _ => "Platoon",
        }
    }
}

impl fmt::Display for TerritoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TerritoryKind::Closed => "Closed",
            TerritoryKind::Ground => "Ground",
            TerritoryKind::Airspace => "Airspace",
        };
        f.write_str(label)
    }
}

/// Position of a slot within a phase. Used only as an ordering contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub territory: u8,
    pub platoon: u8,
    pub slot: u8,
}

impl SlotKey {
    pub const fn platoon_key(self) -> PlatoonKey {
        PlatoonKey {
            territory: self.territory,
            platoon: self.platoon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatoonKey {
    pub territory: u8,
    pub platoon: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub required_unit: Option<UnitId>,
    pub assigned: Option<MemberId>,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.required_unit.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platoon {
    pub index: u8,
    pub slots: Vec<Slot>,
    /// Scoring weight shown next to the platoon; allocation ignores it
    pub value: u64,
}

impl Platoon {
    pub fn new(index: u8, slot_count: usize, value: u64) -> Self {
        Platoon {
            index,
            slots: vec![Slot::default(); slot_count],
            value,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }

    pub fn demanded_units(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.required_unit.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub index: u8,
    pub kind: TerritoryKind,
    pub name: String,
    pub platoons: Vec<Platoon>,
}

impl Territory {
    pub fn new(index: u8, kind: TerritoryKind, name: String, values: &[u64; PLATOONS_PER_TERRITORY]) -> Self {
        let platoons = (0..kind.platoon_count())
            .map(|p| Platoon::new(p as u8, kind.slot_count(), values[p]))
            .collect();
        Territory {
            index,
            kind,
            name,
            platoons,
        }
    }

    pub fn closed(index: u8, name: String) -> Self {
        Territory {
            index,
            kind: TerritoryKind::Closed,
            name,
            platoons: Vec::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.kind.is_open() && !self.platoons.is_empty()
    }

    pub fn slot_mut(&mut self, platoon: u8, slot: u8) -> Option<&mut Slot> {
        self.platoons
            .get_mut(platoon as usize)
            .and_then(|p| p.slots.get_mut(slot as usize))
    }

    pub fn clear(&mut self) {
        for platoon in &mut self.platoons {
            platoon.clear();
        }
    }
}

/// One cell of a slice or of the officer-authored platoon grid.
///
/// `phase` is absent when the grid only ever describes the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRow {
    #[serde(default)]
    pub phase: Option<u8>,
    pub territory: u8,
    pub platoon: u8,
    pub slot: u8,
    #[serde(default)]
    pub unit: Option<UnitId>,
}

impl SlotRow {
    pub const fn key(&self) -> SlotKey {
        SlotKey {
            territory: self.territory,
            platoon: self.platoon,
            slot: self.slot,
        }
    }

    pub fn applies_to(&self, phase: u8) -> bool {
        self.phase.map_or(true, |p| p == phase)
    }
}
