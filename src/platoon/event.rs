use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use super::types::{TerritoryKind, PLATOONS_PER_TERRITORY, TERRITORIES_PER_PHASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Light,
    Dark,
}

impl Alignment {
    /// Catalog tag every donated unit must carry
    pub const fn tag(self) -> &'static str {
        match self {
            Alignment::Light => "Light Side",
            Alignment::Dark => "Dark Side",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Campaign {
    Hoth,
    Geonosis,
}

/// Minimum rarity a donated copy needs in a given phase.
///
/// Campaigns disagree on the formula, so each event picks one per
/// territory kind instead of sharing a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityRule {
    /// `rarity >= phase + 1`, capped at 7 stars
    PhasePlusOne,
    /// `rarity > phase`
    ExceedsPhase,
    /// Fixed per-phase minimums, phase 1 first
    Bands([u8; 6]),
    /// Officer override from configuration
    Fixed(u8),
}

impl RarityRule {
    pub fn threshold(&self, phase: u8) -> u8 {
        match self {
            RarityRule::PhasePlusOne => phase.saturating_add(1).min(7),
            RarityRule::ExceedsPhase => phase.saturating_add(1),
            RarityRule::Bands(bands) => {
                let idx = (phase.max(1) as usize - 1).min(bands.len() - 1);
                bands[idx]
            }
            RarityRule::Fixed(min) => *min,
        }
    }

    pub fn admits(&self, rarity: u8, phase: u8) -> bool {
        match self {
            RarityRule::ExceedsPhase => rarity > phase,
            _ => rarity >= self.threshold(phase),
        }
    }
}

struct TerritoryGate {
    kind: TerritoryKind,
    opens_at: u8,
    name: &'static str,
}

const HOTH_LIGHT_GATES: [TerritoryGate; TERRITORIES_PER_PHASE] = [
    TerritoryGate { kind: TerritoryKind::Airspace, opens_at: 3, name: "Rebel Airspace" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Rebel Base" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 2, name: "Ion Cannon" },
];

const HOTH_DARK_GATES: [TerritoryGate; TERRITORIES_PER_PHASE] = [
    TerritoryGate { kind: TerritoryKind::Airspace, opens_at: 1, name: "Imperial Fleet" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Imperial Flank" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 2, name: "Imperial Base" },
];

const GEONOSIS_LIGHT_GATES: [TerritoryGate; TERRITORIES_PER_PHASE] = [
    TerritoryGate { kind: TerritoryKind::Airspace, opens_at: 1, name: "Republic Fleet" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Republic Landing" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Droid Factory" },
];

const GEONOSIS_DARK_GATES: [TerritoryGate; TERRITORIES_PER_PHASE] = [
    TerritoryGate { kind: TerritoryKind::Airspace, opens_at: 1, name: "Separatist Fleet" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Separatist Command" },
    TerritoryGate { kind: TerritoryKind::Ground, opens_at: 1, name: "Petranaki Arena" },
];

/// Territory points per platoon, one row per phase, platoon 1 first
const HOTH_PLATOON_POINTS: [[u64; PLATOONS_PER_TERRITORY]; 6] = [
    [10_000_000, 10_500_000, 11_000_000, 11_500_000, 12_000_000, 12_500_000],
    [11_000_000, 11_550_000, 12_100_000, 12_650_000, 13_200_000, 13_750_000],
    [12_000_000, 12_600_000, 13_200_000, 13_800_000, 14_400_000, 15_000_000],
    [13_000_000, 13_650_000, 14_300_000, 14_950_000, 15_600_000, 16_250_000],
    [14_000_000, 14_700_000, 15_400_000, 16_100_000, 16_800_000, 17_500_000],
    [15_000_000, 15_750_000, 16_500_000, 17_250_000, 18_000_000, 18_750_000],
];
const GEONOSIS_PLATOON_POINTS: [[u64; PLATOONS_PER_TERRITORY]; 6] = [
    [20_000_000, 21_000_000, 22_000_000, 23_000_000, 24_000_000, 25_000_000],
    [25_000_000, 26_250_000, 27_500_000, 28_750_000, 30_000_000, 31_250_000],
    [30_000_000, 31_500_000, 33_000_000, 34_500_000, 36_000_000, 37_500_000],
    [35_000_000, 36_750_000, 38_500_000, 40_250_000, 42_000_000, 43_750_000],
    [0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0],
];
const GEONOSIS_RARITY_BANDS: [u8; 6] = [5, 6, 7, 7, 7, 7];

/// The four supported Territory Battle variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    HothLight,
    HothDark,
    GeonosisLight,
    GeonosisDark,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::HothLight,
        EventType::HothDark,
        EventType::GeonosisLight,
        EventType::GeonosisDark,
    ];

    pub const fn alignment(self) -> Alignment {
        match self {
            EventType::HothLight | EventType::GeonosisLight => Alignment::Light,
            EventType::HothDark | EventType::GeonosisDark => Alignment::Dark,
        }
    }

    pub const fn campaign(self) -> Campaign {
        match self {
            EventType::HothLight | EventType::HothDark => Campaign::Hoth,
            EventType::GeonosisLight | EventType::GeonosisDark => Campaign::Geonosis,
        }
    }

    pub const fn phase_count(self) -> u8 {
        match self.campaign() {
            Campaign::Hoth => 6,
            Campaign::Geonosis => 4,
        }
    }

    pub const fn required_tag(self) -> &'static str {
        self.alignment().tag()
    }

    fn gates(self) -> &'static [TerritoryGate; TERRITORIES_PER_PHASE] {
        match self {
            EventType::HothLight => &HOTH_LIGHT_GATES,
            EventType::HothDark => &HOTH_DARK_GATES,
            EventType::GeonosisLight => &GEONOSIS_LIGHT_GATES,
            EventType::GeonosisDark => &GEONOSIS_DARK_GATES,
        }
    }

    /// Kind of territory `index` during `phase`, `Closed` when not yet open
    /// or when the phase is past the end of the event.
    pub fn territory_kind(self, phase: u8, index: usize) -> TerritoryKind {
        if phase == 0 || phase > self.phase_count() {
            return TerritoryKind::Closed;
        }
        match self.gates().get(index) {
            Some(gate) if phase >= gate.opens_at => gate.kind,
            _ => TerritoryKind::Closed,
        }
    }

    pub fn territory_name(self, index: usize) -> &'static str {
        self.gates().get(index).map_or("Unknown", |g| g.name)
    }

    pub const fn rarity_rule(self, kind: TerritoryKind) -> RarityRule {
        match (self.campaign(), kind) {
            (Campaign::Hoth, TerritoryKind::Airspace) => RarityRule::ExceedsPhase,
            (Campaign::Hoth, _) => RarityRule::PhasePlusOne,
            (Campaign::Geonosis, _) => RarityRule::Bands(GEONOSIS_RARITY_BANDS),
        }
    }

    pub fn platoon_values(self, phase: u8) -> [u64; PLATOONS_PER_TERRITORY] {
        let table = match self.campaign() {
            Campaign::Hoth => &HOTH_PLATOON_POINTS,
            Campaign::Geonosis => &GEONOSIS_PLATOON_POINTS,
        };
        usize::from(phase)
            .checked_sub(1)
            .and_then(|idx| table.get(idx))
            .copied()
            .unwrap_or([0; PLATOONS_PER_TERRITORY])
    }

    pub const fn label(self) -> &'static str {
        match self {
            EventType::HothLight => "Hoth (Light Side)",
            EventType::HothDark => "Hoth (Dark Side)",
            EventType::GeonosisLight => "Geonosis (Light Side)",
            EventType::GeonosisDark => "Geonosis (Dark Side)",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventType {
    type Err = PlannerError;

    /// Accepts the config spelling (`hoth_light`) and the loose grid
    /// spellings officers type (`HLS`, `Hoth LS`, `Geo DS` ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace(['-', ' '], "_");
        let event = match lower.as_str() {
            "hoth_light" | "hls" | "hoth_ls" => EventType::HothLight,
            "hoth_dark" | "hds" | "hoth_ds" => EventType::HothDark,
            "geonosis_light" | "gls" | "geo_ls" | "geonosis_ls" => EventType::GeonosisLight,
            "geonosis_dark" | "gds" | "geo_ds" | "geonosis_ds" => EventType::GeonosisDark,
            _ => return Err(PlannerError::UnknownEvent(s.to_string())),
        };
        Ok(event)
    }
}
