use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type UnitId = String;
pub type MemberId = String;

/// Catalog entry for a collectible unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl UnitDefinition {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// One member's copy of a unit. Ships carry no gear, stored as gear level 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub unit_id: UnitId,
    pub owner_id: MemberId,
    pub rarity: u8,
    pub level: u32,
    #[serde(default)]
    pub gear_level: u32,
    pub power: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub ally_code: String,
    #[serde(default)]
    pub gp: u64,
    #[serde(default)]
    pub heroes_gp: u64,
    #[serde(default)]
    pub ships_gp: u64,
    #[serde(default)]
    pub owned_units: BTreeMap<UnitId, UnitInstance>,
}

impl Member {
    pub fn owned(&self, unit_id: &str) -> Option<&UnitInstance> {
        self.owned_units.get(unit_id)
    }
}

/// Consistent catalog + roster pair read once before a run.
///
/// Nothing in the planner refreshes a snapshot. Callers check
/// [`Snapshot::is_stale`] and fetch a new one from a provider when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub catalog: BTreeMap<UnitId, UnitDefinition>,
    pub members: Vec<Member>,
}

impl Snapshot {
    pub fn new(fetched_at: DateTime<Utc>, units: Vec<UnitDefinition>, members: Vec<Member>) -> Self {
        let catalog = units.into_iter().map(|u| (u.id.clone(), u)).collect();
        Snapshot {
            fetched_at,
            catalog,
            members,
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at > ttl
    }

    pub fn unit(&self, unit_id: &str) -> Option<&UnitDefinition> {
        self.catalog.get(unit_id)
    }

    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    /// Every owned copy of `unit_id`, in roster order
    pub fn owners_of<'a>(&'a self, unit_id: &'a str) -> impl Iterator<Item = &'a UnitInstance> + 'a {
        self.members.iter().filter_map(move |m| m.owned(unit_id))
    }
}

/// `member -> unit -> excluded`, authored by officers
pub type ExclusionMap = BTreeMap<MemberId, BTreeMap<UnitId, bool>>;

/// Members who sit out the current phase
pub type UnavailableSet = BTreeSet<MemberId>;

pub fn is_excluded(exclusions: &ExclusionMap, member_id: &str, unit_id: &str) -> bool {
    exclusions
        .get(member_id)
        .and_then(|units| units.get(unit_id))
        .copied()
        .unwrap_or(false)
}
