use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::warn;
use serde::Serialize;

use super::types::{Member, MemberId, Snapshot};
use crate::error::Result;

/// Differences between two roster snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterChanges {
    pub added: Vec<MemberId>,
    pub removed: Vec<MemberId>,
    /// Name to show for every current member, unique across the guild
    pub display_names: BTreeMap<MemberId, String>,
}

/// Gives every member a unique display name.
///
/// Names shared by more than one member get the ally code appended,
/// e.g. `"Rex (123456789)"`. Unique names are left alone.
pub fn display_names(members: &[Member]) -> BTreeMap<MemberId, String> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for member in members {
        *seen.entry(member.name.as_str()).or_insert(0) += 1;
    }
    members
        .iter()
        .map(|m| {
            let name = if seen.get(m.name.as_str()).copied().unwrap_or(0) > 1 {
                format!("{} ({})", m.name, m.ally_code)
            } else {
                m.name.clone()
            };
            (m.id.clone(), name)
        })
        .collect()
}

pub fn reconcile(previous: &[Member], current: &[Member]) -> RosterChanges {
    let before: BTreeSet<&str> = previous.iter().map(|m| m.id.as_str()).collect();
    let after: BTreeSet<&str> = current.iter().map(|m| m.id.as_str()).collect();

    let added = current
        .iter()
        .filter(|m| !before.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect();
    let removed = previous
        .iter()
        .filter(|m| !after.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect();

    RosterChanges {
        added,
        removed,
        display_names: display_names(current),
    }
}

/// Compares `snapshot` with the one cached at `cache`, then stores
/// `snapshot` there for the next run.
///
/// Without a readable cache there is nothing to compare against and no
/// joiners or leavers are reported. Only a failed write is an error.
pub fn track_changes(cache: &Path, snapshot: &Snapshot) -> Result<RosterChanges> {
    let previous = std::fs::read_to_string(cache)
        .ok()
        .and_then(|contents| match serde_json::from_str::<Snapshot>(&contents) {
            Ok(previous) => Some(previous.members),
            Err(err) => {
                warn!("Ignoring unreadable {}: {}", cache.display(), err);
                None
            }
        });
    let changes = match previous {
        Some(previous) => reconcile(&previous, &snapshot.members),
        None => RosterChanges {
            display_names: display_names(&snapshot.members),
            ..Default::default()
        },
    };
    std::fs::write(cache, serde_json::to_string_pretty(snapshot)?)?;
    Ok(changes)
}
