use serde::{Deserialize, Serialize};

use crate::roster::types::{
    is_excluded, ExclusionMap, MemberId, Snapshot, UnavailableSet, UnitDefinition, UnitId,
    UnitInstance,
};
use super::event::RarityRule;

/// A (unit, member) pair that currently passes the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub unit_id: UnitId,
    pub member_id: MemberId,
    pub power: u64,
}

/// Decides who may donate a unit in the current phase.
///
/// Holds only borrowed, read-only inputs; every call recomputes from them.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter<'a> {
    pub exclusions: &'a ExclusionMap,
    pub unavailable: &'a UnavailableSet,
    /// Alignment or category tag the unit must carry, `None` for no constraint
    pub required_tag: Option<&'a str>,
    pub rule: RarityRule,
    pub phase: u8,
}

impl<'a> EligibilityFilter<'a> {
    pub fn admits(&self, definition: Option<&UnitDefinition>, instance: &UnitInstance) -> bool {
        if !self.rule.admits(instance.rarity, self.phase) {
            return false;
        }
        if let Some(tag) = self.required_tag.filter(|t| !t.is_empty()) {
            // An uncatalogued unit cannot prove it carries the tag
            if !definition.is_some_and(|d| d.has_tag(tag)) {
                return false;
            }
        }
        !is_excluded(self.exclusions, &instance.owner_id, &instance.unit_id)
            && !self.unavailable.contains(&instance.owner_id)
    }

    /// Eligible donors for `unit_id`, weakest copy first.
    ///
    /// Equal power falls back to member id so the order never depends on
    /// roster order.
    pub fn donors(&self, unit_id: &str, snapshot: &Snapshot) -> Vec<EligibilityRecord> {
        let definition = snapshot.unit(unit_id);
        let mut records: Vec<EligibilityRecord> = snapshot
            .owners_of(unit_id)
            .filter(|instance| self.admits(definition, instance))
            .map(|instance| EligibilityRecord {
                unit_id: instance.unit_id.clone(),
                member_id: instance.owner_id.clone(),
                power: instance.power,
            })
            .collect();
        records.sort_by(|a, b| a.power.cmp(&b.power).then_with(|| a.member_id.cmp(&b.member_id)));
        records
    }
}
