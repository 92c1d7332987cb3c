//! Planner configuration.
//!
//! Read from `config.json` next to the grid files. Every field is optional:
//! a missing file or value falls back to the defaults below and logs a
//! warning instead of failing the run. Only the event type and the phase
//! have no sensible default; features that need them are skipped.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::platoon::engine::{AssignmentSettings, DEFAULT_MAX_DONATIONS_PER_TERRITORY, DEFAULT_RARE_MARGIN};
use crate::platoon::event::{EventType, RarityRule};
use crate::platoon::phase::current_phase;

pub const DEFAULT_CACHE_TTL_HOURS: i64 = 6;
pub const DEFAULT_PHASE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Event name as typed in the grid (`hoth_light`, `Geo DS`, ...)
    #[serde(default)]
    pub event: Option<String>,

    /// Explicit phase; wins over the phase derived from `event_start`
    #[serde(default)]
    pub phase: Option<u8>,

    #[serde(default)]
    pub event_start: Option<DateTime<Utc>>,

    #[serde(default = "default_phase_hours")]
    pub phase_hours: i64,

    #[serde(default = "default_max_donations")]
    pub max_donations_per_territory: u32,

    #[serde(default = "default_rare_margin")]
    pub rare_margin: u32,

    /// Overrides the event's rarity rule with a flat minimum
    #[serde(default)]
    pub rarity_threshold: Option<u8>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: i64,

    /// Destination for the phase notice; notification is skipped without it
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_true")]
    pub readiness_enabled: bool,
}

fn default_phase_hours() -> i64 {
    DEFAULT_PHASE_HOURS
}

fn default_max_donations() -> u32 {
    DEFAULT_MAX_DONATIONS_PER_TERRITORY
}

fn default_rare_margin() -> u32 {
    DEFAULT_RARE_MARGIN
}

fn default_cache_ttl() -> i64 {
    DEFAULT_CACHE_TTL_HOURS
}

fn default_true() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            event: None,
            phase: None,
            event_start: None,
            phase_hours: DEFAULT_PHASE_HOURS,
            max_donations_per_territory: DEFAULT_MAX_DONATIONS_PER_TERRITORY,
            rare_margin: DEFAULT_RARE_MARGIN,
            rarity_threshold: None,
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            webhook_url: None,
            readiness_enabled: true,
        }
    }
}

impl PlannerConfig {
    /// Loads `path`, or the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Io`] if the file exists but cannot be read and
    /// [`PlannerError::Json`] if it is not valid JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn event_type(&self) -> Result<EventType> {
        self.event
            .as_deref()
            .ok_or(PlannerError::ConfigurationMissing("event"))?
            .parse()
    }

    pub fn phase_duration(&self) -> Duration {
        hours_or_default("phase_hours", self.phase_hours, DEFAULT_PHASE_HOURS)
    }

    /// Explicit phase first, then the phase in progress at `now`.
    pub fn resolve_phase(&self, event: EventType, now: DateTime<Utc>) -> Result<u8> {
        if let Some(phase) = self.phase {
            return Ok(phase);
        }
        let start = self
            .event_start
            .ok_or(PlannerError::ConfigurationMissing("phase"))?;
        current_phase(start, now, self.phase_duration(), event.phase_count())
            .ok_or(PlannerError::ConfigurationMissing("phase"))
    }

    pub fn settings(&self) -> AssignmentSettings {
        AssignmentSettings {
            max_donations_per_territory: self.max_donations_per_territory,
            rare_margin: self.rare_margin,
        }
    }

    pub fn rarity_override(&self) -> Option<RarityRule> {
        self.rarity_threshold.map(RarityRule::Fixed)
    }

    pub fn cache_ttl(&self) -> Duration {
        hours_or_default("cache_ttl_hours", self.cache_ttl_hours, DEFAULT_CACHE_TTL_HOURS)
    }
}

/// Hours as a duration; non-positive or out-of-range values fall back
fn hours_or_default(name: &str, hours: i64, default: i64) -> Duration {
    match Duration::try_hours(hours).filter(|_| hours > 0) {
        Some(duration) => duration,
        None => {
            warn!("{} = {} is out of range, using {}", name, hours, default);
            Duration::hours(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_document_takes_defaults() {
        let config = PlannerConfig::parse("{}").unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.settings().max_donations_per_territory, 10);
        assert_eq!(config.settings().rare_margin, 3);
        assert!(config.readiness_enabled);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig::load(dir.path().join("config.json")).unwrap();
        assert_eq!(config.cache_ttl(), Duration::hours(6));
    }

    #[test]
    fn missing_event_reports_configuration_missing() {
        let config = PlannerConfig::default();
        assert!(matches!(
            config.event_type(),
            Err(PlannerError::ConfigurationMissing("event"))
        ));
    }

    #[test]
    fn phase_comes_from_event_start_when_not_given() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let config = PlannerConfig::parse(
            r#"{"event": "hoth_dark", "event_start": "2024-05-01T18:00:00Z", "phase_hours": 24}"#,
        )
        .unwrap();
        let event = config.event_type().unwrap();
        assert_eq!(config.resolve_phase(event, start + Duration::hours(50)).unwrap(), 3);

        let explicit = PlannerConfig { phase: Some(5), ..config.clone() };
        assert_eq!(explicit.resolve_phase(event, start).unwrap(), 5);

        assert!(config.resolve_phase(event, start + Duration::days(30)).is_err());
    }

    #[test]
    fn out_of_range_hours_fall_back_to_defaults() {
        let config = PlannerConfig::parse(
            r#"{"event": "hoth_dark", "event_start": "2024-05-01T18:00:00Z",
                "phase_hours": 9223372036854775807, "cache_ttl_hours": -4}"#,
        )
        .unwrap();
        assert_eq!(config.phase_duration(), Duration::hours(DEFAULT_PHASE_HOURS));
        assert_eq!(config.cache_ttl(), Duration::hours(DEFAULT_CACHE_TTL_HOURS));

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let event = config.event_type().unwrap();
        assert_eq!(config.resolve_phase(event, start + Duration::hours(30)).unwrap(), 2);
    }

    #[test]
    fn rarity_threshold_becomes_fixed_rule() {
        let config = PlannerConfig::parse(r#"{"rarity_threshold": 6}"#).unwrap();
        assert_eq!(config.rarity_override(), Some(RarityRule::Fixed(6)));
    }
}
