use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};

use crate::error::{PlannerError, Result};
use crate::parser::{load_ownership, load_roster, load_units};
use super::types::Snapshot;

/// Source of catalog + roster data. Implementations are interchangeable.
pub trait RosterProvider {
    fn name(&self) -> &'static str;

    fn fetch(&self) -> Result<Snapshot>;
}

/// Reads `units.csv`, `roster.csv` and `ownership.csv` from a directory
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvDirProvider {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl RosterProvider for CsvDirProvider {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn fetch(&self) -> Result<Snapshot> {
        let units = load_units(self.dir.join("units.csv"))?;
        let mut members = load_roster(self.dir.join("roster.csv"))?;
        let owned = load_ownership(self.dir.join("ownership.csv"), &mut members)?;
        info!(
            "Loaded {} units, {} members, {} owned copies from {}",
            units.len(),
            members.len(),
            owned,
            self.dir.display()
        );
        Ok(Snapshot::new(Utc::now(), units, members))
    }
}

/// Reads a serialized [`Snapshot`] document
pub struct JsonProvider {
    path: PathBuf,
}

impl JsonProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonProvider {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RosterProvider for JsonProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    fn fetch(&self) -> Result<Snapshot> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| PlannerError::DataUnavailable(format!("{}: {}", self.path.display(), e)))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;
        Ok(snapshot)
    }
}

/// Tries each provider in turn and returns the first usable snapshot.
///
/// A snapshot without members counts as a failure. When nothing works the
/// run cannot go ahead, so this is the one place a hard error comes from.
pub fn fetch_snapshot(providers: &[&dyn RosterProvider]) -> Result<Snapshot> {
    for provider in providers {
        match provider.fetch() {
            Ok(snapshot) if !snapshot.members.is_empty() => return Ok(snapshot),
            Ok(_) => warn!("Provider {} returned an empty roster", provider.name()),
            Err(err) => warn!("Provider {} failed: {}", provider.name(), err),
        }
    }
    Err(PlannerError::DataUnavailable(
        "no provider returned a roster".to_string(),
    ))
}
