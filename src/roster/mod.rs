pub mod types;
pub mod reconcile;
pub mod provider;

pub use types::{ExclusionMap, Member, MemberId, Snapshot, UnavailableSet, UnitDefinition, UnitId, UnitInstance};
pub use reconcile::{display_names, reconcile, RosterChanges};
pub use provider::{fetch_snapshot, CsvDirProvider, JsonProvider, RosterProvider};
