pub mod types;
pub mod event;
pub mod demand;
pub mod eligibility;
pub mod engine;
pub mod readiness;
pub mod phase;

pub use types::{PlatoonKey, SlotKey, SlotRow, Territory, TerritoryKind};
pub use event::{EventType, RarityRule};
pub use demand::{prepare_phase, PlanMode};
pub use engine::{AssignmentEngine, AssignmentResult, AssignmentSettings, Donor, Highlight};
pub use readiness::{guild_readiness, GuildReadiness, ReadinessRow, Requirement};
pub use phase::current_phase;
