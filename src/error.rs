//! Error types for the planner.
//!
//! Only a missing or unreadable snapshot aborts a run. Scarcity is reported
//! through flags on the assignment result and never shows up here.

/// Errors that can occur while loading inputs or running a phase.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// The catalog or roster snapshot could not be obtained at all.
    #[error("roster data unavailable: {0}")]
    DataUnavailable(String),

    /// A grid file could not be parsed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An ownership cell did not match `{rarity}*L{level}G{gear}P{power}`.
    #[error("malformed ownership cell: {0:?}")]
    MalformedOwnership(String),

    /// A required configuration value is absent.
    #[error("configuration value missing: {0}")]
    ConfigurationMissing(&'static str),

    /// The configured event name is not one of the supported variants.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
