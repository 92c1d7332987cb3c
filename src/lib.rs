pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod notify;
pub mod parser;
pub mod planner;
pub mod platoon;
pub mod roster;
pub mod web;

pub use error::{PlannerError, Result};
