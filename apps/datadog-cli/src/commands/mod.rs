//! CLI command implementations

pub mod health;
pub mod query;
