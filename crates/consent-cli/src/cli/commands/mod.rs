//! CLI command handlers.

pub mod config;
pub mod records;
pub mod run;
pub mod sites;
