//! Core consent-study library (session state machine, config, sinks, launcher).

pub mod config;
pub mod launcher;
pub mod logging;
pub mod sink;
pub mod study;
