//! Effect handlers for the TUI runtime.
//!
//! Handlers perform I/O and return a `UiEvent` describing the outcome; they
//! never touch state. The runtime spawns them and forwards the result to the
//! inbox.

pub mod site;
pub mod sink;

pub use site::watch_site;
pub use sink::save_record;
