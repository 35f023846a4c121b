//! Shared infrastructure for the UtmGate workspace.
//!
//! Currently this is just the structured logging setup; crates import it
//! so every binary logs the same way.

pub mod logging;
