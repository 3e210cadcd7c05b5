//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`runner`] - Instrumented [`StepRunner`](crate::runner::StepRunner)
//!   implementations: `RecordingRunner`, `ScriptedRunner`.
//! - [`config`] - Canonical site configurations.

pub mod config;
pub mod runner;
