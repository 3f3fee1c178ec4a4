//! `pm-exec` — Serialized task execution for the playmix compositing core.
//!
//! Provides the single-threaded, bounded-queue [`Executor`] that both the
//! input pump and the mixer device funnel their work through. Parallelism
//! exists *between* subsystems; within a subsystem every mutation runs on
//! its executor's worker thread.

pub mod error;
pub mod executor;

pub use error::ExecError;
pub use executor::{Executor, Spawner};
