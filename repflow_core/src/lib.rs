#![forbid(unsafe_code)]

//! Core domain model and execution engine for Repflow.
//!
//! This crate provides:
//! - Domain types (programs, blocks, sets, steps)
//! - Load progression and the step flattener
//! - Interval phase engines and the session state machine
//! - Events, motivation, summaries
//! - Persistence (WAL, CSV) and configuration

pub mod types;
pub mod error;
pub mod zones;
pub mod progression;
pub mod protocol;
pub mod one_rep_max;
pub mod flatten;
pub mod program;
pub mod catalog;
pub mod session;
pub mod events;
pub mod summary;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use zones::HeartRateZone;
pub use progression::{ClusterPlan, RestPausePlan};
pub use protocol::{CycleDescription, Phase, PhaseEngine, PhaseEvent, PhaseKind};
pub use one_rep_max::{load_one_rep_maxes, NoOneRepMax, OneRepMaxLookup, OneRepMaxTable};
pub use flatten::{flatten, FlattenedProgram};
pub use catalog::{builtin_catalog, builtin_names, get_builtin};
pub use session::{SessionSnapshot, SessionStatus, SetEntry, SetRecord, WorkoutSession};
pub use events::{EventSink, LogSink, Motivator, MotivationSink, MotivationTheme, Notification, SessionEvent};
pub use summary::SessionSummary;
pub use config::{Config, SessionConfig};
pub use wal::{JsonlSink, SummarySink};
