//! Scheduler: effective configuration, shared mutable state (`Context`),
//! inter-bar pacing, and the replay/live driver loop (spec.md §4.1, §5).

pub mod clock;
pub mod config;
pub mod context;
pub mod runner;
pub mod status;

pub use clock::{Clock, NoopSleeper, RealSleeper, Sleeper};
pub use config::EngineConfig;
pub use context::{Context, KillSwitch};
pub use runner::{run, run_with_agents};
pub use status::{LiveStatus, RunOutcome, StopReason};
