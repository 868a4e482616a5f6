//! Option-specific machinery (spec.md §4.8, §6): OCC symbol formatting,
//! the multi-leg package engine, and per-bar auto-exit evaluation.

mod auto_exit;
mod occ;
mod package_engine;

pub use auto_exit::{evaluate_auto_exit, AutoExitDecision};
pub use occ::{format_occ_symbol, parse_occ_symbol};
pub use package_engine::{mark_unrealized_pnl, PackageEngine, PackageOpenOutcome};
