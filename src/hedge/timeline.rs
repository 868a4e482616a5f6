//! Per-package hedge timeline: one row per evaluation, exportable as a
//! human-readable table (spec.md §4.9, §6).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::data::HedgeTimelineRow;

#[derive(Debug, Default)]
pub struct HedgeTimeline {
    rows: Vec<HedgeTimelineRow>,
}

impl HedgeTimeline {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(&mut self, row: HedgeTimelineRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[HedgeTimelineRow] {
        &self.rows
    }

    /// Writes `phase1_results/{run_label}/{run_id}/{package_id}_timeline.txt`
    /// under `base_dir`, returning the path written.
    pub fn export(&self, base_dir: &Path, run_label: &str, run_id: &str, package_id: &str) -> io::Result<PathBuf> {
        let dir = base_dir.join("phase1_results").join(run_label).join(run_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{package_id}_timeline.txt"));
        let mut file = fs::File::create(&path)?;

        writeln!(
            file,
            "{:<6}{:<26}{:>12}{:>14}{:>14}{:>12}{:>12}{:>12}{:>12}  {}",
            "bar", "ts", "underlying", "net_opt_delta", "hedge_shares", "total_delta", "opt_pnl", "hedge_pnl", "total_pnl", "note"
        )?;
        for row in &self.rows {
            writeln!(
                file,
                "{:<6}{:<26}{:>12.2}{:>14.4}{:>14.2}{:>12.4}{:>12.2}{:>12.2}{:>12.2}  {}",
                row.bar_index,
                row.ts.to_rfc3339(),
                row.underlying_price,
                row.net_options_delta,
                row.hedge_shares,
                row.total_delta,
                row.options_pnl,
                row.hedge_pnl,
                row.total_pnl,
                row.note,
            )?;
        }
        Ok(path)
    }
}
