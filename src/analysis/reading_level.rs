//! Reading-level analysis
//!
//! Compares the control cohort against the experimental cohort once per
//! reading level. The two sheets stand in for the two groups directly; the
//! levels tested are the union of the levels present in either sheet,
//! sorted for a deterministic report order.

use crate::analysis::{load_clean, LoadError};
use crate::common::cleaning::CleanRow;
use crate::common::stats::{insufficient_groups, kruskal_wallis, StatsError};
use crate::report::{
    format_level_table, save_results_json, write_level_report, GroupSize, ReportError, TestResult,
};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during the reading-level analysis
#[derive(Error, Debug)]
pub enum ReadingLevelError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

type Result<T> = core::result::Result<T, ReadingLevelError>;

/// Runs the control vs experimental comparison for every reading level
///
/// Levels where fewer than two of the cohorts have observations produce an
/// insufficient-groups marker row instead of being silently skipped. The
/// results are printed, written to the report workbook and mirrored into
/// the JSON sidecar.
pub fn run_reading_level_analysis(workbook: &Path, output_dir: &Path) -> Result<Vec<TestResult>> {
    println!("📖 Control vs experimental by reading level");

    let control = load_clean(
        workbook,
        crate::CONTROL_SHEET,
        crate::LEVEL_COLUMN,
        crate::SCORE_COLUMN,
        true,
    )?;
    let experimental = load_clean(
        workbook,
        crate::EXPERIMENTAL_SHEET,
        crate::LEVEL_COLUMN,
        crate::SCORE_COLUMN,
        true,
    )?;

    let levels: BTreeSet<&str> = control
        .iter()
        .chain(&experimental)
        .map(|row| row.label.as_str())
        .collect();

    let mut results = Vec::new();
    for level in levels {
        let control_scores = scores_for_level(&control, level);
        let experimental_scores = scores_for_level(&experimental, level);

        let test = if !control_scores.is_empty() && !experimental_scores.is_empty() {
            kruskal_wallis(&[&control_scores, &experimental_scores])?
        } else {
            insufficient_groups()
        };

        results.push(TestResult {
            label: level.to_string(),
            groups: vec![
                GroupSize {
                    name: "Control".to_string(),
                    size: control_scores.len(),
                },
                GroupSize {
                    name: "Experimental".to_string(),
                    size: experimental_scores.len(),
                },
            ],
            test,
        });
    }

    println!("{}", format_level_table(&results));

    write_level_report(&output_dir.join(crate::LEVEL_REPORT_FILE), &results)?;
    save_results_json(&output_dir.join(crate::LEVEL_RESULTS_JSON), &results)?;
    println!("   💾 Report written to {}", crate::LEVEL_REPORT_FILE);

    Ok(results)
}

fn scores_for_level(rows: &[CleanRow], level: &str) -> Vec<f64> {
    rows.iter()
        .filter(|row| row.label == level)
        .map(|row| row.score)
        .collect()
}
