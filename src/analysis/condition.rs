//! Condition analysis
//!
//! For each configured sheet, partitions the rows by the condition column
//! and runs one Kruskal-Wallis test across all non-empty condition groups.
//! Every valid result additionally gets a chi-squared decision chart named
//! after its sheet.

use crate::analysis::{load_clean, LoadError};
use crate::common::cleaning::CleanRow;
use crate::common::plots::{create_decision_plot, plot_file_name, PlotError};
use crate::common::stats::{kruskal_wallis, StatsError};
use crate::report::{
    format_condition_table, save_results_json, write_condition_report, GroupSize, ReportError,
    TestResult,
};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during the condition analysis
#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

type Result<T> = core::result::Result<T, ConditionError>;

/// Runs the per-sheet condition comparison and renders decision charts
///
/// Sheets whose test could not run (fewer than two non-empty condition
/// groups) keep their marker row in the report; only the chart is skipped,
/// with a console notice.
pub fn run_condition_analysis(workbook: &Path, output_dir: &Path) -> Result<Vec<TestResult>> {
    println!("🧪 Condition comparison per sheet");

    let mut results = Vec::new();
    for sheet_name in crate::CONDITION_SHEETS {
        let rows = load_clean(
            workbook,
            sheet_name,
            crate::CONDITION_COLUMN,
            crate::SCORE_COLUMN,
            false,
        )?;
        let result = compare_conditions(sheet_name, &rows)?;

        if result.test.is_computed() {
            let output_path = output_dir.join(plot_file_name(sheet_name));
            create_decision_plot(
                &result.test,
                &format!("Prueba de Kruskal-Wallis: {}", sheet_name),
                &output_path,
            )?;
            println!("   📈 Chart written to {}", output_path.display());
        } else {
            println!(
                "   ⚠️ Skipping chart for {}: test not computed",
                sheet_name
            );
        }

        results.push(result);
    }

    println!("{}", format_condition_table(&results));

    write_condition_report(&output_dir.join(crate::CONDITION_REPORT_FILE), &results)?;
    save_results_json(&output_dir.join(crate::CONDITION_RESULTS_JSON), &results)?;
    println!("   💾 Report written to {}", crate::CONDITION_REPORT_FILE);

    Ok(results)
}

/// Groups one sheet's rows by condition label and tests across the groups
///
/// Group order is the sorted label order, so sample sizes and the report
/// stay deterministic between runs.
fn compare_conditions(sheet_name: &str, rows: &[CleanRow]) -> Result<TestResult> {
    let mut by_label: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        by_label.entry(row.label.as_str()).or_default().push(row.score);
    }

    let slices: Vec<&[f64]> = by_label.values().map(Vec::as_slice).collect();
    let test = kruskal_wallis(&slices)?;

    Ok(TestResult {
        label: sheet_name.to_string(),
        groups: by_label
            .iter()
            .map(|(name, scores)| GroupSize {
                name: name.to_string(),
                size: scores.len(),
            })
            .collect(),
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::stats::Decision;
    use crate::workbook::{write_workbook, Cell, Sheet};

    fn condition_sheet(name: &str, rows: &[(&str, f64)]) -> Sheet {
        let mut cells = vec![vec![
            Cell::Text(crate::CONDITION_COLUMN.to_string()),
            Cell::Text(crate::SCORE_COLUMN.to_string()),
        ]];
        for (group, score) in rows {
            cells.push(vec![
                Cell::Text(group.to_string()),
                Cell::Number(*score),
            ]);
        }
        Sheet::new(name, cells)
    }

    #[test]
    fn test_three_conditions_in_one_sheet() {
        let rows = vec![
            CleanRow { label: "A".to_string(), score: 1.0 },
            CleanRow { label: "A".to_string(), score: 2.0 },
            CleanRow { label: "A".to_string(), score: 3.0 },
            CleanRow { label: "B".to_string(), score: 4.0 },
            CleanRow { label: "B".to_string(), score: 5.0 },
            CleanRow { label: "B".to_string(), score: 6.0 },
            CleanRow { label: "C".to_string(), score: 7.0 },
            CleanRow { label: "C".to_string(), score: 8.0 },
            CleanRow { label: "C".to_string(), score: 9.0 },
        ];

        let result = compare_conditions("HOJA", &rows).unwrap();

        assert_eq!(result.test.degrees_of_freedom, 2.0);
        assert_eq!(result.test.decision, Decision::Reject);
        assert_eq!(
            result.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_single_condition_yields_marker() {
        let rows = vec![
            CleanRow { label: "A".to_string(), score: 1.0 },
            CleanRow { label: "A".to_string(), score: 2.0 },
        ];

        let result = compare_conditions("HOJA", &rows).unwrap();
        assert_eq!(result.test.decision, Decision::InsufficientGroups);
        assert!(!result.test.is_computed());
    }

    #[test]
    fn test_run_writes_report_and_charts() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = dir.path().join("muestras.xlsx");

        let sheets: Vec<Sheet> = crate::CONDITION_SHEETS
            .iter()
            .map(|name| {
                condition_sheet(
                    name,
                    &[
                        ("grupo1", 1.0),
                        ("grupo1", 2.0),
                        ("grupo1", 3.0),
                        ("grupo2", 10.0),
                        ("grupo2", 11.0),
                        ("grupo2", 12.0),
                    ],
                )
            })
            .collect();
        write_workbook(&workbook, &sheets).unwrap();

        let results = run_condition_analysis(&workbook, dir.path()).unwrap();

        assert_eq!(results.len(), crate::CONDITION_SHEETS.len());
        for (sheet_name, result) in crate::CONDITION_SHEETS.iter().zip(&results) {
            assert_eq!(result.test.decision, Decision::Reject);
            assert!(dir.path().join(plot_file_name(sheet_name)).exists());
        }
        assert!(dir.path().join(crate::CONDITION_REPORT_FILE).exists());
        assert!(dir.path().join(crate::CONDITION_RESULTS_JSON).exists());
    }
}
