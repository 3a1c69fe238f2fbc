//! Result assembly and export
//!
//! One [`TestResult`] per comparison, in the order the comparisons ran.
//! The same ordered collection feeds three outputs: the console ASCII
//! table, the `.xlsx` report and a JSON sidecar with the raw numbers.

use crate::common::stats::{Decision, KruskalWallis};
use crate::workbook::{write_sheet, Cell, WorkbookError};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};
use thiserror::Error;

/// Errors that can occur while exporting results
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report workbook: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("Failed to write results file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = core::result::Result<T, ReportError>;

/// Sample size of one group that entered a comparison
#[derive(Debug, Clone, Serialize)]
pub struct GroupSize {
    pub name: String,
    pub size: usize,
}

/// One comparison's complete outcome, computed once and never mutated
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Reading level or sheet name the comparison belongs to
    pub label: String,
    pub groups: Vec<GroupSize>,
    #[serde(flatten)]
    pub test: KruskalWallis,
}

/// The textual conclusion carried into the report
pub fn conclusion_text(decision: Decision) -> &'static str {
    match decision {
        Decision::Reject => "Rechazamos H0: diferencia significativa entre grupos.",
        Decision::FailToReject => {
            "No se rechaza H0: no hay diferencia significativa entre grupos."
        }
        Decision::InsufficientGroups => "No computado: grupos insuficientes para la prueba.",
    }
}

fn format_statistic(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.4}", value)
    }
}

fn format_degrees(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.0}", value)
    }
}

fn group_size(result: &TestResult, index: usize) -> usize {
    result.groups.get(index).map(|g| g.size).unwrap_or(0)
}

fn group_summary(result: &TestResult) -> String {
    result
        .groups
        .iter()
        .map(|g| format!("{}={}", g.name, g.size))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Console/report row for the reading-level comparison
#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "Nivel de Lectura")]
    level: String,
    #[tabled(rename = "N Control")]
    n_control: usize,
    #[tabled(rename = "N Experimental")]
    n_experimental: usize,
    #[tabled(rename = "Estadístico H")]
    h: String,
    #[tabled(rename = "Valor crítico")]
    critical_value: String,
    #[tabled(rename = "Valor p")]
    p_value: String,
    #[tabled(rename = "Resultado")]
    conclusion: String,
}

/// Console/report row for the per-sheet condition comparison
#[derive(Tabled)]
struct ConditionRow {
    #[tabled(rename = "Hoja")]
    sheet: String,
    #[tabled(rename = "Grupos")]
    groups: String,
    #[tabled(rename = "Estadístico H")]
    h: String,
    #[tabled(rename = "Grados de Libertad")]
    degrees_of_freedom: String,
    #[tabled(rename = "Valor crítico")]
    critical_value: String,
    #[tabled(rename = "Valor p")]
    p_value: String,
    #[tabled(rename = "Resultado")]
    conclusion: String,
}

fn level_row(result: &TestResult) -> LevelRow {
    LevelRow {
        level: result.label.clone(),
        n_control: group_size(result, 0),
        n_experimental: group_size(result, 1),
        h: format_statistic(result.test.h),
        critical_value: format_statistic(result.test.critical_value),
        p_value: format_statistic(result.test.p_value),
        conclusion: conclusion_text(result.test.decision).to_string(),
    }
}

fn condition_row(result: &TestResult) -> ConditionRow {
    ConditionRow {
        sheet: result.label.clone(),
        groups: group_summary(result),
        h: format_statistic(result.test.h),
        degrees_of_freedom: format_degrees(result.test.degrees_of_freedom),
        critical_value: format_statistic(result.test.critical_value),
        p_value: format_statistic(result.test.p_value),
        conclusion: conclusion_text(result.test.decision).to_string(),
    }
}

/// Formats the reading-level results as an ASCII table
pub fn format_level_table(results: &[TestResult]) -> String {
    Table::new(results.iter().map(level_row)).to_string()
}

/// Formats the condition results as an ASCII table
pub fn format_condition_table(results: &[TestResult]) -> String {
    Table::new(results.iter().map(condition_row)).to_string()
}

/// NaN becomes a text marker: spreadsheet numeric cells cannot hold NaN
fn number_cell(value: f64) -> Cell {
    if value.is_nan() {
        Cell::Text("NA".to_string())
    } else {
        Cell::Number(value)
    }
}

/// Writes the reading-level report workbook, replacing any previous file
pub fn write_level_report(path: &Path, results: &[TestResult]) -> Result<()> {
    let mut rows = vec![header_row(&[
        "Nivel de Lectura",
        "N Control",
        "N Experimental",
        "Estadístico H",
        "Valor crítico",
        "Valor p",
        "Resultado",
    ])];
    for result in results {
        rows.push(vec![
            Cell::Text(result.label.clone()),
            Cell::Number(group_size(result, 0) as f64),
            Cell::Number(group_size(result, 1) as f64),
            number_cell(result.test.h),
            number_cell(result.test.critical_value),
            number_cell(result.test.p_value),
            Cell::Text(conclusion_text(result.test.decision).to_string()),
        ]);
    }
    write_sheet(path, "Resultados", &rows)?;
    Ok(())
}

/// Writes the condition report workbook, replacing any previous file
pub fn write_condition_report(path: &Path, results: &[TestResult]) -> Result<()> {
    let mut rows = vec![header_row(&[
        "Hoja",
        "Grupos",
        "Estadístico H",
        "Grados de Libertad",
        "Valor crítico",
        "Valor p",
        "Resultado",
    ])];
    for result in results {
        rows.push(vec![
            Cell::Text(result.label.clone()),
            Cell::Text(group_summary(result)),
            number_cell(result.test.h),
            number_cell(result.test.degrees_of_freedom),
            number_cell(result.test.critical_value),
            number_cell(result.test.p_value),
            Cell::Text(conclusion_text(result.test.decision).to_string()),
        ]);
    }
    write_sheet(path, "Resultados", &rows)?;
    Ok(())
}

fn header_row(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::Text(n.to_string())).collect()
}

/// Saves the raw results as pretty-printed JSON next to the workbook report
pub fn save_results_json(path: &Path, results: &[TestResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::stats::{insufficient_groups, kruskal_wallis};
    use crate::workbook::load_sheet;

    fn sample_results() -> Vec<TestResult> {
        let control = [1.0, 2.0, 3.0];
        let experimental = [10.0, 11.0, 12.0];
        vec![
            TestResult {
                label: "Inicial".to_string(),
                groups: vec![
                    GroupSize { name: "Control".to_string(), size: 3 },
                    GroupSize { name: "Experimental".to_string(), size: 3 },
                ],
                test: kruskal_wallis(&[&control, &experimental]).unwrap(),
            },
            TestResult {
                label: "Medio".to_string(),
                groups: vec![
                    GroupSize { name: "Control".to_string(), size: 0 },
                    GroupSize { name: "Experimental".to_string(), size: 4 },
                ],
                test: insufficient_groups(),
            },
        ]
    }

    #[test]
    fn test_conclusion_text() {
        assert!(conclusion_text(Decision::Reject).starts_with("Rechazamos H0"));
        assert!(conclusion_text(Decision::FailToReject).starts_with("No se rechaza H0"));
        assert!(conclusion_text(Decision::InsufficientGroups).starts_with("No computado"));
    }

    #[test]
    fn test_level_table_contains_columns_and_markers() {
        let table = format_level_table(&sample_results());

        assert!(table.contains("Nivel de Lectura"));
        assert!(table.contains("N Control"));
        assert!(table.contains("Inicial"));
        assert!(table.contains("Rechazamos H0"));
        // Insufficient-group rows show NA, never NaN
        assert!(table.contains("NA"));
        assert!(!table.contains("NaN"));
    }

    #[test]
    fn test_level_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reporte_KruskalWallis_Resultados.xlsx");
        let results = sample_results();

        write_level_report(&path, &results).unwrap();
        let sheet = load_sheet(&path, "Resultados").unwrap();

        // Header plus one row per comparison
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0][0], Cell::Text("Nivel de Lectura".to_string()));
        assert_eq!(sheet.rows[1][0], Cell::Text("Inicial".to_string()));
        assert_eq!(sheet.rows[1][1], Cell::Number(3.0));
        // The marker row keeps its NA text cells
        assert_eq!(sheet.rows[2][3], Cell::Text("NA".to_string()));
    }

    #[test]
    fn test_json_sidecar_is_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultados.json");

        save_results_json(&path, &sample_results()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["label"], "Inicial");
        assert_eq!(value[0]["decision"], "Reject");
        // NaN serializes as null in the sidecar
        assert!(value[1]["h"].is_null());
    }
}
