//! Domain-specific analysis modules
//!
//! This module contains the two comparisons the tool runs:
//! - Reading-level analysis: control vs experimental cohort per level
//! - Condition analysis: all condition groups within each sheet

pub mod condition;
pub mod reading_level;

// Re-export analysis entry points for convenience
pub use condition::run_condition_analysis;
pub use reading_level::run_reading_level_analysis;

use crate::common::cleaning::{clean_rows, header_index, CleanRow};
use crate::workbook::{load_sheet, WorkbookError};
use std::path::Path;
use thiserror::Error;

/// Errors shared by both analyses while turning a sheet into observations
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("Sheet {sheet:?} has no header row")]
    EmptySheet { sheet: String },

    #[error("Column {column:?} not found in sheet {sheet:?}")]
    MissingColumn { sheet: String, column: String },
}

/// Loads one sheet and cleans it into (label, score) observations
///
/// Reports how many rows survived and how many were dropped; the drop is
/// visible, never silent.
pub(crate) fn load_clean(
    workbook: &Path,
    sheet_name: &str,
    label_column: &str,
    score_column: &str,
    capitalize_labels: bool,
) -> core::result::Result<Vec<CleanRow>, LoadError> {
    let sheet = load_sheet(workbook, sheet_name)?;

    let headers = sheet.rows.first().ok_or_else(|| LoadError::EmptySheet {
        sheet: sheet_name.to_string(),
    })?;
    let label_index =
        header_index(headers, label_column).ok_or_else(|| LoadError::MissingColumn {
            sheet: sheet_name.to_string(),
            column: label_column.to_string(),
        })?;
    let score_index =
        header_index(headers, score_column).ok_or_else(|| LoadError::MissingColumn {
            sheet: sheet_name.to_string(),
            column: score_column.to_string(),
        })?;

    let (rows, dropped) = clean_rows(&sheet.rows[1..], label_index, score_index, capitalize_labels);

    println!("   📄 Sheet {}: {} usable rows", sheet_name, rows.len());
    if dropped > 0 {
        println!(
            "   ⚠️ Dropped {} rows without a numeric score in {}",
            dropped, sheet_name
        );
    }

    Ok(rows)
}
