//! Spreadsheet workbook access
//!
//! Reading and writing of `.xlsx` workbooks through raw OOXML access: a
//! workbook is a zip container holding XML parts for the sheet registry,
//! the shared string table and the per-sheet cell grid.

pub mod read;
pub mod write;

use thiserror::Error;

// Re-export the operations the analysis code actually calls
pub use read::load_sheet;
pub use write::{write_sheet, write_workbook};

/// Errors that can occur while reading or writing a workbook
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Failed to access workbook file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook container error: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("Malformed workbook XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Sheet not found in workbook: {0}")]
    SheetNotFound(String),
}

type Result<T> = core::result::Result<T, WorkbookError>;

/// A single cell value after type resolution
///
/// The loader resolves shared strings, inline strings and numeric cells into
/// this one shape; everything downstream only distinguishes "number", "text"
/// and "nothing there".
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value stored at this position
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Returns the textual content of the cell, if any
    ///
    /// Numbers are rendered with their shortest decimal representation so a
    /// label column containing `3` reads as `"3"`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(v) => Some(format!("{}", v)),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// One named sheet worth of rows
///
/// Rows are dense within each row vector: gaps in the stored cell grid are
/// padded with [`Cell::Empty`] so column indices line up across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}
