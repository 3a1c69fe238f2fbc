mod analysis;
mod common;
mod report;
mod workbook;

use analysis::condition::ConditionError;
use analysis::reading_level::ReadingLevelError;
use analysis::{run_condition_analysis, run_reading_level_analysis};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Input workbook with the filtered experiment samples
const INPUT_WORKBOOK: &str = "MuestrasAplicandoFiltradoInterIntraGrupo.xlsx";

/// Sheet with the control cohort
const CONTROL_SHEET: &str = "KRUSKALL-WALLIS-CE1";

/// Sheet with the experimental cohort
const EXPERIMENTAL_SHEET: &str = "KRUSKALL-WALLIS-CE2";

/// Sheets the condition analysis walks, in report order
const CONDITION_SHEETS: &[&str] = &[CONTROL_SHEET, EXPERIMENTAL_SHEET];

/// Pre-test reading level column
const LEVEL_COLUMN: &str = "NivelLectura-Pretest";

/// Post-test score column
const SCORE_COLUMN: &str = "Puntaje_Postest";

/// Experimental condition column
const CONDITION_COLUMN: &str = "Grupo";

const LEVEL_REPORT_FILE: &str = "Reporte_KruskalWallis_Resultados.xlsx";
const LEVEL_RESULTS_JSON: &str = "Reporte_KruskalWallis_Resultados.json";
const CONDITION_REPORT_FILE: &str = "Reporte_KruskalWallis_Condiciones.xlsx";
const CONDITION_RESULTS_JSON: &str = "Reporte_KruskalWallis_Condiciones.json";

/// Errors that can occur during analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Reading level analysis error: {0}")]
    ReadingLevel(#[from] ReadingLevelError),

    #[error("Condition analysis error: {0}")]
    Condition(#[from] ConditionError),
}

type Result<T> = core::result::Result<T, AnalysisError>;

fn main() -> Result<()> {
    let input_file = PathBuf::from(INPUT_WORKBOOK);

    // Check if input file exists
    if !input_file.exists() {
        eprintln!("Error: Input file does not exist: {}", input_file.display());
        std::process::exit(1);
    }

    // Reports and charts land next to the input workbook
    let output_dir = Path::new(".");

    run_reading_level_analysis(&input_file, output_dir)?;
    run_condition_analysis(&input_file, output_dir)?;

    println!("✅ Analysis complete");
    Ok(())
}
