//! Row cleaning and value coercion
//!
//! Mirrors what the source spreadsheets need before testing: header names
//! arrive with stray whitespace, level labels with inconsistent casing, and
//! score columns with the occasional non-numeric cell. Rows that cannot
//! yield a usable (label, score) pair are dropped and counted; they are
//! never repaired.

use crate::workbook::Cell;

/// A cleaned observation: a group label and its numeric post-test score
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub label: String,
    pub score: f64,
}

/// Finds a column by header name, ignoring surrounding whitespace
pub fn header_index(headers: &[Cell], wanted: &str) -> Option<usize> {
    headers.iter().position(|cell| {
        cell.as_text()
            .map(|text| text.trim() == wanted)
            .unwrap_or(false)
    })
}

/// Normalizes a label the way the source data expects: trimmed, first
/// character uppercased, the rest lowercased
pub fn capitalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

/// Coerces a cell to a finite score, `None` when it cannot be parsed
pub fn coerce_score(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(v) => *v,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        Cell::Empty => return None,
    };
    value.is_finite().then_some(value)
}

/// Cleans data rows into (label, score) observations
///
/// Returns the kept rows and the number of rows dropped because the score
/// was not numeric or the label was blank. Fully empty rows (spreadsheet
/// padding) are skipped without counting.
pub fn clean_rows(
    rows: &[Vec<Cell>],
    label_column: usize,
    score_column: usize,
    capitalize_labels: bool,
) -> (Vec<CleanRow>, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        if row.iter().all(Cell::is_empty) {
            continue;
        }

        let raw_label = row
            .get(label_column)
            .and_then(Cell::as_text)
            .unwrap_or_default();
        let label = if capitalize_labels {
            capitalize_label(&raw_label)
        } else {
            raw_label.trim().to_string()
        };
        let score = row.get(score_column).and_then(coerce_score);

        match score {
            Some(score) if !label.is_empty() => kept.push(CleanRow { label, score }),
            _ => dropped += 1,
        }
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Cell::Number(14.5), Some(14.5))]
    #[case(Cell::Number(0.0), Some(0.0))]
    #[case(Cell::Number(-3.0), Some(-3.0))]
    #[case(Cell::Text(" 12.5 ".to_string()), Some(12.5))]
    #[case(Cell::Text("abc".to_string()), None)]
    #[case(Cell::Text("".to_string()), None)]
    #[case(Cell::Empty, None)]
    fn test_coerce_score(#[case] cell: Cell, #[case] expected: Option<f64>) {
        assert_eq!(coerce_score(&cell), expected);
    }

    #[rstest]
    #[case("  inicial  ", "Inicial")]
    #[case("MEDIO", "Medio")]
    #[case("avanzado", "Avanzado")]
    #[case("", "")]
    #[case("   ", "")]
    fn test_capitalize_label(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(capitalize_label(raw), expected);
    }

    #[test]
    fn test_header_index_ignores_whitespace() {
        let headers = vec![
            Cell::Text(" NivelLectura-Pretest ".to_string()),
            Cell::Text("Puntaje_Postest".to_string()),
        ];
        assert_eq!(header_index(&headers, "NivelLectura-Pretest"), Some(0));
        assert_eq!(header_index(&headers, "Puntaje_Postest"), Some(1));
        assert_eq!(header_index(&headers, "Grupo"), None);
    }

    #[test]
    fn test_clean_rows_drops_exactly_the_bad_rows() {
        let rows = vec![
            vec![Cell::Text("inicial".to_string()), Cell::Number(10.0)],
            vec![Cell::Text("medio".to_string()), Cell::Text("ausente".to_string())],
            vec![Cell::Text("medio".to_string()), Cell::Number(0.0)],
            vec![Cell::Text("avanzado".to_string()), Cell::Empty],
            vec![Cell::Text("AVANZADO".to_string()), Cell::Number(-2.0)],
            // blank padding row, skipped without counting
            vec![Cell::Empty, Cell::Empty],
            // blank label, counted as dropped
            vec![Cell::Empty, Cell::Number(5.0)],
        ];

        let (kept, dropped) = clean_rows(&rows, 0, 1, true);

        assert_eq!(dropped, 3);
        assert_eq!(
            kept,
            vec![
                CleanRow { label: "Inicial".to_string(), score: 10.0 },
                CleanRow { label: "Medio".to_string(), score: 0.0 },
                CleanRow { label: "Avanzado".to_string(), score: -2.0 },
            ]
        );
    }

    #[test]
    fn test_clean_rows_without_capitalization_keeps_case() {
        let rows = vec![vec![Cell::Text("  GrupoA ".to_string()), Cell::Number(1.0)]];
        let (kept, dropped) = clean_rows(&rows, 0, 1, false);
        assert_eq!(dropped, 0);
        assert_eq!(kept[0].label, "GrupoA");
    }
}
