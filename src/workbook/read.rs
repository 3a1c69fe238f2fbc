//! Workbook loading
//!
//! Resolves a sheet name through `xl/workbook.xml` and its relationship
//! part, then parses the sheet's cell grid with shared-string and
//! inline-string resolution. Only the cell shapes that actually occur in
//! score spreadsheets are handled; formula text and style data are ignored.

use super::{Cell, Result, Sheet, WorkbookError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read as IoRead;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Load one named sheet from an `.xlsx` workbook
///
/// # Arguments
/// * `path` - Workbook file path
/// * `sheet_name` - Exact display name of the sheet to load
///
/// # Returns
/// * `Ok(Sheet)` - Rows of typed cells, gaps padded with [`Cell::Empty`]
/// * `Err(WorkbookError)` - If the file, container, XML or sheet is bad
pub fn load_sheet(path: &Path, sheet_name: &str) -> Result<Sheet> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let sheet_part = resolve_sheet_part(&mut archive, sheet_name)?;

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| WorkbookError::SheetNotFound(sheet_name.to_string()))?;
    let rows = parse_sheet(&sheet_xml, &shared_strings)?;

    Ok(Sheet::new(sheet_name, rows))
}

/// Reads a zip entry into a string, mapping a missing entry to `None`
fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(Some(content))
}

/// Maps a sheet display name to its part path inside the container
///
/// `xl/workbook.xml` links each sheet name to a relationship id, and
/// `xl/_rels/workbook.xml.rels` links that id to the worksheet part.
fn resolve_sheet_part(archive: &mut ZipArchive<File>, sheet_name: &str) -> Result<String> {
    let workbook_xml = read_part(archive, "xl/workbook.xml")?
        .ok_or_else(|| WorkbookError::SheetNotFound(sheet_name.to_string()))?;
    let rel_id = sheet_relationship_id(&workbook_xml, sheet_name)?
        .ok_or_else(|| WorkbookError::SheetNotFound(sheet_name.to_string()))?;

    let rels_xml = read_part(archive, "xl/_rels/workbook.xml.rels")?
        .ok_or_else(|| WorkbookError::SheetNotFound(sheet_name.to_string()))?;
    let target = relationship_target(&rels_xml, &rel_id)?
        .ok_or_else(|| WorkbookError::SheetNotFound(sheet_name.to_string()))?;

    // Targets are relative to xl/ unless written as absolute part paths
    if let Some(absolute) = target.strip_prefix('/') {
        Ok(absolute.to_string())
    } else {
        Ok(format!("xl/{}", target))
    }
}

/// Finds the `r:id` of the `<sheet>` element with the given display name
fn sheet_relationship_id(workbook_xml: &str, sheet_name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(attr.unescape_value()?.into_owned()),
                        b"r:id" => rel_id = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if name.as_deref() == Some(sheet_name) {
                    return Ok(rel_id);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Finds the `Target` of the `<Relationship>` element with the given id
fn relationship_target(rels_xml: &str, rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rel_id) {
                    return Ok(target);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parses `xl/sharedStrings.xml` into the ordered string table
///
/// Rich-text entries are flattened: every `<t>` run inside one `<si>` is
/// concatenated into a single table entry.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut table = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::Text(e) if in_t => current.push_str(&e.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"si" => {
                    in_si = false;
                    table.push(std::mem::take(&mut current));
                }
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(table)
}

/// Where text content inside the current cell should be captured
#[derive(PartialEq)]
enum TextTarget {
    None,
    Value,
    InlineString,
}

/// Parses a worksheet part into rows of resolved cells
fn parse_sheet(xml: &str, shared_strings: &[String]) -> Result<Vec<Vec<Cell>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut current_row: Vec<Cell> = Vec::new();
    let mut in_row = false;

    let mut cell_column = 0usize;
    let mut cell_type = String::new();
    let mut cell_text = String::new();
    let mut target = TextTarget::None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"row" => {
                // Pad skipped rows so indices stay aligned with the sheet
                if let Some(r) = attribute_value(&e, b"r")? {
                    if let Ok(number) = r.parse::<usize>() {
                        while rows.len() + 1 < number {
                            rows.push(Vec::new());
                        }
                    }
                }
                current_row = Vec::new();
                in_row = true;
            }
            Event::Start(e) if in_row && e.name().as_ref() == b"c" => {
                cell_column = attribute_value(&e, b"r")?
                    .and_then(|r| parse_cell_reference(&r))
                    .map(|(column, _)| column)
                    .unwrap_or(current_row.len());
                cell_type = attribute_value(&e, b"t")?.unwrap_or_default();
                cell_text.clear();
                target = TextTarget::None;
            }
            Event::Empty(e) if in_row && e.name().as_ref() == b"c" => {
                // Value-less cell, usually style-only
                let column = attribute_value(&e, b"r")?
                    .and_then(|r| parse_cell_reference(&r))
                    .map(|(column, _)| column)
                    .unwrap_or(current_row.len());
                place_cell(&mut current_row, column, Cell::Empty);
            }
            Event::Start(e) => match e.name().as_ref() {
                b"v" => target = TextTarget::Value,
                b"t" => {
                    if target == TextTarget::None {
                        target = TextTarget::InlineString;
                    }
                }
                _ => {}
            },
            Event::Text(e) if target != TextTarget::None => {
                cell_text.push_str(&e.unescape()?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"v" => target = TextTarget::None,
                b"t" if target == TextTarget::InlineString => target = TextTarget::None,
                b"c" if in_row => {
                    let cell = resolve_cell(&cell_type, &cell_text, shared_strings);
                    place_cell(&mut current_row, cell_column, cell);
                }
                b"row" => {
                    rows.push(std::mem::take(&mut current_row));
                    in_row = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

/// Reads one attribute of an element, unescaped
fn attribute_value(
    e: &quick_xml::events::BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Turns the accumulated cell text into a typed cell per the `t` attribute
fn resolve_cell(cell_type: &str, text: &str, shared_strings: &[String]) -> Cell {
    match cell_type {
        "s" => text
            .parse::<usize>()
            .ok()
            .and_then(|index| shared_strings.get(index))
            .map(|s| Cell::Text(s.clone()))
            .unwrap_or(Cell::Empty),
        "inlineStr" => Cell::Text(text.to_string()),
        "str" => Cell::Text(text.to_string()),
        "b" => Cell::Text(if text == "1" { "TRUE" } else { "FALSE" }.to_string()),
        // Error cells carry no usable value
        "e" => Cell::Empty,
        _ => match text.trim().parse::<f64>() {
            Ok(number) => Cell::Number(number),
            Err(_) if text.is_empty() => Cell::Empty,
            Err(_) => Cell::Text(text.to_string()),
        },
    }
}

/// Inserts a cell at its column, padding any gap with empty cells
fn place_cell(row: &mut Vec<Cell>, column: usize, cell: Cell) {
    while row.len() < column {
        row.push(Cell::Empty);
    }
    row.push(cell);
}

/// Splits a cell reference like `AB12` into (column index, row index), 0-based
pub(super) fn parse_cell_reference(reference: &str) -> Option<(usize, usize)> {
    let letters: String = reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &reference[letters.len()..];
    if letters.is_empty() || digits.is_empty() {
        return None;
    }

    let mut column = 0usize;
    for c in letters.chars() {
        column = column * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    let row = digits.parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }

    Some((column - 1, row - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A1", Some((0, 0)))]
    #[case("B7", Some((1, 6)))]
    #[case("Z3", Some((25, 2)))]
    #[case("AA1", Some((26, 0)))]
    #[case("AB12", Some((27, 11)))]
    #[case("12", None)]
    #[case("A0", None)]
    #[case("", None)]
    fn test_parse_cell_reference(#[case] input: &str, #[case] expected: Option<(usize, usize)>) {
        assert_eq!(parse_cell_reference(input), expected);
    }

    #[test]
    fn test_parse_shared_strings_plain_and_rich() {
        let xml = r#"<?xml version="1.0"?>
            <sst><si><t>Inicial</t></si>
            <si><r><t>Me</t></r><r><t>dio</t></r></si>
            <si><t/></si></sst>"#;
        let table = parse_shared_strings(xml).unwrap();
        assert_eq!(table, vec!["Inicial".to_string(), "Medio".to_string(), String::new()]);
    }

    #[test]
    fn test_parse_sheet_mixed_cell_types() {
        let shared = vec!["Inicial".to_string()];
        let xml = r#"<?xml version="1.0"?>
            <worksheet><sheetData>
            <row r="1">
              <c r="A1" t="s"><v>0</v></c>
              <c r="B1"><v>14.5</v></c>
              <c r="D1" t="inlineStr"><is><t>texto</t></is></c>
            </row>
            <row r="3">
              <c r="A3" t="str"><v>calc</v></c>
              <c r="B3" s="2"/>
            </row>
            </sheetData></worksheet>"#;
        let rows = parse_sheet(xml, &shared).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                Cell::Text("Inicial".to_string()),
                Cell::Number(14.5),
                Cell::Empty,
                Cell::Text("texto".to_string()),
            ]
        );
        // Row 2 was skipped in the file
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec![Cell::Text("calc".to_string()), Cell::Empty]);
    }

    #[test]
    fn test_resolve_cell_unparseable_shared_index() {
        assert_eq!(resolve_cell("s", "99", &[]), Cell::Empty);
        assert_eq!(resolve_cell("", "not a number", &[]), Cell::Text("not a number".to_string()));
        assert_eq!(resolve_cell("", "", &[]), Cell::Empty);
    }
}
