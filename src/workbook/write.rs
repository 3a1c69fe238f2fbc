//! Workbook writing
//!
//! Emits a minimal `.xlsx` container: content types, package relationships,
//! the sheet registry and one worksheet part per sheet. Strings are written
//! inline so no shared string table is needed. The target file is truncated,
//! which makes repeated report runs overwrite rather than append.

use super::{Cell, Result, Sheet};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

/// Convenience wrapper for the one-sheet report case
pub fn write_sheet(path: &Path, sheet_name: &str, rows: &[Vec<Cell>]) -> Result<()> {
    write_workbook(path, &[Sheet::new(sheet_name, rows.to_vec())])
}

/// Writes a workbook with the given sheets, replacing any existing file
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let file = File::create(path)?;
    let mut container = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    container.start_file("[Content_Types].xml", options)?;
    container.write_all(content_types(sheets).as_bytes())?;

    container.start_file("_rels/.rels", options)?;
    container.write_all(PACKAGE_RELS.as_bytes())?;

    container.start_file("xl/workbook.xml", options)?;
    container.write_all(workbook_part(sheets).as_bytes())?;

    container.start_file("xl/_rels/workbook.xml.rels", options)?;
    container.write_all(workbook_rels(sheets).as_bytes())?;

    for (index, sheet) in sheets.iter().enumerate() {
        container.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        container.write_all(&worksheet_part(&sheet.rows)?)?;
    }

    container.finish()?;
    Ok(())
}

fn content_types(sheets: &[Sheet]) -> String {
    let mut xml = String::from(CONTENT_TYPES_HEADER);
    for index in 1..=sheets.len() {
        xml.push_str(&format!(
            "\n<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            index
        ));
    }
    xml.push_str("\n</Types>");
    xml
}

fn workbook_part(sheets: &[Sheet]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>"#,
    );
    for (index, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            "\n<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape(&sheet.name),
            index + 1,
            index + 1
        ));
    }
    xml.push_str("\n</sheets>\n</workbook>");
    xml
}

fn workbook_rels(sheets: &[Sheet]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for index in 1..=sheets.len() {
        xml.push_str(&format!(
            "\n<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            index, index
        ));
    }
    xml.push_str("\n</Relationships>");
    xml
}

/// Builds one worksheet part; empty cells are skipped and recovered from
/// cell references on read
fn worksheet_part(rows: &[Vec<Cell>]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute((
        "xmlns",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    ));
    writer.write_event(Event::Start(worksheet))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_index, row) in rows.iter().enumerate() {
        let mut row_element = BytesStart::new("row");
        let row_number = (row_index + 1).to_string();
        row_element.push_attribute(("r", row_number.as_str()));
        writer.write_event(Event::Start(row_element))?;

        for (column_index, cell) in row.iter().enumerate() {
            let reference = cell_reference(column_index, row_index);
            match cell {
                // Gaps are recovered from cell references on read
                Cell::Empty => continue,
                Cell::Number(value) => {
                    let mut c = BytesStart::new("c");
                    c.push_attribute(("r", reference.as_str()));
                    writer.write_event(Event::Start(c))?;
                    writer.write_event(Event::Start(BytesStart::new("v")))?;
                    writer.write_event(Event::Text(BytesText::new(&format!("{}", value))))?;
                    writer.write_event(Event::End(BytesEnd::new("v")))?;
                    writer.write_event(Event::End(BytesEnd::new("c")))?;
                }
                Cell::Text(text) => {
                    let mut c = BytesStart::new("c");
                    c.push_attribute(("r", reference.as_str()));
                    c.push_attribute(("t", "inlineStr"));
                    writer.write_event(Event::Start(c))?;
                    writer.write_event(Event::Start(BytesStart::new("is")))?;
                    writer.write_event(Event::Start(BytesStart::new("t")))?;
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                    writer.write_event(Event::End(BytesEnd::new("t")))?;
                    writer.write_event(Event::End(BytesEnd::new("is")))?;
                    writer.write_event(Event::End(BytesEnd::new("c")))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

/// Builds a cell reference like `AB12` from 0-based column and row indices
pub(super) fn cell_reference(column: usize, row: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let remainder = (n - 1) % 26;
        letters.push(b'A' + remainder as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}
