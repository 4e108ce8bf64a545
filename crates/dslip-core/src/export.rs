//! Minimal single-sheet XLSX writer for tabular reports.

use std::borrow::Cow;
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(value as f64)
    }
}

/// Write a workbook with one sheet: a header row followed by `rows`.
pub fn write_xlsx(sheet_name: &str, header: &[&str], rows: &[Vec<Cell>]) -> Result<Vec<u8>> {
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(&*sheet_title(sheet_name))
    );

    let header_row: Vec<Cell> = header.iter().map(|h| Cell::from(*h)).collect();
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_idx, row) in std::iter::once(&header_row).chain(rows.iter()).enumerate() {
        write_row(&mut sheet, row_idx + 1, row);
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", workbook.as_str()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn write_row(out: &mut String, row_number: usize, cells: &[Cell]) {
    out.push_str(&format!(r#"<row r="{}">"#, row_number));
    for (col, cell) in cells.iter().enumerate() {
        let reference = format!("{}{}", column_name(col), row_number);
        match cell {
            Cell::Text(text) => out.push_str(&format!(
                r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                reference,
                escape(&*xml_safe(text))
            )),
            Cell::Number(value) => {
                out.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value))
            }
            Cell::Empty => {}
        }
    }
    out.push_str("</row>");
}

/// Spreadsheet column letters for a 0-based index: A, B, ..., Z, AA, ...
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Longest sheet name a spreadsheet application accepts.
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Turn a free-form name into a valid sheet name. Characters in `[]:*?/\`
/// and control characters are dropped, the rest is cut to 31 characters.
fn sheet_title(name: &str) -> String {
    let title: String = xml_safe(name)
        .chars()
        .filter(|&c| c >= ' ' && !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    if title.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        title
    }
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(|c| c >= ' ' || matches!(c, '\t' | '\n' | '\r')) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .filter(|&c| c >= ' ' || matches!(c, '\t' | '\n' | '\r'))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(3), "D");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_xml_safe_strips_control_characters() {
        assert_eq!(xml_safe("a\u{c}b"), "ab");
        assert!(matches!(xml_safe("plain & simple"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sheet_title_limits() {
        assert_eq!(sheet_title("Elenco"), "Elenco");
        assert_eq!(sheet_title("a/b:c[1]"), "abc1");
        assert_eq!(sheet_title("???"), "Sheet1");
        let long = "dslip_SENZA_PRODUTTORE_elenco_pagine_2024";
        assert_eq!(sheet_title(long), "dslip_SENZA_PRODUTTORE_elenco_p");
        assert_eq!(sheet_title(&"è".repeat(40)).chars().count(), 31);
    }

    #[test]
    fn test_long_sheet_name_is_truncated() {
        let data = write_xlsx("dslip_SENZA_PRODUTTORE_elenco_pagine_2024", &["a"], &[]).unwrap();
        let workbook = open_workbook_auto_from_rs(Cursor::new(data)).unwrap();
        let names = workbook.sheet_names();
        assert_eq!(names, vec!["dslip_SENZA_PRODUTTORE_elenco_p".to_string()]);
    }

    #[test]
    fn test_workbook_readable_by_calamine() {
        let rows = vec![
            vec![
                Cell::from("a & b.pdf"),
                Cell::from(3u32),
                Cell::from(Some("POL001")),
                Cell::Empty,
            ],
            vec![
                Cell::from("c.pdf"),
                Cell::from(1u32),
                Cell::from(None),
                Cell::from("<ROSSI>"),
            ],
        ];
        let header = ["documentName", "pageIndex", "identifier", "customerName"];
        let data = write_xlsx("Elenco", &header, &rows).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Elenco".to_string()]);
        let range = workbook.worksheet_range("Elenco").unwrap();
        let cells: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0][0], Data::String("documentName".to_string()));
        assert_eq!(cells[1][0], Data::String("a & b.pdf".to_string()));
        assert_eq!(cells[1][1], Data::Float(3.0));
        assert_eq!(cells[1][2], Data::String("POL001".to_string()));
        assert_eq!(cells[2][3], Data::String("<ROSSI>".to_string()));
        assert_eq!(cells[2][2], Data::Empty);
    }
}
