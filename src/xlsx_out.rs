//! Minimal SpreadsheetML writer: one worksheet per table, every cell an
//! inline string.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::ExtractError;
use crate::model::ValidatedTable;

const SHEET_NAME_MAX_CHARS: usize = 31;

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// `Page{p}_T{k}`, cut to the sheet name limit.
pub(crate) fn sheet_name(table: &ValidatedTable, position: usize) -> String {
    format!("Page{}_T{position}", table.page)
        .chars()
        .take(SHEET_NAME_MAX_CHARS)
        .collect()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(ch),
            ch if ch.is_control() => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Zero-based column index to a spreadsheet column label (`0` is `A`).
fn column_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        let digit = u8::try_from(index % 26).unwrap_or(0);
        label.push(char::from(b'A' + digit));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.iter().rev().collect()
}

fn worksheet_xml(rows: &[Vec<String>]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (column_index, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                r#"<c r="{}{row_number}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_label(column_index),
                escape_xml(cell)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (index, name) in names.iter().enumerate() {
        let id = index + 1;
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for id in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(CONTENT_TYPES_HEAD);
    for id in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{id}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

/// Writes the workbook into `out`. Table `k` of the list becomes sheet `k`.
pub(crate) fn write_workbook<W: Write + Seek>(
    out: W,
    tables: &[ValidatedTable],
) -> Result<W, ExtractError> {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let names = tables
        .iter()
        .enumerate()
        .map(|(index, table)| sheet_name(table, index + 1))
        .collect::<Vec<_>>();

    let mut zip = ZipWriter::new(out);
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(tables.len()).as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(&names).as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels(tables.len()).as_bytes())?;

    for (index, table) in tables.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        zip.write_all(worksheet_xml(&table.rows).as_bytes())?;
    }

    Ok(zip.finish()?)
}

pub(crate) fn write_xlsx(path: &Path, tables: &[ValidatedTable]) -> Result<(), ExtractError> {
    write_workbook(File::create(path)?, tables)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::{column_label, sheet_name, worksheet_xml, write_workbook};
    use crate::model::ValidatedTable;

    fn table(page: u32, rows: &[&[&str]]) -> ValidatedTable {
        ValidatedTable {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
            page,
            source: "stream-mode".to_string(),
            confidence: 90.0,
            bbox: None,
        }
    }

    #[test]
    fn column_labels_roll_over_after_z() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
    }

    #[test]
    fn sheet_names_are_truncated_to_31_chars() {
        assert_eq!(sheet_name(&table(2, &[]), 3), "Page2_T3");
        let long = sheet_name(&table(u32::MAX, &[]), usize::MAX);
        assert_eq!(long.chars().count(), 31);
        assert!(long.starts_with("Page4294967295_T"));
    }

    #[test]
    fn worksheet_rows_stay_ragged_and_escaped() {
        let xml = worksheet_xml(&table(1, &[&["a<b", "c"], &["d"]]).rows);
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">a&lt;b</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B1" t="inlineStr">"#));
        assert!(xml.contains(r#"<row r="2"><c r="A2" t="inlineStr"><is><t xml:space="preserve">d</t></is></c></row>"#));
    }

    #[test]
    fn workbook_has_one_sheet_per_table() {
        let tables = vec![
            table(1, &[&["h"], &["v"]]),
            table(3, &[&["x", "y"], &["1", "2"]]),
        ];
        let bytes = write_workbook(Cursor::new(Vec::new()), &tables)
            .expect("workbook should be written")
            .into_inner();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        let mut workbook = String::new();
        archive
            .by_name("xl/workbook.xml")
            .expect("workbook part")
            .read_to_string(&mut workbook)
            .expect("utf-8 part");
        assert!(workbook.contains(r#"<sheet name="Page1_T1" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"<sheet name="Page3_T2" sheetId="2" r:id="rId2"/>"#));
        assert!(archive.by_name("xl/worksheets/sheet2.xml").is_ok());
        assert!(archive.by_name("[Content_Types].xml").is_ok());
    }
}
