use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;

use crate::error::ExtractError;
use crate::model::ValidatedTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `page{p}_table{k}.csv`, where `k` is the 1-based position in the
/// validated table list.
pub(crate) fn table_file_name(table: &ValidatedTable, position: usize) -> String {
    format!("page{}_table{position}.csv", table.page)
}

fn write_table<W: Write>(mut out: W, table: &ValidatedTable) -> Result<W, ExtractError> {
    out.write_all(UTF8_BOM)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(out);
    writer.write_record(table.header())?;
    for row in table.body() {
        writer.write_record(row)?;
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|error| ExtractError::Io(error.into_error()))
}

pub(crate) fn write_table_csv(path: &Path, table: &ValidatedTable) -> Result<(), ExtractError> {
    write_table(BufWriter::new(File::create(path)?), table)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{table_file_name, write_table};
    use crate::model::ValidatedTable;

    fn table_csv_to_string(table: &ValidatedTable) -> String {
        let bytes = write_table(Vec::<u8>::new(), table).expect("csv should render");
        String::from_utf8(bytes).expect("csv output should be utf-8")
    }

    fn table(rows: &[&[&str]]) -> ValidatedTable {
        ValidatedTable {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
            page: 4,
            source: "stream-mode".to_string(),
            confidence: 90.0,
            bbox: None,
        }
    }

    #[test]
    fn starts_with_bom_and_keeps_ragged_rows() {
        let csv = table_csv_to_string(&table(&[&["Name", "Note"], &["Kim", "a, b"], &["Lee"]]));
        assert_eq!(csv, "\u{FEFF}Name,Note\nKim,\"a, b\"\nLee\n");
    }

    #[test]
    fn file_name_uses_page_and_list_position() {
        assert_eq!(table_file_name(&table(&[&["a"], &["b"]]), 2), "page4_table2.csv");
    }
}
