use crate::error::BackendError;
use crate::model::{PageContent, RawTable};
use crate::score::{ratio, round_percent};
use crate::table_detect::{TableBackend, extract_each_page};
use crate::table_parse::{modal_width, soft_split_line_into_cells, split_line_into_cells};

pub const STREAM_SOURCE: &str = "stream-mode";

/// Column boundaries from whitespace gaps in the page text.
#[derive(Debug, Clone)]
pub struct StreamBackend {
    min_cols: usize,
}

impl StreamBackend {
    #[must_use]
    pub fn new(min_cols: usize) -> Self {
        Self {
            min_cols: min_cols.max(2),
        }
    }
}

impl Default for StreamBackend {
    fn default() -> Self {
        Self::new(2)
    }
}

/// 0.75 row-width consistency plus 0.25 width uniformity, as a percentage.
fn stream_accuracy(rows: &[Vec<String>]) -> f64 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent = ratio(rows.iter().filter(|row| row.len() == modal).count(), rows.len());
    let max_width = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let min_width = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = if max_width == 0 {
        0.0
    } else {
        1.0 - ratio(max_width - min_width, max_width)
    };

    round_percent((consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0) * 100.0)
}

fn line_cells(line: &str, min_cols: usize) -> Vec<String> {
    let cells = split_line_into_cells(line);
    if cells.len() >= min_cols {
        return cells;
    }

    let soft_cells = soft_split_line_into_cells(line);
    let has_numeric = soft_cells
        .iter()
        .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
    let looks_like_sentence = ['.', '!', '?']
        .iter()
        .any(|punctuation| line.trim_end().ends_with(*punctuation));
    if soft_cells.len() >= min_cols && has_numeric && !looks_like_sentence {
        soft_cells
    } else {
        cells
    }
}

fn detect_tables_in_text(text: &str, min_cols: usize) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current_rows: Vec<Vec<String>> = Vec::new();

    let flush_current = |rows: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>| {
        if rows.len() >= 2 {
            let accuracy = stream_accuracy(rows);
            tables.push(RawTable::new(std::mem::take(rows)).with_native_confidence(accuracy));
        } else {
            rows.clear();
        }
    };

    for line in text.lines() {
        let cells = line_cells(line, min_cols);
        if cells.len() >= min_cols {
            current_rows.push(cells);
        } else {
            flush_current(&mut current_rows, &mut tables);
        }
    }

    flush_current(&mut current_rows, &mut tables);
    tables
}

impl TableBackend for StreamBackend {
    fn source(&self) -> &str {
        STREAM_SOURCE
    }

    fn extract_page(&self, page: &PageContent) -> Result<Vec<RawTable>, BackendError> {
        Ok(detect_tables_in_text(&page.text, self.min_cols))
    }

    fn extract_document(
        &self,
        pages: &[PageContent],
    ) -> Result<Vec<(u32, RawTable)>, BackendError> {
        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(BackendError::NoTextLayer);
        }
        extract_each_page(self, pages)
    }
}
