use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::ExtractError;
use crate::model::{BlockKind, TextBlock, ValidatedTable};

#[derive(Debug, Serialize)]
pub(crate) struct BlockRecord<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub level: usize,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TableRecord<'a> {
    pub source: &'a str,
    pub confidence: f64,
    pub data: &'a [Vec<String>],
}

#[derive(Debug, Serialize)]
pub(crate) struct PageRecord<'a> {
    pub page_number: u32,
    pub blocks: Vec<BlockRecord<'a>>,
    pub tables: Vec<TableRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentRecord<'a> {
    pub source_name: &'a str,
    pub total_pages: usize,
    pub total_blocks: usize,
    pub total_tables: usize,
    pub content: Vec<PageRecord<'a>>,
}

pub(crate) fn document_record<'a>(
    source_name: &'a str,
    page_count: usize,
    blocks: &'a [TextBlock],
    tables: &'a [ValidatedTable],
) -> DocumentRecord<'a> {
    let mut pages: BTreeMap<u32, PageRecord<'a>> = BTreeMap::new();
    let page = |number: u32| PageRecord {
        page_number: number,
        blocks: Vec::new(),
        tables: Vec::new(),
    };

    for block in blocks {
        let record = pages.entry(block.page).or_insert_with(|| page(block.page));
        if matches!(block.kind, BlockKind::TableMarker { .. }) {
            continue;
        }
        record.blocks.push(BlockRecord {
            kind: block.kind.as_str(),
            level: block.level,
            text: &block.text,
        });
    }

    for table in tables {
        pages
            .entry(table.page)
            .or_insert_with(|| page(table.page))
            .tables
            .push(TableRecord {
                source: &table.source,
                confidence: table.confidence,
                data: &table.rows,
            });
    }

    DocumentRecord {
        source_name,
        total_pages: page_count,
        total_blocks: blocks.len(),
        total_tables: tables.len(),
        content: pages.into_values().collect(),
    }
}

pub(crate) fn write_json(path: &Path, record: &DocumentRecord<'_>) -> Result<(), ExtractError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::document_record;
    use crate::model::{BlockKind, TextBlock, ValidatedTable};

    #[test]
    fn markers_count_but_are_not_listed() {
        let blocks = vec![
            TextBlock {
                text: "Summary".to_string(),
                kind: BlockKind::Heading,
                level: 1,
                page: 1,
            },
            TextBlock::table_marker(1, 1),
        ];
        let tables = vec![
            ValidatedTable {
                rows: vec![vec!["k".to_string()], vec!["v".to_string()]],
                page: 1,
                source: "layout-extractor".to_string(),
                confidence: 70.0,
                bbox: None,
            },
            ValidatedTable {
                rows: vec![vec!["x".to_string()], vec!["y".to_string()]],
                page: 3,
                source: "lattice-mode".to_string(),
                confidence: 100.0,
                bbox: None,
            },
        ];

        let record = document_record("report.pdf", 3, &blocks, &tables);
        let value = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(
            value,
            json!({
                "source_name": "report.pdf",
                "total_pages": 3,
                "total_blocks": 2,
                "total_tables": 2,
                "content": [
                    {
                        "page_number": 1,
                        "blocks": [{"type": "heading", "level": 1, "text": "Summary"}],
                        "tables": [{"source": "layout-extractor", "confidence": 70.0, "data": [["k"], ["v"]]}]
                    },
                    {
                        "page_number": 3,
                        "blocks": [],
                        "tables": [{"source": "lattice-mode", "confidence": 100.0, "data": [["x"], ["y"]]}]
                    }
                ]
            })
        );
    }
}
