use std::fs;
use std::path::Path;

use crate::assemble::{Assembly, SectionItem};
use crate::error::ExtractError;
use crate::model::{BlockKind, TextBlock, ValidatedTable};

const MIN_COLUMN_WIDTH: usize = 3;

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn padded(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(len)))
}

/// Left-aligned pipe grid with the first row as header.
pub(crate) fn pipe_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let escaped = rows
        .iter()
        .map(|row| {
            (0..columns)
                .map(|index| row.get(index).map(|cell| escape_cell(cell)).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = (0..columns)
        .map(|index| {
            escaped
                .iter()
                .map(|row| row[index].chars().count())
                .max()
                .unwrap_or(0)
                .max(MIN_COLUMN_WIDTH)
        })
        .collect::<Vec<_>>();

    let render_row = |row: &[String]| {
        let cells = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| padded(cell, width))
            .collect::<Vec<_>>();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(escaped.len() + 1);
    lines.push(render_row(&escaped[0]));
    lines.push(format!(
        "|{}|",
        widths
            .iter()
            .map(|width| format!(":{}", "-".repeat(width + 1)))
            .collect::<Vec<_>>()
            .join("|")
    ));
    lines.extend(escaped[1..].iter().map(|row| render_row(row)));
    lines.join("\n")
}

fn render_block(block: &TextBlock) -> Option<String> {
    match block.kind {
        BlockKind::Heading => Some(format!(
            "\n{} {}\n",
            "#".repeat(block.level + 1),
            block.text
        )),
        BlockKind::ListItem => Some(format!(
            "{}- {}",
            "  ".repeat(block.level.saturating_sub(1)),
            block.text
        )),
        BlockKind::Paragraph => Some(format!("\n{}\n", block.text)),
        BlockKind::TableMarker { .. } => None,
    }
}

fn render_table(lines: &mut Vec<String>, number: usize, table: &ValidatedTable) {
    lines.push(format!("\n### Table {number}\n"));
    lines.push(pipe_table(&table.rows));
    lines.push(format!(
        "\n*Source: {}, Confidence: {:.1}%*\n",
        table.source, table.confidence
    ));
}

#[must_use]
pub(crate) fn render_markdown(assembly: &Assembly<'_>) -> String {
    let mut lines = Vec::new();
    for section in &assembly.sections {
        lines.push(format!("\n---\n\n# Page {}\n", section.page));
        for item in &section.items {
            match item {
                SectionItem::Block(block) => lines.extend(render_block(block)),
                SectionItem::Table { number, table } => render_table(&mut lines, *number, table),
            }
        }
    }
    lines.join("\n")
}

pub(crate) fn write_markdown(path: &Path, assembly: &Assembly<'_>) -> Result<(), ExtractError> {
    fs::write(path, render_markdown(assembly))?;
    Ok(())
}
