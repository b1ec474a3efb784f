use std::fs;
use std::path::Path;

use crate::assemble::{Assembly, SectionItem};
use crate::error::ExtractError;
use crate::model::{BlockKind, TextBlock, ValidatedTable};

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PDF extraction result</title>
    <style>
        body { font-family: 'Malgun Gothic', sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; }
        h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
        h2 { color: #34495e; margin-top: 30px; }
        h3 { color: #7f8c8d; }
        .page-break { border-top: 3px double #bdc3c7; margin: 40px 0; padding-top: 20px; }
        .list-item { margin-left: 20px; }
        .list-item-2 { margin-left: 40px; }
        table { border-collapse: collapse; width: 100%; margin: 20px 0; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        .table-info { font-size: 0.9em; color: #7f8c8d; font-style: italic; }
        .paragraph { margin: 15px 0; line-height: 1.6; }
    </style>
</head>
<body>
    <h1>PDF extraction result</h1>"#;

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_block(block: &TextBlock) -> Option<String> {
    let text = escape_html(&block.text);
    match block.kind {
        BlockKind::Heading => {
            let level = (block.level + 2).min(6);
            Some(format!("<h{level}>{text}</h{level}>"))
        }
        BlockKind::ListItem => {
            let class = if block.level > 1 {
                format!("list-item-{}", block.level)
            } else {
                "list-item".to_string()
            };
            Some(format!("<div class=\"{class}\">• {text}</div>"))
        }
        BlockKind::Paragraph => Some(format!("<p class=\"paragraph\">{text}</p>")),
        BlockKind::TableMarker { .. } => None,
    }
}

fn render_table(lines: &mut Vec<String>, number: usize, table: &ValidatedTable) {
    lines.push(format!("<h3>Table {number}</h3>"));
    lines.push("<table>".to_string());

    lines.push("<thead><tr>".to_string());
    lines.extend(
        table
            .header()
            .iter()
            .map(|cell| format!("<th>{}</th>", escape_html(cell))),
    );
    lines.push("</tr></thead>".to_string());

    if !table.body().is_empty() {
        lines.push("<tbody>".to_string());
        for row in table.body() {
            lines.push("<tr>".to_string());
            lines.extend(row.iter().map(|cell| format!("<td>{}</td>", escape_html(cell))));
            lines.push("</tr>".to_string());
        }
        lines.push("</tbody>".to_string());
    }

    lines.push("</table>".to_string());
    lines.push(format!(
        "<div class=\"table-info\">Source: {}, Confidence: {:.1}%</div>",
        escape_html(&table.source),
        table.confidence
    ));
}

#[must_use]
pub(crate) fn render_html(assembly: &Assembly<'_>) -> String {
    let mut lines = vec![HTML_HEAD.to_string()];
    for section in &assembly.sections {
        lines.push(format!(
            "<div class=\"page-break\"><h2>Page {}</h2>",
            section.page
        ));
        for item in &section.items {
            match item {
                SectionItem::Block(block) => lines.extend(render_block(block)),
                SectionItem::Table { number, table } => render_table(&mut lines, *number, table),
            }
        }
        lines.push("</div>".to_string());
    }
    lines.push("</body></html>".to_string());
    lines.join("\n")
}

pub(crate) fn write_html(path: &Path, assembly: &Assembly<'_>) -> Result<(), ExtractError> {
    fs::write(path, render_html(assembly))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{escape_html, render_html};
    use crate::assemble::assemble;
    use crate::model::{BlockKind, TextBlock, ValidatedTable};

    fn block(kind: BlockKind, level: usize, text: &str, page: u32) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            kind,
            level,
            page,
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"R&D"</b>"#),
            "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn heading_tags_are_capped_at_h6() {
        let blocks = vec![
            block(BlockKind::Heading, 1, "Top", 1),
            block(BlockKind::Heading, 7, "Deep", 1),
            block(BlockKind::ListItem, 2, "nested", 1),
            block(BlockKind::ListItem, 1, "flat", 1),
        ];
        let html = render_html(&assemble(&blocks, &[]));
        assert!(html.contains("<h3>Top</h3>"));
        assert!(html.contains("<h6>Deep</h6>"));
        assert!(html.contains("<div class=\"list-item-2\">• nested</div>"));
        assert!(html.contains("<div class=\"list-item\">• flat</div>"));
    }

    #[test]
    fn each_page_gets_a_closed_section() {
        let blocks = vec![
            block(BlockKind::Paragraph, 0, "a < b", 1),
            TextBlock::table_marker(1, 1),
            block(BlockKind::Paragraph, 0, "second", 2),
        ];
        let tables = vec![ValidatedTable {
            rows: vec![
                vec!["Name".to_string(), "Age".to_string()],
                vec!["Kim".to_string(), "30".to_string()],
            ],
            page: 1,
            source: "layout-extractor".to_string(),
            confidence: 70.0,
            bbox: None,
        }];

        let html = render_html(&assemble(&blocks, &tables));
        assert_eq!(html.matches("<div class=\"page-break\">").count(), 2);
        assert!(html.contains("<p class=\"paragraph\">a &lt; b</p>"));
        assert!(html.contains("<th>Name</th>\n<th>Age</th>"));
        assert!(html.contains("<td>Kim</td>\n<td>30</td>"));
        assert!(html.contains("Source: layout-extractor, Confidence: 70.0%"));
        assert!(html.ends_with("</div>\n</body></html>"));
    }
}
