use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::model::{BlockKind, TextBlock, ValidatedTable};
use crate::warning::{ExtractWarning, WarningCode};

/// Table number shown for a table that no marker points at.
const ORPHAN_TABLE_NUMBER: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SectionItem<'a> {
    Block(&'a TextBlock),
    Table {
        number: usize,
        table: &'a ValidatedTable,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageSection<'a> {
    pub page: u32,
    pub items: Vec<SectionItem<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assembly<'a> {
    pub sections: Vec<PageSection<'a>>,
    pub warnings: Vec<ExtractWarning>,
}

/// Lays blocks and tables out as page sections.
///
/// A new section starts whenever the page number changes between two
/// consecutive blocks; blocks are never reordered, so a page that shows up
/// again later gets a second section. Each table renders once, at the first
/// marker of its page, or at the end of its page when no marker exists.
pub(crate) fn assemble<'a>(blocks: &'a [TextBlock], tables: &'a [ValidatedTable]) -> Assembly<'a> {
    let mut by_page: BTreeMap<u32, &ValidatedTable> = BTreeMap::new();
    for table in tables {
        by_page.entry(table.page).or_insert(table);
    }

    let mut sections: Vec<PageSection<'a>> = Vec::new();
    let mut seen_pages = BTreeSet::new();
    let mut rendered = BTreeSet::new();
    let mut warnings = Vec::new();

    for block in blocks {
        if sections.last().is_none_or(|section| section.page != block.page) {
            if !seen_pages.insert(block.page) {
                warn!(page = block.page, "page blocks are out of order");
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::PageOrderRegression,
                        "page appears again after a later page; rendered as a separate section",
                    )
                    .with_page(block.page),
                );
            }
            sections.push(PageSection {
                page: block.page,
                items: Vec::new(),
            });
        }

        let Some(section) = sections.last_mut() else {
            continue;
        };
        match block.kind {
            BlockKind::TableMarker { ordinal } => {
                if let Some(&table) = by_page.get(&block.page) {
                    if rendered.insert(block.page) {
                        section.items.push(SectionItem::Table {
                            number: ordinal,
                            table,
                        });
                    }
                }
            }
            _ => section.items.push(SectionItem::Block(block)),
        }
    }

    for (page, table) in by_page {
        if rendered.contains(&page) {
            continue;
        }

        let item = SectionItem::Table {
            number: ORPHAN_TABLE_NUMBER,
            table,
        };
        if let Some(section) = sections.iter_mut().rev().find(|section| section.page == page) {
            section.items.push(item);
        } else {
            let at = sections
                .iter()
                .position(|section| section.page > page)
                .unwrap_or(sections.len());
            sections.insert(
                at,
                PageSection {
                    page,
                    items: vec![item],
                },
            );
        }
    }

    Assembly { sections, warnings }
}
