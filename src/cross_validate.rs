use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{TableCandidate, ValidatedTable};

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    pub tables: Vec<ValidatedTable>,
    pub report: Vec<String>,
}

/// Highest confidence wins; on equal confidence the earlier candidate stays.
fn first_max<'a, I>(candidates: I) -> Option<&'a TableCandidate>
where
    I: IntoIterator<Item = &'a TableCandidate>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.confidence >= candidate.confidence => Some(current),
        _ => Some(candidate),
    })
}

/// Each source gets one vote (its best table) before the page-level comparison.
fn choose_page_winner(page_tables: &[&TableCandidate]) -> Option<TableCandidate> {
    let mut by_source: Vec<(&str, Vec<&TableCandidate>)> = Vec::new();
    for &table in page_tables {
        match by_source
            .iter_mut()
            .find(|(source, _)| *source == table.source)
        {
            Some((_, group)) => group.push(table),
            None => by_source.push((table.source.as_str(), vec![table])),
        }
    }

    let source_winners = by_source
        .iter()
        .filter_map(|(_, group)| first_max(group.iter().copied()))
        .collect::<Vec<_>>();
    first_max(source_winners).cloned()
}

/// Picks one table per page number. Pages come out in ascending order.
#[must_use]
pub fn cross_validate(candidates: &[TableCandidate]) -> CrossValidation {
    let mut by_page: BTreeMap<u32, Vec<&TableCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_page.entry(candidate.page).or_default().push(candidate);
    }

    let mut tables = Vec::with_capacity(by_page.len());
    let mut report = Vec::new();

    for (page, page_tables) in by_page {
        if let [only] = page_tables.as_slice() {
            tables.push(ValidatedTable::from((*only).clone()));
            continue;
        }

        let Some(winner) = choose_page_winner(&page_tables) else {
            continue;
        };
        debug!(
            page,
            candidates = page_tables.len(),
            source = %winner.source,
            confidence = winner.confidence,
            "cross-validated page tables"
        );
        report.push(format!(
            "Page {page}: selected source = {} (confidence: {:.1}%)",
            winner.source, winner.confidence
        ));
        tables.push(ValidatedTable::from(winner));
    }

    CrossValidation { tables, report }
}
