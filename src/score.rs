use crate::table_parse::modal_width;

const FILL_WEIGHT: f64 = 0.6;
const CONSISTENCY_WEIGHT: f64 = 0.4;

/// Share of cells that are non-empty after trimming.
pub(crate) fn fill_rate(rows: &[Vec<String>]) -> f64 {
    let total = rows.iter().map(Vec::len).sum::<usize>();
    if total == 0 {
        return 0.0;
    }

    let filled = rows
        .iter()
        .flatten()
        .filter(|cell| !cell.trim().is_empty())
        .count();
    ratio(filled, total)
}

/// Share of rows whose length equals the modal row length.
pub(crate) fn consistency_rate(rows: &[Vec<String>]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }

    let modal = modal_width(rows);
    let consistent = rows.iter().filter(|row| row.len() == modal).count();
    ratio(consistent, rows.len())
}

/// Quality score in `[0, 100]`, rounded to two decimals.
#[must_use]
pub fn score_table(rows: &[Vec<String>]) -> f64 {
    if rows.iter().all(Vec::is_empty) {
        return 0.0;
    }

    let combined = FILL_WEIGHT * fill_rate(rows) + CONSISTENCY_WEIGHT * consistency_rate(rows);
    round_percent(combined * 100.0)
}

pub(crate) fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}
