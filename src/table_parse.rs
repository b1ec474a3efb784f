use std::collections::BTreeMap;

pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' {
            if !current.trim().is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                if !current.trim().is_empty() {
                    cells.push(current.trim().to_string());
                    current.clear();
                }
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }

    cells
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Most frequent row length. Ties go to the smallest length.
pub(crate) fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut freq = BTreeMap::new();
    for width in rows.iter().map(Vec::len) {
        *freq.entry(width).or_insert(0_usize) += 1;
    }

    freq.into_iter()
        .fold(None, |best: Option<(usize, usize)>, (width, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((width, count)),
        })
        .map_or(0, |(width, _)| width)
}

#[cfg(test)]
mod tests {
    use super::{modal_width, soft_split_line_into_cells, split_line_into_cells};

    fn rows(widths: &[usize]) -> Vec<Vec<String>> {
        widths
            .iter()
            .map(|&width| vec!["x".to_string(); width])
            .collect()
    }

    #[test]
    fn splits_double_space_separated_cells() {
        let cells = split_line_into_cells("Alice  30  98");
        assert_eq!(cells, vec!["Alice", "30", "98"]);
    }

    #[test]
    fn keeps_single_spaces_inside_cells() {
        let cells = split_line_into_cells("New York  8.3  1");
        assert_eq!(cells, vec!["New York", "8.3", "1"]);
    }

    #[test]
    fn splits_tab_separated_cells() {
        let cells = split_line_into_cells("A\tB\tC");
        assert_eq!(cells, vec!["A", "B", "C"]);
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("Name Age Score");
        assert_eq!(cells, vec!["Name", "Age", "Score"]);
    }

    #[test]
    fn detects_modal_width() {
        assert_eq!(modal_width(&rows(&[2, 2, 1])), 2);
        assert_eq!(modal_width(&rows(&[])), 0);
    }

    #[test]
    fn modal_width_ties_go_to_the_smallest_width() {
        assert_eq!(modal_width(&rows(&[3, 2, 3, 2])), 2);
        assert_eq!(modal_width(&rows(&[4, 1])), 1);
    }
}
