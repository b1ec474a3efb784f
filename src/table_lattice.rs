use crate::error::BackendError;
use crate::model::{BoundingBox, PageContent, RawTable, RuleSegment, TextFragment};
use crate::score::{ratio, round_percent};
use crate::table_detect::{TableBackend, extract_each_page};

pub const LATTICE_SOURCE: &str = "lattice-mode";

/// Column and row boundaries from drawn ruling lines.
#[derive(Debug, Clone)]
pub struct LatticeBackend {
    /// Maximum thickness of a rule and slack when testing cell bounds.
    pub line_tolerance: f64,
    /// Rules closer than this share one boundary.
    pub merge_distance: f64,
}

impl Default for LatticeBackend {
    fn default() -> Self {
        Self {
            line_tolerance: 1.0,
            merge_distance: 2.0,
        }
    }
}

/// Collapses sorted positions that lie within `distance` of each other.
fn cluster(mut positions: Vec<f64>, distance: f64) -> Vec<f64> {
    positions.sort_by(f64::total_cmp);

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for position in positions {
        match clusters.last_mut() {
            Some(group) if position - group[group.len() - 1] <= distance => group.push(position),
            _ => clusters.push(vec![position]),
        }
    }

    clusters
        .into_iter()
        .map(|group| {
            #[allow(clippy::cast_precision_loss)]
            let count = group.len() as f64;
            group.iter().sum::<f64>() / count
        })
        .collect()
}

/// Column edges left to right and row edges top to bottom.
#[derive(Debug, Clone, PartialEq)]
struct Grid {
    columns: Vec<f64>,
    rows: Vec<f64>,
}

impl Grid {
    fn column_of(&self, x: f64) -> Option<usize> {
        self.columns
            .windows(2)
            .position(|edge| x >= edge[0] && x < edge[1])
    }

    fn row_of(&self, y: f64) -> Option<usize> {
        self.rows
            .windows(2)
            .position(|edge| y <= edge[0] && y > edge[1])
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x0: self.columns[0],
            y0: self.rows[self.rows.len() - 1],
            x1: self.columns[self.columns.len() - 1],
            y1: self.rows[0],
        }
    }
}

impl LatticeBackend {
    fn grid(&self, rules: &[RuleSegment]) -> Option<Grid> {
        let columns = cluster(
            rules
                .iter()
                .filter(|rule| rule.is_vertical(self.line_tolerance))
                .map(|rule| (rule.x0 + rule.x1) / 2.0)
                .collect(),
            self.merge_distance,
        );
        let mut rows = cluster(
            rules
                .iter()
                .filter(|rule| rule.is_horizontal(self.line_tolerance))
                .map(|rule| (rule.y0 + rule.y1) / 2.0)
                .collect(),
            self.merge_distance,
        );
        rows.reverse();

        (columns.len() >= 2 && rows.len() >= 2).then_some(Grid { columns, rows })
    }

    fn fill(&self, grid: &Grid, fragments: &[TextFragment]) -> Option<RawTable> {
        let mut cells = vec![vec![String::new(); grid.columns.len() - 1]; grid.rows.len() - 1];
        let mut in_grid = 0_usize;
        let mut fitting = 0_usize;

        for fragment in fragments {
            let text = fragment.text.trim();
            if text.is_empty() {
                continue;
            }

            let anchor_y = fragment.y + fragment.font_size * 0.25;
            let (Some(column), Some(row)) = (grid.column_of(fragment.x), grid.row_of(anchor_y))
            else {
                continue;
            };

            in_grid += 1;
            if fragment.right() <= grid.columns[column + 1] + self.line_tolerance {
                fitting += 1;
            }

            let cell = &mut cells[row][column];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(text);
        }

        if in_grid == 0 {
            return None;
        }

        let accuracy = round_percent(ratio(fitting, in_grid) * 100.0);
        Some(
            RawTable::new(cells)
                .with_native_confidence(accuracy)
                .with_bbox(grid.bbox()),
        )
    }
}

impl TableBackend for LatticeBackend {
    fn source(&self) -> &str {
        LATTICE_SOURCE
    }

    fn extract_page(&self, page: &PageContent) -> Result<Vec<RawTable>, BackendError> {
        let Some(grid) = self.grid(&page.rules) else {
            return Ok(Vec::new());
        };

        let mut fragments = page.fragments.clone();
        fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));
        Ok(self.fill(&grid, &fragments).into_iter().collect())
    }

    fn extract_document(
        &self,
        pages: &[PageContent],
    ) -> Result<Vec<(u32, RawTable)>, BackendError> {
        if pages.iter().all(|page| page.rules.is_empty()) {
            return Err(BackendError::NoRulings);
        }
        extract_each_page(self, pages)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{LatticeBackend, cluster};
    use crate::error::BackendError;
    use crate::model::{PageContent, RuleSegment, TextFragment};
    use crate::table_detect::TableBackend;

    fn fragment(x: f64, y: f64, text: &str) -> TextFragment {
        #[allow(clippy::cast_precision_loss)]
        let width = text.chars().count() as f64 * 5.0;
        TextFragment {
            x,
            y,
            width,
            font_size: 10.0,
            text: text.to_string(),
        }
    }

    /// Three columns between x = 50..350, three rows between y = 780..720.
    fn grid_rules() -> Vec<RuleSegment> {
        let mut rules = Vec::new();
        for x in [50.0, 150.0, 250.0, 350.0] {
            rules.push(RuleSegment::new(x, 720.0, x, 780.0));
        }
        for y in [720.0, 740.0, 760.0, 780.0] {
            rules.push(RuleSegment::new(50.0, y, 350.0, y));
        }
        rules
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| (*cell).to_string()).collect()
    }

    #[test]
    fn clusters_nearby_positions() {
        assert_eq!(cluster(vec![100.0, 50.0, 51.0, 100.5], 2.0), vec![50.5, 100.25]);
    }

    #[test]
    fn assigns_fragments_to_grid_cells() {
        let page = PageContent {
            rules: grid_rules(),
            fragments: vec![
                fragment(55.0, 765.0, "Name"),
                fragment(155.0, 765.0, "Dept"),
                fragment(255.0, 765.0, "Ext"),
                fragment(55.0, 745.0, "Kim"),
                fragment(155.0, 745.0, "Sales"),
                fragment(255.0, 745.0, "101"),
                fragment(55.0, 725.0, "Lee"),
                fragment(255.0, 725.0, "102"),
                fragment(400.0, 600.0, "outside"),
            ],
            ..PageContent::from_text(1, "")
        };

        let tables = LatticeBackend::default().extract_page(&page).expect("grid page");
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![
                row(&["Name", "Dept", "Ext"]),
                row(&["Kim", "Sales", "101"]),
                row(&["Lee", "", "102"]),
            ]
        );
        assert_eq!(tables[0].native_confidence, Some(100.0));
        let bbox = tables[0].bbox.expect("grid bbox");
        assert_eq!((bbox.x0, bbox.y0, bbox.x1, bbox.y1), (50.0, 720.0, 350.0, 780.0));
    }

    #[test]
    fn overflowing_text_lowers_accuracy() {
        let page = PageContent {
            rules: grid_rules(),
            fragments: vec![
                fragment(55.0, 765.0, "a"),
                fragment(155.0, 765.0, "b"),
                fragment(255.0, 765.0, "c"),
                fragment(55.0, 745.0, "a much longer overflowing cell"),
            ],
            ..PageContent::from_text(1, "")
        };

        let tables = LatticeBackend::default().extract_page(&page).expect("grid page");
        assert_eq!(tables[0].native_confidence, Some(75.0));
    }

    #[test]
    fn empty_grid_is_skipped() {
        let page = PageContent {
            rules: grid_rules(),
            ..PageContent::from_text(1, "")
        };
        assert!(LatticeBackend::default().extract_page(&page).expect("ok").is_empty());
    }

    #[test]
    fn document_without_rulings_fails() {
        let pages = vec![PageContent::from_text(1, "Name  Age")];
        assert!(matches!(
            LatticeBackend::default().extract_document(&pages),
            Err(BackendError::NoRulings)
        ));
    }

    #[test]
    fn pages_without_grid_contribute_nothing() {
        let pages = vec![
            PageContent {
                rules: vec![RuleSegment::new(50.0, 700.0, 300.0, 700.0)],
                ..PageContent::from_text(1, "")
            },
            PageContent {
                rules: grid_rules(),
                fragments: vec![fragment(55.0, 765.0, "x"), fragment(155.0, 745.0, "y")],
                ..PageContent::from_text(2, "")
            },
        ];
        let tables = LatticeBackend::default()
            .extract_document(&pages)
            .expect("rulings exist");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, 2);
    }
}
