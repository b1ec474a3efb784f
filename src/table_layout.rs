//! Tables recovered from text placement alone.
//!
//! Fragments sharing a baseline form a line, horizontal gaps wider than a
//! couple of glyphs split a line into cells, and consecutive multi-cell
//! lines that sit close together form a table region.

use crate::error::BackendError;
use crate::geometry::GLYPH_WIDTH_EM;
use crate::model::{BoundingBox, PageContent, RawTable, TextFragment};
use crate::table_detect::TableBackend;

pub const LAYOUT_SOURCE: &str = "layout-extractor";

#[derive(Debug, Clone)]
pub struct LayoutBackend {
    /// Gap, in glyph widths, that separates two cells.
    pub cell_gap_glyphs: f64,
    /// Largest distance between two rows of one region, in font sizes.
    pub row_gap_font_sizes: f64,
}

impl Default for LayoutBackend {
    fn default() -> Self {
        Self {
            cell_gap_glyphs: 1.5,
            row_gap_font_sizes: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    x0: f64,
    x1: f64,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    y: f64,
    top: f64,
    font_size: f64,
    cells: Vec<Cell>,
}

fn baseline_tolerance(font_size: f64) -> f64 {
    (font_size * 0.3).max(1.0)
}

/// Top-down lines, fragments left to right.
fn group_lines(fragments: &[TextFragment]) -> Vec<Vec<&TextFragment>> {
    let mut sorted = fragments
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .collect::<Vec<_>>();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextFragment>> = Vec::new();
    for fragment in sorted {
        match lines.last_mut() {
            Some(line)
                if (line[0].y - fragment.y).abs() <= baseline_tolerance(line[0].font_size) =>
            {
                line.push(fragment);
            }
            _ => lines.push(vec![fragment]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

impl LayoutBackend {
    fn split_cells(&self, fragments: &[&TextFragment]) -> Vec<Cell> {
        let mut cells: Vec<Cell> = Vec::new();
        for fragment in fragments {
            let glyph = fragment.font_size * GLYPH_WIDTH_EM;
            match cells.last_mut() {
                Some(cell) if fragment.x - cell.x1 < self.cell_gap_glyphs * glyph => {
                    if fragment.x - cell.x1 > glyph * 0.25 {
                        cell.text.push(' ');
                    }
                    cell.text.push_str(fragment.text.trim());
                    cell.x1 = cell.x1.max(fragment.right());
                }
                _ => cells.push(Cell {
                    x0: fragment.x,
                    x1: fragment.right(),
                    text: fragment.text.trim().to_string(),
                }),
            }
        }
        cells
    }

    fn lines(&self, page: &PageContent) -> Vec<Line> {
        group_lines(&page.fragments)
            .into_iter()
            .map(|fragments| {
                let font_size = fragments
                    .iter()
                    .map(|fragment| fragment.font_size)
                    .fold(0.0_f64, f64::max);
                let y = fragments[0].y;
                Line {
                    y,
                    top: y + font_size,
                    font_size,
                    cells: self.split_cells(&fragments),
                }
            })
            .collect()
    }

    fn regions(&self, lines: Vec<Line>) -> Vec<Vec<Line>> {
        let mut regions = Vec::new();
        let mut current: Vec<Line> = Vec::new();

        for line in lines {
            if line.cells.len() < 2 {
                if current.len() >= 2 {
                    regions.push(std::mem::take(&mut current));
                }
                current.clear();
                continue;
            }

            let close = current.last().is_some_and(|previous| {
                previous.y - line.y <= self.row_gap_font_sizes * previous.font_size.max(line.font_size)
            });
            if !close {
                if current.len() >= 2 {
                    regions.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            current.push(line);
        }

        if current.len() >= 2 {
            regions.push(current);
        }
        regions
    }
}

/// Merges overlapping cell spans into column bands, left to right.
fn column_bands(region: &[Line]) -> Vec<(f64, f64)> {
    let mut spans = region
        .iter()
        .flat_map(|line| line.cells.iter().map(|cell| (cell.x0, cell.x1)))
        .collect::<Vec<_>>();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bands: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in spans {
        match bands.last_mut() {
            Some(band) if x0 <= band.1 => band.1 = band.1.max(x1),
            _ => bands.push((x0, x1)),
        }
    }
    bands
}

fn snap_to_bands(line: &Line, bands: &[(f64, f64)]) -> Vec<String> {
    let mut row = vec![String::new(); bands.len()];
    for cell in &line.cells {
        let Some(index) = bands
            .iter()
            .position(|(x0, x1)| cell.x0 >= *x0 && cell.x0 <= *x1)
        else {
            continue;
        };
        if !row[index].is_empty() {
            row[index].push(' ');
        }
        row[index].push_str(&cell.text);
    }
    row
}

fn region_table(region: &[Line]) -> RawTable {
    let widths_agree = region
        .windows(2)
        .all(|pair| pair[0].cells.len() == pair[1].cells.len());
    let rows = if widths_agree {
        region
            .iter()
            .map(|line| line.cells.iter().map(|cell| cell.text.clone()).collect())
            .collect()
    } else {
        let bands = column_bands(region);
        region
            .iter()
            .map(|line| snap_to_bands(line, &bands))
            .collect()
    };

    let x0 = region
        .iter()
        .flat_map(|line| line.cells.iter().map(|cell| cell.x0))
        .fold(f64::INFINITY, f64::min);
    let x1 = region
        .iter()
        .flat_map(|line| line.cells.iter().map(|cell| cell.x1))
        .fold(f64::NEG_INFINITY, f64::max);
    let y0 = region.iter().map(|line| line.y).fold(f64::INFINITY, f64::min);
    let y1 = region
        .iter()
        .map(|line| line.top)
        .fold(f64::NEG_INFINITY, f64::max);

    RawTable::new(rows).with_bbox(BoundingBox { x0, y0, x1, y1 })
}

impl TableBackend for LayoutBackend {
    fn source(&self) -> &str {
        LAYOUT_SOURCE
    }

    fn extract_page(&self, page: &PageContent) -> Result<Vec<RawTable>, BackendError> {
        let lines = self.lines(page);
        Ok(self
            .regions(lines)
            .iter()
            .map(|region| region_table(region))
            .collect())
    }
}
