use crate::score::score_table;

/// Axis-aligned box in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// A run of text placed at one position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub font_size: f64,
    pub text: String,
}

impl TextFragment {
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// A straight painted segment, normalized so that `(x0, y0)` is the lower-left end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl RuleSegment {
    #[must_use]
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    #[must_use]
    pub fn is_vertical(&self, tolerance: f64) -> bool {
        (self.x1 - self.x0) <= tolerance && (self.y1 - self.y0) > tolerance
    }

    #[must_use]
    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        (self.y1 - self.y0) <= tolerance && (self.x1 - self.x0) > tolerance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub page_number: u32,
    pub text: String,
    pub fragments: Vec<TextFragment>,
    pub rules: Vec<RuleSegment>,
    pub avg_font_size: f64,
}

impl PageContent {
    /// A page known only by its text, without geometry.
    #[must_use]
    pub fn from_text(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
            fragments: Vec::new(),
            rules: Vec::new(),
            avg_font_size: DEFAULT_FONT_SIZE,
        }
    }
}

pub(crate) const DEFAULT_FONT_SIZE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    ListItem,
    TableMarker { ordinal: usize },
}

impl BlockKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Paragraph => "paragraph",
            Self::ListItem => "list_item",
            Self::TableMarker { .. } => "table_marker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
    pub kind: BlockKind,
    pub level: usize,
    pub page: u32,
}

impl TextBlock {
    #[must_use]
    pub fn table_marker(page: u32, ordinal: usize) -> Self {
        Self {
            text: format!("[TABLE_{page}_{ordinal}]"),
            kind: BlockKind::TableMarker { ordinal },
            level: 0,
            page,
        }
    }
}

/// Table as a backend reports it, before row-count filtering and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
    pub native_confidence: Option<f64>,
    pub bbox: Option<BoundingBox>,
}

impl RawTable {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            native_confidence: None,
            bbox: None,
        }
    }

    #[must_use]
    pub fn with_native_confidence(mut self, confidence: f64) -> Self {
        self.native_confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCandidate {
    pub rows: Vec<Vec<String>>,
    pub page: u32,
    pub source: String,
    pub confidence: f64,
    pub bbox: Option<BoundingBox>,
}

impl TableCandidate {
    /// Returns `None` for header-only or empty tables.
    #[must_use]
    pub fn from_raw(page: u32, source: &str, raw: RawTable) -> Option<Self> {
        if raw.rows.len() < 2 {
            return None;
        }

        let confidence = raw
            .native_confidence
            .unwrap_or_else(|| score_table(&raw.rows))
            .clamp(0.0, 100.0);
        Some(Self {
            rows: raw.rows,
            page,
            source: source.to_string(),
            confidence,
            bbox: raw.bbox,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTable {
    pub rows: Vec<Vec<String>>,
    pub page: u32,
    pub source: String,
    pub confidence: f64,
    pub bbox: Option<BoundingBox>,
}

impl ValidatedTable {
    #[must_use]
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }
}

impl From<TableCandidate> for ValidatedTable {
    fn from(candidate: TableCandidate) -> Self {
        Self {
            rows: candidate.rows,
            page: candidate.page,
            source: candidate.source,
            confidence: candidate.confidence,
            bbox: candidate.bbox,
        }
    }
}
