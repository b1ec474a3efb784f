mod assemble;
mod cross_validate;
mod csv_out;
mod error;
mod geometry;
mod html_out;
mod json_out;
mod markdown_out;
mod model;
mod options;
mod pdf_reader;
mod score;
mod segment;
mod source;
mod table_detect;
mod table_lattice;
mod table_layout;
mod table_parse;
mod table_stream;
mod warning;
mod xlsx_out;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::assemble::assemble;
use crate::csv_out::{table_file_name, write_table_csv};
use crate::html_out::write_html;
use crate::json_out::{document_record, write_json};
use crate::markdown_out::write_markdown;
use crate::pdf_reader::{LoadedPage, read_pdf_pages_from_bytes};
use crate::table_detect::{default_backends, run_document_backend, to_candidates};
use crate::xlsx_out::write_xlsx;

pub use cross_validate::{CrossValidation, cross_validate};
pub use error::{BackendError, ExtractError};
pub use model::{
    BlockKind, BoundingBox, PageContent, RawTable, RuleSegment, TableCandidate, TextBlock,
    TextFragment, ValidatedTable,
};
pub use options::{BackendSelection, ExtractOptions, PageSelection};
pub use score::score_table;
pub use segment::{classify_block, segment_page};
pub use source::{DocumentSource, MemorySource, PathSource};
pub use table_detect::TableBackend;
pub use table_lattice::{LATTICE_SOURCE, LatticeBackend};
pub use table_layout::{LAYOUT_SOURCE, LayoutBackend};
pub use table_stream::{STREAM_SOURCE, StreamBackend};
pub use warning::{ExtractWarning, WarningCode};

pub const MARKDOWN_FILE: &str = "extracted_text.md";
pub const HTML_FILE: &str = "extracted_text.html";
pub const JSON_FILE: &str = "extracted_data.json";
pub const TABLES_DIR: &str = "tables";
pub const WORKBOOK_FILE: &str = "all_tables.xlsx";
pub const REPORT_FILE: &str = "comparison_report.txt";

/// Everything recovered from one document, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source_name: String,
    /// Number of pages that went through extraction.
    pub page_count: usize,
    pub blocks: Vec<TextBlock>,
    pub tables: Vec<ValidatedTable>,
    /// One line per page where more than one candidate competed.
    pub audit: Vec<String>,
    pub warnings: Vec<ExtractWarning>,
}

pub struct Extractor {
    options: ExtractOptions,
    layout: Option<Box<dyn TableBackend>>,
    document_backends: Vec<Box<dyn TableBackend>>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("options", &self.options)
            .field("layout", &self.layout.as_ref().map(|backend| backend.source()))
            .field(
                "document_backends",
                &self
                    .document_backends
                    .iter()
                    .map(|backend| backend.source())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn validate_options(options: &ExtractOptions) -> Result<(), ExtractError> {
    if options.min_cols < 2 {
        return Err(ExtractError::InvalidOption(
            "min_cols must be at least 2".to_string(),
        ));
    }
    Ok(())
}

impl Extractor {
    /// Extractor with the built-in backends enabled in `options`.
    pub fn new(options: ExtractOptions) -> Result<Self, ExtractError> {
        validate_options(&options)?;
        let (layout, document_backends) = default_backends(&options);
        Ok(Self {
            options,
            layout,
            document_backends,
        })
    }

    /// Extractor with caller-supplied backends. `layout` runs per page and
    /// places table markers; `document_backends` run afterwards, in order.
    #[must_use]
    pub fn with_backends(
        options: ExtractOptions,
        layout: Option<Box<dyn TableBackend>>,
        document_backends: Vec<Box<dyn TableBackend>>,
    ) -> Self {
        Self {
            options,
            layout,
            document_backends,
        }
    }

    pub fn extract_source(
        &self,
        source: &dyn DocumentSource,
    ) -> Result<ExtractedDocument, ExtractError> {
        validate_options(&self.options)?;
        debug!(
            name = source.name(),
            content_type = source.content_type(),
            "reading document"
        );
        let bytes = source.read_bytes()?;
        let pages = read_pdf_pages_from_bytes(&bytes, self.options.pages.as_ref())?;
        Ok(self.run(source.name(), pages))
    }

    /// Runs the pipeline on pages that are already in memory.
    pub fn extract_pages(
        &self,
        source_name: &str,
        pages: Vec<PageContent>,
    ) -> Result<ExtractedDocument, ExtractError> {
        validate_options(&self.options)?;
        let pages = pages
            .into_iter()
            .filter(|page| {
                self.options
                    .pages
                    .as_ref()
                    .is_none_or(|selection| selection.contains(page.page_number))
            })
            .map(|content| LoadedPage {
                content,
                geometry_error: None,
            })
            .collect::<Vec<_>>();
        if pages.is_empty() {
            return Err(ExtractError::NoPagesSelected);
        }

        Ok(self.run(source_name, pages))
    }

    fn layout_page(
        &self,
        loaded: &LoadedPage,
        blocks: &mut Vec<TextBlock>,
        candidates: &mut Vec<TableCandidate>,
        warnings: &mut Vec<ExtractWarning>,
    ) {
        let Some(layout) = &self.layout else {
            return;
        };
        let page = &loaded.content;

        let result = match &loaded.geometry_error {
            Some(error) => Err(error.to_string()),
            None => layout
                .extract_page(page)
                .map_err(|error| error.to_string()),
        };

        match result {
            Ok(tables) => {
                let found = to_candidates(layout.source(), page.page_number, tables);
                blocks.extend(
                    (1..=found.len()).map(|ordinal| TextBlock::table_marker(page.page_number, ordinal)),
                );
                candidates.extend(found);
            }
            Err(message) => {
                warn!(page = page.page_number, %message, "layout tables skipped");
                warnings.push(
                    ExtractWarning::new(WarningCode::LayoutPageSkipped, message)
                        .with_page(page.page_number)
                        .with_source(layout.source()),
                );
            }
        }
    }

    fn run(&self, source_name: &str, pages: Vec<LoadedPage>) -> ExtractedDocument {
        info!(source = source_name, pages = pages.len(), "extracting document");

        let mut warnings = Vec::new();
        let mut blocks = Vec::new();
        let mut candidates = Vec::new();

        for loaded in &pages {
            blocks.extend(segment_page(&loaded.content));
            self.layout_page(loaded, &mut blocks, &mut candidates, &mut warnings);
        }

        let contents = pages
            .into_iter()
            .map(|loaded| loaded.content)
            .collect::<Vec<_>>();
        for backend in &self.document_backends {
            candidates.extend(run_document_backend(
                backend.as_ref(),
                &contents,
                &mut warnings,
            ));
        }

        let CrossValidation { tables, report } = cross_validate(&candidates);
        info!(
            blocks = blocks.len(),
            candidates = candidates.len(),
            tables = tables.len(),
            "cross-validation finished"
        );

        if tables.is_empty() {
            warnings.push(ExtractWarning::new(
                WarningCode::NoTablesDetected,
                "no tables were detected in the selected pages",
            ));
        }
        warnings.extend(assemble(&blocks, &tables).warnings);

        ExtractedDocument {
            source_name: source_name.to_string(),
            page_count: contents.len(),
            blocks,
            tables,
            audit: report,
            warnings,
        }
    }
}

/// Renders `document` into `output_dir` and returns the written paths.
pub fn write_outputs(
    document: &ExtractedDocument,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractError> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let assembly = assemble(&document.blocks, &document.tables);

    let markdown_path = output_dir.join(MARKDOWN_FILE);
    write_markdown(&markdown_path, &assembly)?;
    written.push(markdown_path);

    let html_path = output_dir.join(HTML_FILE);
    write_html(&html_path, &assembly)?;
    written.push(html_path);

    let json_path = output_dir.join(JSON_FILE);
    let record = document_record(
        &document.source_name,
        document.page_count,
        &document.blocks,
        &document.tables,
    );
    write_json(&json_path, &record)?;
    written.push(json_path);

    if !document.tables.is_empty() {
        let tables_dir = output_dir.join(TABLES_DIR);
        fs::create_dir_all(&tables_dir)?;
        for (index, table) in document.tables.iter().enumerate() {
            let csv_path = tables_dir.join(table_file_name(table, index + 1));
            write_table_csv(&csv_path, table)?;
            written.push(csv_path);
        }

        let workbook_path = tables_dir.join(WORKBOOK_FILE);
        write_xlsx(&workbook_path, &document.tables)?;
        written.push(workbook_path);
    }

    if !document.audit.is_empty() {
        let report_path = output_dir.join(REPORT_FILE);
        fs::write(&report_path, document.audit.join("\n"))?;
        written.push(report_path);
    }

    info!(
        dir = %output_dir.display(),
        files = written.len(),
        "outputs written"
    );
    Ok(written)
}

pub fn extract_pdf_to_dir(
    input_pdf: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractedDocument, ExtractError> {
    let source = PathSource::open(input_pdf)?;
    let document = Extractor::new(options.clone())?.extract_source(&source)?;
    write_outputs(&document, output_dir)?;
    Ok(document)
}

pub fn extract_pdf_bytes(
    name: &str,
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<ExtractedDocument, ExtractError> {
    let source = MemorySource::pdf(name, input_pdf.to_vec());
    Extractor::new(options.clone())?.extract_source(&source)
}
