use tracing::{debug, warn};

use crate::error::BackendError;
use crate::model::{PageContent, RawTable, TableCandidate};
use crate::options::ExtractOptions;
use crate::table_lattice::LatticeBackend;
use crate::table_layout::LayoutBackend;
use crate::table_stream::StreamBackend;
use crate::warning::{ExtractWarning, WarningCode};

/// A table extraction strategy. `source()` names the candidates it produces.
pub trait TableBackend {
    fn source(&self) -> &str;

    fn extract_page(&self, page: &PageContent) -> Result<Vec<RawTable>, BackendError>;

    /// Runs every page in order. The first failing page aborts the backend.
    fn extract_document(
        &self,
        pages: &[PageContent],
    ) -> Result<Vec<(u32, RawTable)>, BackendError> {
        extract_each_page(self, pages)
    }
}

/// Per-page tables tagged with their page number, in page order.
pub(crate) fn extract_each_page<B: TableBackend + ?Sized>(
    backend: &B,
    pages: &[PageContent],
) -> Result<Vec<(u32, RawTable)>, BackendError> {
    let mut out = Vec::new();
    for page in pages {
        out.extend(
            backend
                .extract_page(page)?
                .into_iter()
                .map(|table| (page.page_number, table)),
        );
    }
    Ok(out)
}

/// Backends configured by `options`: the per-page layout backend and the
/// document-level backends in run order.
pub(crate) fn default_backends(
    options: &ExtractOptions,
) -> (Option<Box<dyn TableBackend>>, Vec<Box<dyn TableBackend>>) {
    let layout = options
        .backends
        .layout
        .then(|| Box::new(LayoutBackend::default()) as Box<dyn TableBackend>);

    let mut document: Vec<Box<dyn TableBackend>> = Vec::new();
    if options.backends.stream {
        document.push(Box::new(StreamBackend::new(options.min_cols)));
    }
    if options.backends.lattice {
        document.push(Box::new(LatticeBackend::default()));
    }

    (layout, document)
}

pub(crate) fn to_candidates(
    source: &str,
    page: u32,
    tables: impl IntoIterator<Item = RawTable>,
) -> Vec<TableCandidate> {
    tables
        .into_iter()
        .filter_map(|table| TableCandidate::from_raw(page, source, table))
        .collect()
}

/// Runs one document-level backend. A failure yields no candidates and a
/// `BackendUnavailable` warning.
pub(crate) fn run_document_backend(
    backend: &dyn TableBackend,
    pages: &[PageContent],
    warnings: &mut Vec<ExtractWarning>,
) -> Vec<TableCandidate> {
    match backend.extract_document(pages) {
        Ok(tables) => {
            let candidates = tables
                .into_iter()
                .filter_map(|(page, table)| TableCandidate::from_raw(page, backend.source(), table))
                .collect::<Vec<_>>();
            debug!(
                source = backend.source(),
                candidates = candidates.len(),
                "backend finished"
            );
            candidates
        }
        Err(error) => {
            warn!(source = backend.source(), %error, "table backend unavailable");
            warnings.push(
                ExtractWarning::new(WarningCode::BackendUnavailable, error.to_string())
                    .with_source(backend.source()),
            );
            Vec::new()
        }
    }
}
