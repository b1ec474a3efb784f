use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use pdf_table_extract::{
    BackendSelection, ExtractError, ExtractOptions, ExtractedDocument, PageSelection,
    extract_pdf_to_dir,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdftables",
    version,
    about = "Extract text and cross-validated tables from a PDF"
)]
struct Cli {
    /// Input PDF path.
    input: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Minimum cells per row for the stream backend.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Skip the layout-aware backend.
    #[arg(long)]
    no_layout: bool,

    /// Skip the stream backend.
    #[arg(long)]
    no_stream: bool,

    /// Skip the lattice backend.
    #[arg(long)]
    no_lattice: bool,

    /// Print every warning.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_options(cli: &Cli) -> Result<ExtractOptions> {
    let pages = cli
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    Ok(ExtractOptions {
        pages,
        min_cols: cli.min_cols,
        backends: BackendSelection {
            layout: !cli.no_layout,
            stream: !cli.no_stream,
            lattice: !cli.no_lattice,
        },
    })
}

fn require_input(input: Option<&Path>) -> Result<&Path, ExtractError> {
    let input = input.ok_or_else(|| ExtractError::MissingInput(PathBuf::new()))?;
    if !input.exists() {
        return Err(ExtractError::MissingInput(input.to_path_buf()));
    }
    Ok(input)
}

fn print_summary(document: &ExtractedDocument, output: &Path, verbose: bool) {
    println!(
        "{}: {} page(s), {} block(s), {} table(s) -> {}",
        document.source_name,
        document.page_count,
        document.blocks.len(),
        document.tables.len(),
        output.display()
    );
    for line in &document.audit {
        println!("  {line}");
    }

    if document.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", document.warnings.len());
    if verbose {
        for warning in &document.warnings {
            eprintln!(
                "  - {:?} page={:?} source={:?}: {}",
                warning.code, warning.page, warning.source, warning.message
            );
        }
    }
}

fn run(cli: &Cli, input: &Path) -> Result<ExtractedDocument> {
    let options = parse_options(cli)?;
    extract_pdf_to_dir(input, &cli.output, &options)
        .with_context(|| format!("failed to extract '{}'", input.display()))
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_table_extract=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let input = match require_input(cli.input.as_deref()) {
        Ok(input) => input,
        Err(ExtractError::MissingInput(path)) if path.as_os_str().is_empty() => {
            eprintln!("error: no input PDF given");
            eprintln!("usage: pdftables <INPUT> [-o <DIR>]");
            return ExitCode::from(1);
        }
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(1);
        }
    };

    match run(&cli, input) {
        Ok(document) => {
            print_summary(&document, &cli.output, cli.verbose);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
