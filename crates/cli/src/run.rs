// `pricewise run`: load catalogs, run the pipeline, persist the workbook.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Args;
use pricewise_io::{load_table, render_report, IoError};
use pricewise_pricing::{run, Catalogs, HeaderRow, PipelineConfig, PricingReport, ReportRequest};
use tracing::info;

use crate::exit_codes::{io_exit_code, pricing_exit_code, EXIT_INPUT, EXIT_RENDER};
use crate::{settings, CliError};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Vendor id: six digits starting with 3
    #[arg(long)]
    pub vendor: String,

    /// GP2 threshold as a fraction, e.g. 0.25
    #[arg(long)]
    pub threshold: String,

    /// As-of date (YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<String>,

    /// Price book (default: <source-dir>/<sources.price_book_file>)
    #[arg(long, value_name = "FILE")]
    pub price_book: Option<PathBuf>,

    /// Cost catalog (default: <source-dir>/<sources.cost_catalog_file>)
    #[arg(long, value_name = "FILE")]
    pub cost_catalog: Option<PathBuf>,

    /// Chain pricing catalog; skipped when the default file is absent
    #[arg(long, value_name = "FILE")]
    pub chain_pricing: Option<PathBuf>,

    /// Directory holding the catalog files
    #[arg(long, value_name = "DIR", env = "PRICEWISE_SOURCE_DIR", default_value = ".")]
    pub source_dir: PathBuf,

    /// Directory the report is written to
    #[arg(long, value_name = "DIR", env = "PRICEWISE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Pipeline config (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print a JSON run summary instead of the output path
    #[arg(long)]
    pub json: bool,
}

fn io_error(err: IoError) -> CliError {
    CliError {
        code: io_exit_code(&err),
        message: err.to_string(),
        hint: None,
    }
}

/// Resolve catalog paths against the source directory.
fn catalog_paths(args: &RunArgs, config: &PipelineConfig) -> (PathBuf, PathBuf, Option<PathBuf>) {
    let sources = &config.sources;
    let price_book = args
        .price_book
        .clone()
        .unwrap_or_else(|| args.source_dir.join(&sources.price_book_file));
    let cost_catalog = args
        .cost_catalog
        .clone()
        .unwrap_or_else(|| args.source_dir.join(&sources.cost_catalog_file));
    let chain = match &args.chain_pricing {
        Some(path) => Some(path.clone()),
        None => {
            let path = args.source_dir.join(&sources.chain_pricing_file);
            if path.is_file() {
                Some(path)
            } else {
                info!(path = %path.display(), "no chain pricing file, chain view will be empty");
                None
            }
        }
    };
    (price_book, cost_catalog, chain)
}

fn load_catalogs(args: &RunArgs, config: &PipelineConfig) -> Result<Catalogs, CliError> {
    let (price_book_path, cost_path, chain_path) = catalog_paths(args, config);
    let sources = &config.sources;

    let price_book = load_table(
        &price_book_path,
        sources.price_book_sheet.as_deref(),
        HeaderRow::First,
    )
    .map_err(io_error)?;
    let cost_catalog = load_table(
        &cost_path,
        sources.cost_catalog_sheet.as_deref(),
        HeaderRow::First,
    )
    .map_err(io_error)?;
    let chain_pricing = chain_path
        .map(|path| {
            load_table(
                &path,
                sources.chain_pricing_sheet.as_deref(),
                HeaderRow::Marker {
                    column: 0,
                    needle: &config.chain.header_marker,
                },
            )
        })
        .transpose()
        .map_err(io_error)?;

    Ok(Catalogs {
        price_book,
        cost_catalog,
        chain_pricing,
    })
}

/// Write the workbook to a temp file in `dir`, then move it into place.
fn persist(report: &PricingReport, dir: &Path) -> Result<PathBuf, CliError> {
    let render_err = |message: String| CliError {
        code: EXIT_RENDER,
        message,
        hint: None,
    };

    fs::create_dir_all(dir)
        .map_err(|e| render_err(format!("cannot create {}: {}", dir.display(), e)))?;
    let bytes = render_report(report).map_err(io_error)?;

    let target = dir.join(report.file_name(Local::now().naive_local()));
    let mut tmp = tempfile::Builder::new()
        .prefix(".pricewise-")
        .suffix(".xlsx")
        .tempfile_in(dir)
        .map_err(|e| render_err(format!("cannot create temp file in {}: {}", dir.display(), e)))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| render_err(format!("failed to write report: {}", e)))?;
    tmp.persist(&target)
        .map_err(|e| render_err(format!("cannot move report to {}: {}", target.display(), e.error)))?;
    Ok(target)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let today = Local::now().date_naive();
    let request = ReportRequest::parse(&args.vendor, &args.threshold, args.as_of.as_deref(), today)
        .map_err(|e| CliError::usage(e.to_string()))?;

    let config = settings::load(args.config.as_deref())?;
    let catalogs = load_catalogs(&args, &config)?;

    let report = run(&config, &request, &catalogs).map_err(|e| {
        let code = pricing_exit_code(e.kind());
        let hint = (code == EXIT_INPUT)
            .then(|| "run `pricewise inspect <FILE>` to see the headers of a catalog".to_string());
        CliError {
            code,
            message: e.to_string(),
            hint,
        }
    })?;

    let path = persist(&report, &args.output_dir)?;
    info!(path = %path.display(), "report saved");

    if args.json {
        let out = serde_json::json!({
            "output": path,
            "vendor_id": report.vendor_id,
            "vendor_name": report.vendor_name,
            "threshold": report.threshold,
            "as_of": report.as_of,
            "sheets": report.sheets.iter().map(|s| &s.name).collect::<Vec<_>>(),
            "summary": report.summary,
        });
        println!("{}", out);
    } else {
        println!("{}", path.display());
    }
    Ok(())
}
