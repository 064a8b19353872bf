use std::path::PathBuf;

use pricewise_pricing::PricingError;
use thiserror::Error;

/// Errors at the file boundary: opening and reading catalogs, writing the
/// report.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot open {}: {message}", path.display())]
    Open { path: PathBuf, message: String },
    #[error("{}: sheet '{sheet}' not found (available: {})", path.display(), available.join(", "))]
    MissingSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },
    #[error("{}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("{}: unsupported file type (expected xlsx, xls, xlsb, ods, csv or tsv)", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// The sheet was read but its layout is unusable (no header row, ...).
    #[error(transparent)]
    Layout(#[from] PricingError),
    #[error("failed to write report: {0}")]
    Write(String),
}

impl IoError {
    pub(crate) fn open(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn read(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for IoError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Write(err.to_string())
    }
}
