//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, invalid vendor/threshold/date) |
//! | 3    | Input error (unreadable catalog, missing sheet or column) |
//! | 4    | Config error (TOML parse or validation)                   |
//! | 5    | Vendor not found / nothing to merge                       |
//! | 6    | Report could not be written                               |

use pricewise_io::IoError;
use pricewise_pricing::ErrorKind;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or request values.
pub const EXIT_USAGE: u8 = 2;

/// A catalog could not be opened, read, or understood.
pub const EXIT_INPUT: u8 = 3;

/// The pipeline config could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 4;

/// No rows for the requested vendor, or no mergeable cost columns.
pub const EXIT_NOT_FOUND: u8 = 5;

/// Rendering or persisting the report failed.
pub const EXIT_RENDER: u8 = 6;

/// Map a pipeline error kind to its exit code.
pub fn pricing_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Input => EXIT_INPUT,
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::Config => EXIT_CONFIG,
    }
}

/// Map a file-boundary error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Write(_) => EXIT_RENDER,
        IoError::Layout(e) => pricing_exit_code(e.kind()),
        IoError::Open { .. }
        | IoError::MissingSheet { .. }
        | IoError::Read { .. }
        | IoError::UnsupportedFormat { .. } => EXIT_INPUT,
    }
}
