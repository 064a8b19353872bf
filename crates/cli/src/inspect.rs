// `pricewise inspect`: sheet names, row counts and headers of a catalog.

use std::path::PathBuf;

use pricewise_io::{inspect, SheetInfo};

use crate::exit_codes::io_exit_code;
use crate::CliError;

fn print_text(sheets: &[SheetInfo]) {
    for info in sheets {
        println!("{} ({} rows)", info.name, info.rows);
        for (i, header) in info.headers.iter().enumerate() {
            if !header.is_empty() {
                println!("  {:>3}  {}", i + 1, header);
            }
        }
    }
}

pub fn cmd_inspect(file: PathBuf, sheet: Option<String>, json: bool) -> Result<(), CliError> {
    let sheets = inspect(&file, sheet.as_deref()).map_err(|e| {
        let err = CliError {
            code: io_exit_code(&e),
            message: e.to_string(),
            hint: None,
        };
        match e {
            pricewise_io::IoError::MissingSheet { .. } => {
                err.with_hint(format!("run `pricewise inspect {}` to list its sheets", file.display()))
            }
            _ => err,
        }
    })?;

    if json {
        let out = serde_json::to_string(&sheets).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", out);
    } else {
        print_text(&sheets);
    }
    Ok(())
}
