//! Catalog loading: picks the reader from the file extension and turns the
//! raw grid into a `Table`.

use std::path::Path;

use pricewise_pricing::{CellValue, HeaderRow, Table};
use serde::Serialize;
use tracing::info;

use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Workbook,
    Delimited(Option<u8>),
}

fn detect_format(path: &Path) -> Result<Format, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Format::Workbook),
        "csv" | "txt" => Ok(Format::Delimited(None)),
        "tsv" => Ok(Format::Delimited(Some(b'\t'))),
        _ => Err(IoError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn read_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>, IoError> {
    match detect_format(path)? {
        Format::Workbook => crate::xlsx::read_grid(path, sheet),
        Format::Delimited(delimiter) => crate::csv::read_grid(path, delimiter),
    }
}

/// Load one catalog sheet as a table.
///
/// `sheet` is ignored for delimited files. The table is named after the file
/// so that missing-column errors point at it.
pub fn load_table(path: &Path, sheet: Option<&str>, header: HeaderRow<'_>) -> Result<Table, IoError> {
    let grid = read_grid(path, sheet)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let table = Table::from_grid(name, grid, header)?;
    info!(
        file = %table.name,
        rows = table.len(),
        columns = table.headers.len(),
        "catalog loaded"
    );
    Ok(table)
}

/// Shape of one sheet, for mapping a new catalog layout.
#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub name: String,
    /// Data rows below the first row.
    pub rows: usize,
    /// First-row headers.
    pub headers: Vec<String>,
}

/// Describe every sheet of a workbook, or only `sheet`.
pub fn inspect(path: &Path, sheet: Option<&str>) -> Result<Vec<SheetInfo>, IoError> {
    let names = match (detect_format(path)?, sheet) {
        (Format::Workbook, Some(s)) => vec![Some(s.to_string())],
        (Format::Workbook, None) => crate::xlsx::sheet_names(path)?.into_iter().map(Some).collect(),
        (Format::Delimited(_), _) => vec![None],
    };

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let grid = read_grid(path, name.as_deref())?;
        let label = name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let headers = grid
            .first()
            .map(|row| row.iter().filter_map(CellValue::as_text).collect())
            .unwrap_or_default();
        out.push(SheetInfo {
            name: label,
            rows: grid.len().saturating_sub(1),
            headers,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn format_from_extension() {
        assert_eq!(detect_format(Path::new("a.XLSX")).unwrap(), Format::Workbook);
        assert_eq!(detect_format(Path::new("a.ods")).unwrap(), Format::Workbook);
        assert_eq!(detect_format(Path::new("a.csv")).unwrap(), Format::Delimited(None));
        assert_eq!(detect_format(Path::new("a.tsv")).unwrap(), Format::Delimited(Some(b'\t')));
        assert!(matches!(
            detect_format(Path::new("a.pdf")),
            Err(IoError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn loads_csv_table_with_marker_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Chain_Pricing.csv");
        fs::write(
            &path,
            "Chain Pricing Report,,\nGenerated,2024-06-01,\nVENDOR ID,Vendor Name,Net Price\n300123,Acme,95\n",
        )
        .unwrap();
        let table = load_table(
            &path,
            None,
            HeaderRow::Marker {
                column: 0,
                needle: "vendor id",
            },
        )
        .unwrap();
        assert_eq!(table.name, "Chain_Pricing.csv");
        assert_eq!(table.headers, vec!["VENDOR ID", "Vendor Name", "Net Price"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_marker_is_layout_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = load_table(
            &path,
            None,
            HeaderRow::Marker {
                column: 0,
                needle: "vendor id",
            },
        )
        .unwrap_err();
        assert!(matches!(err, IoError::Layout(_)));
    }

    #[test]
    fn inspect_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("costs.csv");
        fs::write(&path, "Material,Supplier\n1,300123\n2,300123\n").unwrap();
        let info = inspect(&path, None).unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].name, "costs");
        assert_eq!(info[0].rows, 2);
        assert_eq!(info[0].headers, vec!["Material", "Supplier"]);
    }
}
