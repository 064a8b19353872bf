// CSV/TSV catalog import

use std::fs;
use std::path::Path;

use pricewise_pricing::CellValue;
use tracing::{debug, warn};

use crate::error::IoError;

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Records looked at when choosing a delimiter: the header plus a few rows.
const SNIFF_RECORDS: usize = 8;

/// Read a delimited file into a grid. The delimiter is sniffed unless given.
///
/// Every non-empty field becomes text; numbers and dates are typed later by
/// the pipeline's coercion.
pub fn read_grid(path: &Path, delimiter: Option<u8>) -> Result<Vec<Vec<CellValue>>, IoError> {
    let bytes = fs::read(path).map_err(|e| IoError::open(path, e))?;
    let content = decode(path, bytes);
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "reading delimited file");

    records(&content, delimiter)
        .map(|record| {
            let record = record.map_err(|e| IoError::read(path, e))?;
            Ok(record
                .iter()
                .map(|field| match field {
                    "" => CellValue::Empty,
                    text => CellValue::Text(text.to_string()),
                })
                .collect())
        })
        .collect()
}

fn records(content: &str, delimiter: u8) -> ::csv::StringRecordsIntoIter<&[u8]> {
    ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .into_records()
}

/// Catalog files start with a header row. Pick the delimiter that splits the
/// header widest, as long as most sampled rows agree with its width. Comma
/// wins when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    let mut best = (b',', 1);
    for delimiter in DELIMITERS {
        let widths: Vec<usize> = records(content, delimiter)
            .take(SNIFF_RECORDS)
            .map_while(Result::ok)
            .map(|r| r.len())
            .collect();
        let Some((&header, rows)) = widths.split_first() else {
            continue;
        };
        let agreeing = rows.iter().filter(|&&w| w == header).count();
        if header > best.1 && agreeing * 2 >= rows.len() {
            best = (delimiter, header);
        }
    }
    best.0
}

/// Honour a byte-order mark, else UTF-8, else Windows-1252 (what Excel
/// writes for "CSV" on most desktops).
fn decode(path: &Path, bytes: Vec<u8>) -> String {
    if let Some((encoding, bom)) = encoding_rs::Encoding::for_bom(&bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom..]);
        return text.into_owned();
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "file is not UTF-8, decoding as Windows-1252");
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(err.as_bytes());
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("a|b\n1|2\n"), b'|');
        assert_eq!(sniff_delimiter("Material\n1001\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn comma_inside_quotes_does_not_win() {
        let content = "Name;Size;Total\n\"Vodka, Premium\";750ML;80\n\"Gin, Dry\";1L;60\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn empty_fields_are_empty_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("costs.csv");
        fs::write(&path, "Material,Supplier,Total\n1001,,80.5\n").unwrap();
        let grid = read_grid(&path, None).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1][0], CellValue::Text("1001".into()));
        assert_eq!(grid[1][1], CellValue::Empty);
        assert_eq!(grid[1][2].as_number(), Some(80.5));
    }

    #[test]
    fn windows_1252_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Caf\xe9" is not valid UTF-8
        fs::write(&path, b"Name,Size\nCaf\xe9,750ML\n").unwrap();
        let grid = read_grid(&path, None).unwrap();
        assert_eq!(grid[1][0], CellValue::Text("Café".into()));
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Material,Total\n1,2\n").unwrap();
        let grid = read_grid(&path, None).unwrap();
        assert_eq!(grid[0][0], CellValue::Text("Material".into()));
    }

    #[test]
    fn utf16_export_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("utf16.txt");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Material\tTotal\n1001\t80\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&path, bytes).unwrap();
        let grid = read_grid(&path, None).unwrap();
        assert_eq!(grid[0][1], CellValue::Text("Total".into()));
        assert_eq!(grid[1][0], CellValue::Text("1001".into()));
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = read_grid(Path::new("/nonexistent/costs.csv"), None).unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
    }
}
