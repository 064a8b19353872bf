use thiserror::Error;

/// Errors returned by the pricing pipeline.
///
/// Data-quality problems (non-numeric cells, inconsistent price groups,
/// malformed pivot keys) are never errors; they are logged and surfaced as
/// report content instead.
#[derive(Debug, Error)]
pub enum PricingError {
    /// A column the pipeline cannot work without is absent.
    #[error("{table}: missing required column '{column}' (available: {available})")]
    MissingColumn {
        table: String,
        column: String,
        available: String,
    },
    /// The table exists but cannot be used (no header row, bad layout, ...).
    #[error("{table}: {message}")]
    Input { table: String, message: String },
    /// No rows remain for the requested vendor.
    #[error("vendor ID {vendor_id} not found")]
    VendorNotFound { vendor_id: String },
    /// None of the allow-listed cost columns exist in the cost catalog.
    #[error("no matching columns found for merging data: '{table}' has none of the configured cost columns")]
    NoMergeColumns { table: String },
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error.
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}

/// Coarse classification used by callers to pick an exit status or message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    NotFound,
    Config,
}

impl PricingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingColumn { .. } | Self::Input { .. } => ErrorKind::Input,
            Self::VendorNotFound { .. } | Self::NoMergeColumns { .. } => ErrorKind::NotFound,
            Self::ConfigParse(_) | Self::ConfigValidation(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn missing_column(table: &str, column: &str, headers: &[String]) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
            available: headers.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let err = PricingError::VendorNotFound { vendor_id: "300123".into() };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "vendor ID 300123 not found");

        let err = PricingError::missing_column("ZPURCON", "Material", &["A".into(), "B".into()]);
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("'Material'"));
        assert!(err.to_string().contains("A, B"));

        assert_eq!(PricingError::ConfigParse("x".into()).kind(), ErrorKind::Config);
    }
}
