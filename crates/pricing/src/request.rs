//! Validated run request: vendor id, GP2 threshold, as-of date.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// User-facing request validation failures. These never reach the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid Vendor ID. It must be a 6-digit number starting with '3'.")]
    InvalidVendorId(String),
    #[error("Invalid GP2 threshold. Please enter a number between 0 and 1 (e.g. 0.30).")]
    InvalidThreshold(String),
    #[error("Invalid as-of date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),
}

/// A six-digit vendor id starting with `3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VendorId(String);

impl VendorId {
    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let s = input.trim();
        let valid = s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) && s.starts_with('3');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(RequestError::InvalidVendorId(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a GP2 threshold: a finite decimal in `[0, 1]`.
pub fn parse_threshold(input: &str) -> Result<f64, RequestError> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
        .ok_or_else(|| RequestError::InvalidThreshold(input.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub vendor_id: VendorId,
    pub threshold: f64,
    pub as_of: NaiveDate,
}

impl ReportRequest {
    /// Validate raw request input. A missing as-of date means `today`.
    pub fn parse(
        vendor_id: &str,
        threshold: &str,
        as_of: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, RequestError> {
        let vendor_id = VendorId::parse(vendor_id)?;
        let threshold = parse_threshold(threshold)?;
        let as_of = match as_of.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| RequestError::InvalidDate(s.to_string()))?,
            None => today,
        };
        Ok(Self {
            vendor_id,
            threshold,
            as_of,
        })
    }
}
