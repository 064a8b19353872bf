//! `pricewise-pricing`: vendor pricing pipeline.
//!
//! Pure engine crate: receives pre-loaded catalog tables, returns a typed
//! report (flat views, pivot tables, summary). No CLI or file IO.

pub mod allocate;
pub mod chain;
pub mod cogs;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod filter;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod pivot;
pub mod report;
pub mod request;
pub mod schema;
pub mod table;
pub mod views;

pub use config::PipelineConfig;
pub use engine::{run, Catalogs};
pub use error::{ErrorKind, PricingError};
pub use model::ProductRow;
pub use report::{PricingReport, RunSummary};
pub use request::{ReportRequest, RequestError, VendorId};
pub use table::{CellValue, HeaderRow, Table};
