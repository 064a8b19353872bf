//! `pricewise-io`: file boundary of the pricing pipeline.
//!
//! Loading: Excel workbooks (xlsx, xls, xlsb, ods) through calamine and
//! delimited text through csv, both into `pricewise_pricing::Table`.
//! Rendering: a `PricingReport` into an xlsx workbook.

pub mod catalog;
pub mod csv;
pub mod error;
pub mod render;
pub mod styles;
pub mod xlsx;

pub use catalog::{inspect, load_table, SheetInfo};
pub use error::IoError;
pub use render::{render_report, write_report};
