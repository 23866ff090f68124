//! # Sheet Ingest
//!
//! Loads tabular data from spreadsheets, validates it and transfers the
//! validated rows into a database.
//!
//! ## Components
//!
//! - [`spreadsheet`]: importers producing a [`Table`] from a file or bytes.
//!   [`spreadsheet::XlsxImporter`] reads `.xlsx`/`.xlsm` workbooks.
//! - [`validation`]: the rule set checked before any insert (missing required
//!   columns, missing required values, disallowed characters, leading and
//!   trailing whitespace), reported as one aggregated error.
//! - [`database`]: handlers persisting and reading tables.
//!   [`database::DuckDbHandler`] stores resources in DuckDB.
//! - [`resource`]: [`Resource`] wires an importer, the validation and a
//!   database handler together for one configured data set.
//!
//! ## Validation report
//!
//! ```text
//! Detected 2 problem(s):
//! - Missing required field(s):
//!    - email
//!
//! - Invalid last char: 'Trailing_space ' in column 'name' row '4'.
//! ```
pub mod config;
pub mod database;
pub mod error;
mod helpers;
pub mod logging;
pub mod resource;
pub mod spreadsheet;
pub mod table;
pub mod validation;

pub use config::{DbCredentials, ResourceConfig};
pub use error::SheetIngestError;
pub use resource::Resource;
pub use table::{CellValue, Column, Scalar, Table};
