//! # Database Handlers
//!
//! A [`DatabaseHandler`] persists validated tables and reads rows back.
//! [`DuckDbHandler`] is the bundled implementation.
use crate::config::DbCredentials;
use crate::error::SheetIngestError;
use crate::table::Table;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub mod column;
mod duckdb_handler;

pub use duckdb_handler::DuckDbHandler;

/// SQL identifiers accepted for resource and column names
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Hardcode regex pattern"));

/// Errors raised by database handlers.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Not connected to a database. Try 'connect_with_db' first.")]
    NotConnected,

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Table '{0}' does not exist")]
    UnknownResource(String),

    #[error("Column '{column}' does not exist in table '{resource}'")]
    UnknownColumn { resource: String, column: String },
}

/// Persists and retrieves resource rows.
pub trait DatabaseHandler {
    /// Replaces the credentials used by the next `connect_with_db`.
    fn set_credentials(&mut self, credentials: DbCredentials);

    /// Opens the connection and starts a transaction.
    fn connect_with_db(&mut self) -> Result<(), SheetIngestError>;

    /// Ends the transaction, rolling back when `rollback` is set, and closes the connection.
    fn close_db_connection(&mut self, rollback: bool) -> Result<(), SheetIngestError>;

    /// Inserts every row of `data` into the table named `resource_name`.
    /// Returns the number of inserted rows.
    fn insert_resource_data(&mut self, resource_name: &str, data: &Table) -> Result<usize, SheetIngestError>;

    /// Loads the rows of `resource_name` that match any row of `keys` on its
    /// non-missing cells. An empty `keys` table selects every row.
    fn load_resource_data(&mut self, resource_name: &str, keys: &Table) -> Result<Table, SheetIngestError>;
}

/// Checks that `name` is a plain identifier.
pub(crate) fn check_identifier(name: &str) -> Result<&str, DatabaseError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_owned()))
    }
}

/// Double-quotes an identifier so keywords such as `at` or `order` can be
/// used as names.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
