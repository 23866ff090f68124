//! # Spreadsheet Import
//!
//! Importers turn a spreadsheet [`Source`] into a [`Table`]. The [`Importer`]
//! trait is the seam used by [`crate::resource::Resource`]; [`XlsxImporter`]
//! is the bundled implementation for Excel 2007+ workbooks.
use crate::database::column::ColumnType;
use crate::error::SheetIngestError;
use crate::table::{Column, Table};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub(crate) mod cell;
mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub mod xlsx;

pub use xlsx::XlsxImporter;

/// Errors raised while opening a workbook or reading a sheet.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("File not found: '{0}'")]
    FileNotFound(String),

    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("No sheets found in '{0}'")]
    EmptyWorkbook(String),

    #[error("Sheet '{sheet}' not found in '{source_name}'")]
    SheetNotFound { sheet: String, source_name: String },

    #[error("The generated table is empty after reading the file {0}.")]
    EmptyTable(String),

    #[error("Invalid cell value at {sheet}!{reference}: {message}")]
    CellValueError {
        sheet: String,
        reference: String,
        message: String,
    },

    #[error("Cannot convert column '{column}' row '{row}' to {kind}: {message}")]
    ColumnTypeError {
        column: String,
        row: usize,
        kind: &'static str,
        message: String,
    },
}

/// Where an importer reads from: a file on disk or bytes already in memory.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Selects the sheet to read, by name or by zero-based position.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Section {
    Index(usize),
    Name(String),
}

impl Default for Section {
    fn default() -> Self {
        Section::Index(0)
    }
}

impl From<&str> for Section {
    fn from(name: &str) -> Self {
        Section::Name(name.to_owned())
    }
}

impl From<usize> for Section {
    fn from(index: usize) -> Self {
        Section::Index(index)
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Index(index) => write!(f, "#{}", index),
            Section::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Loads a table from an external source.
pub trait Importer {
    /// Reads `section` of `source` into a table. The first row of the
    /// section holds the column names.
    ///
    /// `types` optionally forces columns to a given type.
    ///
    /// # Errors
    ///
    /// Fails when the source or section does not exist, the file cannot be
    /// parsed, a forced type cannot be applied, or no data rows were found.
    fn load_data(
        &self,
        source: &Source,
        section: &Section,
        types: Option<&HashMap<String, ColumnType>>,
    ) -> Result<Table, SheetIngestError>;
}

/// Converts the columns named in `types`; other columns are kept as loaded.
pub(crate) fn apply_column_types(
    table: Table,
    types: &HashMap<String, ColumnType>,
) -> Result<Table, SheetIngestError> {
    let columns = table
        .columns()
        .iter()
        .map(|column| match types.get(column.name()) {
            Some(kind) => {
                let cells = column
                    .iter()
                    .map(|(row, cell)| {
                        kind.coerce(cell).map_err(|message| SpreadsheetError::ColumnTypeError {
                            column: column.name().to_owned(),
                            row: crate::validation::human_row(row),
                            kind: kind.as_str(),
                            message,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Column::new(column.name(), cells))
            }
            None => Ok(column.to_owned()),
        })
        .collect::<Result<Vec<_>, SheetIngestError>>()?;
    Ok(Table::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Scalar};

    #[test]
    fn section_from_json() {
        let name: Section = serde_json::from_str("\"Users\"").unwrap();
        let index: Section = serde_json::from_str("2").unwrap();
        assert_eq!(name, Section::Name("Users".to_owned()));
        assert_eq!(index, Section::Index(2));
    }

    #[test]
    fn source_display() {
        assert_eq!(Source::from("files/a.xlsx").to_string(), "files/a.xlsx");
        assert_eq!(Source::from(vec![1u8, 2, 3]).to_string(), "<3 bytes>");
    }

    #[test]
    fn column_types_are_applied() {
        let table = Table::from_rows(
            &["code", "amount"],
            vec![
                vec![CellValue::Other(Scalar::Integer(7)), CellValue::text("12.5")],
                vec![CellValue::Empty, CellValue::text("3")],
            ],
        )
        .unwrap();
        let types = HashMap::from([
            ("code".to_string(), ColumnType::Varchar),
            ("amount".to_string(), ColumnType::Double),
        ]);

        let table = apply_column_types(table, &types).unwrap();

        assert_eq!(
            table.column("code").unwrap().cells(),
            &[CellValue::text("7"), CellValue::Empty]
        );
        assert_eq!(
            table.column("amount").unwrap().cells(),
            &[CellValue::Other(Scalar::Double(12.5)), CellValue::Other(Scalar::Double(3.0))]
        );
    }

    #[test]
    fn column_type_errors_name_the_row() {
        let table = Table::from_rows(&["amount"], vec![vec![CellValue::text("ten")]]).unwrap();
        let types = HashMap::from([("amount".to_string(), ColumnType::BigInt)]);

        let error = apply_column_types(table, &types).err().unwrap();

        assert_eq!(
            error.to_string(),
            "Cannot convert column 'amount' row '2' to bigint: parse 'ten' to bigint failed"
        );
    }
}
