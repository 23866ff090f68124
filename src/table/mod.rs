//! # In-Memory Table
//!
//! The intermediate representation shared by importers, the validation
//! engine and database handlers: an ordered list of uniquely named columns,
//! each holding one [`CellValue`] per row.
use std::fmt::Display;
use thiserror::Error;

mod value;

pub use value::{CellValue, Scalar};

/// Errors raised while building a table.
#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("Column '{name}' has {actual} rows, expected {expected}")]
    UnevenColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Row {row} has {actual} cells, expected {expected}")]
    UnevenRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// A named column and its cells, aligned by row position.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    /// Iterates `(row_index, cell)` pairs, row indexes being zero-based.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &CellValue)> {
        self.cells.iter().enumerate()
    }
}

/// Ordered collection of named columns with a uniform row count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table from columns, checking that names are unique and that
    /// every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let rows = columns.first().map(|column| column.cells.len()).unwrap_or(0);
        for (index, column) in columns.iter().enumerate() {
            if column.cells.len() != rows {
                return Err(TableError::UnevenColumn {
                    name: column.name.to_owned(),
                    expected: rows,
                    actual: column.cells.len(),
                });
            }
            if columns[..index].iter().any(|other| other.name == column.name) {
                return Err(TableError::DuplicateColumn(column.name.to_owned()));
            }
        }
        Ok(Table { columns, rows })
    }

    /// Builds a table from a header and row-major records.
    pub fn from_rows<S>(header: &[S], records: Vec<Vec<CellValue>>) -> Result<Self, TableError>
    where
        S: AsRef<str>,
    {
        let mut cells: Vec<Vec<CellValue>> = header.iter().map(|_| Vec::with_capacity(records.len())).collect();
        for (row, record) in records.into_iter().enumerate() {
            if record.len() != header.len() {
                return Err(TableError::UnevenRow {
                    row,
                    expected: header.len(),
                    actual: record.len(),
                });
            }
            for (column, value) in record.into_iter().enumerate() {
                cells[column].push(value);
            }
        }
        let columns = header
            .iter()
            .zip(cells)
            .map(|(name, cells)| Column::new(name.as_ref(), cells))
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Keeps the rows for which `predicate` returns true.
    pub fn retain_rows<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let keep: Vec<usize> = (0..self.rows).filter(|row| predicate(*row)).collect();
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.to_owned(),
                cells: keep.iter().map(|row| column.cells[*row].to_owned()).collect(),
            })
            .collect();
        Table {
            columns,
            rows: keep.len(),
        }
    }

    /// Returns a copy of the table without the named column.
    pub fn without_column(&self, name: &str) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|column| column.name != name)
                .cloned()
                .collect(),
            rows: self.rows,
        }
    }
}

impl Display for Table {
    /// Renders an aligned text grid: header, separator and one line per row.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|column| column.cells.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&rendered)
            .map(|(column, cells)| {
                cells
                    .iter()
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", column.name, width = width))
            .collect();
        writeln!(f, "{}", header.join(" | ").trim_end())?;
        let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(f, "{}", separator.join("-+-"))?;
        for row in 0..self.rows {
            let line: Vec<String> = rendered
                .iter()
                .zip(&widths)
                .map(|(cells, width)| format!("{:<width$}", cells[row], width = width))
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
