//! # Validation Engine
//!
//! Inspects a loaded [`Table`] for structural and content defects and
//! aggregates everything it finds into one [`ValidationReport`].
//!
//! The checks run in a fixed order:
//!
//! 1. required columns that are missing from the table,
//! 2. empty cells in the required columns that are present,
//! 3. disallowed characters and leading/trailing whitespace in every text cell.
//!
//! All checks run even when an earlier one found defects, so a single run
//! reports every problem. Validation never mutates the table or the list of
//! required fields; running it twice yields the same report.
use crate::table::Table;
use std::fmt::Display;
use thiserror::Error;

mod characters;
mod required;

/// Name of the column that selects the rows to manage
pub const MANAGE_COLUMN: &str = "manage";

/// Errors raised by [`validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing input_data. Try 'load_input_data' first.")]
    MissingInputData,

    #[error("No rows with data to manage. Check the manage column and enable some rows.")]
    NoRowsToManage,

    #[error("No rows with data to insert have been found.")]
    NoRowsToInsert,

    #[error("{0}")]
    Defects(ValidationReport),
}

/// One recorded defect.
#[derive(Clone, Debug, PartialEq)]
pub enum Finding {
    /// Required columns absent from the table, in declaration order
    MissingFields(Vec<String>),
    /// Per required column, the human row numbers of its empty cells
    MissingValues(Vec<(String, Vec<usize>)>),
    /// A cell containing a tab or a dash-like character other than `-`
    InvalidCharacter { column: String, row: usize },
    /// A cell starting with a space or a newline
    InvalidFirstChar { column: String, row: usize, value: String },
    /// A cell ending with a space or a newline
    InvalidLastChar { column: String, row: usize, value: String },
}

impl Finding {
    /// Contribution of this finding to the problem count: one per missing
    /// field, one per column with missing values, one per cell otherwise.
    pub fn count(&self) -> usize {
        match self {
            Finding::MissingFields(fields) => fields.len(),
            Finding::MissingValues(columns) => columns.len(),
            _ => 1,
        }
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::MissingFields(fields) => {
                writeln!(f, "Missing required field(s):")?;
                for field in fields {
                    writeln!(f, "   - {}", field)?;
                }
                Ok(())
            }
            Finding::MissingValues(columns) => {
                writeln!(f, "Missing data in mandatory fields:")?;
                for (column, rows) in columns {
                    writeln!(f, "  - Column '{}':", column)?;
                    for row in rows {
                        writeln!(f, "    - Row {}", row)?;
                    }
                }
                Ok(())
            }
            Finding::InvalidCharacter { column, row } => {
                write!(f, "Invalid character in column '{}' row '{}'.", column, row)
            }
            Finding::InvalidFirstChar { column, row, value } => {
                write!(f, "Invalid first char: '{}' in column '{}' row '{}'.", value, column, row)
            }
            Finding::InvalidLastChar { column, row, value } => {
                write!(f, "Invalid last char: '{}' in column '{}' row '{}'.", value, column, row)
            }
        }
    }
}

/// Findings of one validation run, in discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Total number of problems, see [`Finding::count`].
    pub fn count(&self) -> usize {
        self.findings.iter().map(Finding::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.findings.iter().map(Finding::to_string).collect();
        write!(f, "Detected {} problem(s):\n- {}", self.count(), messages.join("\n- "))
    }
}

/// Converts a zero-based data row index to the row number shown in a
/// spreadsheet, where row 1 holds the header.
pub(crate) fn human_row(index: usize) -> usize {
    index + 2
}

/// Runs every check over `table` and collects the findings.
pub fn inspect(table: &Table, required_fields: &[String]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let (missing, present) = required::split_required_fields(table, required_fields);
    if let Some(finding) = missing {
        report.push(finding);
    }
    if let Some(finding) = required::missing_values(table, &present) {
        report.push(finding);
    }
    for finding in characters::check_cells(table) {
        report.push(finding);
    }
    report
}

/// Validates a loaded table against the required fields.
///
/// # Errors
///
/// * [`ValidationError::MissingInputData`] when no table was loaded.
/// * [`ValidationError::NoRowsToManage`] or [`ValidationError::NoRowsToInsert`]
///   when the table has no rows, depending on whether it has a `manage` column.
/// * [`ValidationError::Defects`] with the aggregated report otherwise.
pub fn validate(table: Option<&Table>, required_fields: &[String]) -> Result<(), ValidationError> {
    let table = table.ok_or(ValidationError::MissingInputData)?;
    if table.is_empty() {
        if table.has_column(MANAGE_COLUMN) {
            return Err(ValidationError::NoRowsToManage);
        }
        return Err(ValidationError::NoRowsToInsert);
    }

    let report = inspect(table, required_fields);
    if report.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Defects(report))
    }
}
