use crate::table::Table;
use crate::validation::{human_row, Finding};

/// Splits the required fields into the ones missing from the table (as a
/// finding) and the ones present, both in declaration order. A field listed
/// more than once counts once.
pub(super) fn split_required_fields<'a>(
    table: &Table,
    required_fields: &'a [String],
) -> (Option<Finding>, Vec<&'a str>) {
    let mut unique: Vec<&str> = Vec::with_capacity(required_fields.len());
    for field in required_fields {
        if !unique.contains(&field.as_str()) {
            unique.push(field);
        }
    }
    let (present, missing): (Vec<&str>, Vec<&str>) = unique.into_iter().partition(|field| table.has_column(field));
    let finding = Some(missing)
        .filter(|missing| !missing.is_empty())
        .map(|missing| Finding::MissingFields(missing.into_iter().map(str::to_owned).collect()));
    (finding, present)
}

/// Collects the rows with missing values of every present required column.
pub(super) fn missing_values(table: &Table, fields: &[&str]) -> Option<Finding> {
    let mut columns: Vec<(String, Vec<usize>)> = Vec::new();
    for field in fields {
        let Some(column) = table.column(field) else {
            continue;
        };
        let rows: Vec<usize> = column
            .iter()
            .filter(|(_, cell)| cell.is_missing())
            .map(|(row, _)| human_row(row))
            .collect();
        if rows.is_empty() || columns.iter().any(|(name, _)| name.as_str() == *field) {
            continue;
        }
        columns.push((field.to_string(), rows));
    }
    Some(columns).filter(|columns| !columns.is_empty()).map(Finding::MissingValues)
}
