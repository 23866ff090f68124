use crate::table::Table;
use crate::validation::{human_row, Finding};

/// Characters rejected anywhere in a text cell: tab, minus sign, en dash and em dash.
const INVALID_CHARACTERS: [char; 4] = ['\t', '\u{2212}', '\u{2013}', '\u{2014}'];

/// Characters rejected at the start or end of a text cell.
const INVALID_BOUNDARY_CHARACTERS: [char; 2] = [' ', '\n'];

/// Checks every text cell, column by column. Each cell yields at most one
/// finding: the first check that fails wins.
pub(super) fn check_cells(table: &Table) -> Vec<Finding> {
    let mut findings = Vec::new();
    for column in table.columns() {
        for (row, cell) in column.iter() {
            let Some(value) = cell.as_text() else {
                continue;
            };
            if let Some(finding) = check_characters(column.name(), row, value)
                .or_else(|| check_boundaries(column.name(), row, value))
            {
                findings.push(finding);
            }
        }
    }
    findings
}

fn check_characters(column: &str, row: usize, value: &str) -> Option<Finding> {
    value.contains(INVALID_CHARACTERS).then(|| Finding::InvalidCharacter {
        column: column.to_owned(),
        row: human_row(row),
    })
}

fn check_boundaries(column: &str, row: usize, value: &str) -> Option<Finding> {
    if value.starts_with(INVALID_BOUNDARY_CHARACTERS) {
        Some(Finding::InvalidFirstChar {
            column: column.to_owned(),
            row: human_row(row),
            value: value.to_owned(),
        })
    } else if value.ends_with(INVALID_BOUNDARY_CHARACTERS) {
        Some(Finding::InvalidLastChar {
            column: column.to_owned(),
            row: human_row(row),
            value: value.to_owned(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Scalar};

    #[test]
    fn blocklist() {
        for value in ["a\tb", "1\u{2212}2", "1\u{2013}2", "1\u{2014}2"] {
            assert!(check_characters("c", 0, value).is_some(), "{:?}", value);
        }
        assert!(check_characters("c", 0, "well-known").is_none());
    }

    #[test]
    fn boundaries() {
        assert!(matches!(check_boundaries("c", 0, "\nx"), Some(Finding::InvalidFirstChar { .. })));
        assert!(matches!(check_boundaries("c", 0, "x\n"), Some(Finding::InvalidLastChar { .. })));
        assert!(matches!(check_boundaries("c", 0, " x "), Some(Finding::InvalidFirstChar { .. })));
        assert!(check_boundaries("c", 0, "x y").is_none());
    }

    #[test]
    fn non_text_cells_are_skipped() {
        let table = Table::from_rows(
            &["c"],
            vec![
                vec![CellValue::Other(Scalar::Double(-1.5))],
                vec![CellValue::Null],
                vec![CellValue::Empty],
            ],
        )
        .unwrap();
        assert!(check_cells(&table).is_empty());
    }

    #[test]
    fn one_finding_per_cell() {
        let table = Table::from_rows(&["c"], vec![vec![CellValue::text(" a\tb ")]]).unwrap();
        assert_eq!(
            check_cells(&table),
            vec![Finding::InvalidCharacter {
                column: "c".to_owned(),
                row: 2
            }]
        );
    }
}
