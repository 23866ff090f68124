use crate::error::SheetIngestError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::SpreadsheetError;
use crate::table::{CellValue, Column, Table};

/// The non-empty cells of one worksheet, in document order, plus the used range.
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        let widen_lower = |bound: Option<usize>, value: usize| Some(bound.map_or(value, |bound| bound.min(value)));
        let widen_upper = |bound: Option<usize>, value: usize| Some(bound.map_or(value, |bound| bound.max(value)));
        self.row_lower_bound = widen_lower(self.row_lower_bound, row);
        self.row_upper_bound = widen_upper(self.row_upper_bound, row);
        self.col_lower_bound = widen_lower(self.col_lower_bound, col);
        self.col_upper_bound = widen_upper(self.col_upper_bound, col);
    }

    /// Builds a table from the used range: the first row supplies the column
    /// names, every following row up to the last non-empty one is a record.
    /// Cells absent from the worksheet become [`CellValue::Empty`].
    pub(crate) fn into_table(self, shared_strings: &[String]) -> Result<Table, SheetIngestError> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Ok(Table::default());
        };

        let width = col_upper - col_lower + 1;
        let mut titles: Vec<Option<String>> = vec![None; width];
        let mut columns: Vec<Vec<CellValue>> = vec![vec![CellValue::Empty; row_upper - row_lower]; width];
        for cell in &self.cells {
            let value = cell.to_cell_value(shared_strings).map_err(|message| SpreadsheetError::CellValueError {
                sheet: self.name.to_owned(),
                reference: cell.reference(),
                message,
            })?;
            let col = cell.col - col_lower;
            if cell.row == row_lower {
                titles[col] = Some(value.to_string()).filter(|title| !title.is_empty());
            } else {
                columns[col][cell.row - row_lower - 1] = value;
            }
        }

        let names = header_names(titles);
        let columns = names
            .into_iter()
            .zip(columns)
            .map(|(name, cells)| Column::new(name, cells))
            .collect();
        Ok(Table::new(columns)?)
    }
}

/// Names blank header cells `Unnamed: {index}` and suffixes repeated names
/// with `.1`, `.2`, ... so that every column name is unique.
fn header_names(titles: Vec<Option<String>>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(titles.len());
    for (index, title) in titles.into_iter().enumerate() {
        let base = title.unwrap_or_else(|| format!("Unnamed: {index}"));
        let mut name = base.to_owned();
        let mut suffix = 0usize;
        while names.contains(&name) {
            suffix += 1;
            name = format!("{base}.{suffix}");
        }
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;
    use crate::table::Scalar;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("");

        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("");
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 3, 1, "c");
        push(&mut sheet, 3, 3, "d");

        assert_eq!(sheet.cells.len(), 4);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_into_table() {
        let mut sheet = Sheet::new("data");
        push(&mut sheet, 0, 0, "name");
        push(&mut sheet, 0, 1, "name");
        push(&mut sheet, 1, 0, "x");
        push(&mut sheet, 1, 2, "orphan");
        sheet.push(Cell {
            row: 3,
            col: 1,
            kind: CellType::Number,
            value: "7".to_owned(),
        });

        let table = sheet.into_table(&[]).unwrap();

        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["name", "name.1", "Unnamed: 2"]
        );
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("name.1").unwrap().cells(),
            &[CellValue::Empty, CellValue::Empty, CellValue::Other(Scalar::Integer(7))]
        );
        assert_eq!(table.column("Unnamed: 2").unwrap().cells()[0], CellValue::Text("orphan".to_owned()));
    }

    #[test]
    fn sheet_header_only() {
        let mut sheet = Sheet::new("data");
        push(&mut sheet, 0, 0, "id");
        let table = sheet.into_table(&[]).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn sheet_bad_shared_string() {
        let mut sheet = Sheet::new("data");
        sheet.push(Cell {
            row: 0,
            col: 0,
            kind: CellType::SharedString,
            value: "3".to_owned(),
        });
        let error = sheet.into_table(&[]).err().unwrap();
        assert_eq!(
            error.to_string(),
            "Invalid cell value at data!A1: shared string 3 out of range"
        );
    }
}
