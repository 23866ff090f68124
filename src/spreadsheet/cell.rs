use crate::spreadsheet::reference::index_to_reference;
use crate::table::{CellValue, Scalar};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Workbook epoch used to interpret serial date numbers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum DateSystem {
    #[default]
    V1900,
    V1904,
}

impl DateSystem {
    /// Converts a serial number to a date-time, `None` when out of range.
    pub(crate) fn to_datetime(&self, serial: f64) -> Option<NaiveDateTime> {
        if !serial.is_finite() || serial < 0.0 {
            return None;
        }
        let days = serial.trunc() as i64;
        let offset = match self {
            DateSystem::V1904 => days + 1_462,
            DateSystem::V1900 if days < 60 => days + 1, // Lotus 1-2-3 leap year bug
            DateSystem::V1900 => days,
        };
        let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(offset))?;
        let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
        base.and_hms_opt(0, 0, 0)?
            .checked_add_signed(Duration::milliseconds(milliseconds))
    }
}

/// Types of cell data in XLSX worksheets.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial number with a date and time format
    DateTime(DateSystem),
    /// Serial number with a date-only format
    Date(DateSystem),
    /// Serial number with a time-only format
    Time(DateSystem),
    /// ISO 8601 date/time string (`t="d"`)
    IsoDateTime,
    InlineString,
    /// Index into the shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Maps built-in Excel number format IDs to date/time cell types.
    pub(crate) fn parse_builtin_number_format_id(id: &str, system: DateSystem) -> Option<Self> {
        match id {
            "22" => Some(Self::DateTime(system)),
            "14" | "15" | "16" | "17" => Some(Self::Date(system)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time(system)),
            _ => None,
        }
    }

    /// Classifies a custom number format code by the date and time tokens it
    /// uses outside of literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, system: DateSystem) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::DateTime(system),
            (true, false) => Self::Date(system),
            (false, true) => Self::Time(system),
            (false, false) => Self::Number,
        }
    }

    /// Resolves the `t` attribute of a `<c>` element.
    pub(crate) fn from_type_attribute(kind: Option<&str>) -> Self {
        match kind {
            Some("inlineStr") | Some("str") => Self::InlineString,
            Some("s") => Self::SharedString,
            Some("d") => Self::IsoDateTime,
            Some("b") => Self::Boolean,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// A raw worksheet cell: position, type and the undecoded value text.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    /// Returns the A1-style reference of the cell.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Decodes the raw value into a table cell.
    pub(crate) fn to_cell_value(&self, shared_strings: &[String]) -> Result<CellValue, String> {
        let value = match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::Error => CellValue::Null,
            CellType::InlineString => CellValue::text(self.value.as_str()),
            CellType::SharedString => {
                let index = self
                    .value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid shared string index '{}'", self.value))?;
                let string = shared_strings
                    .get(index)
                    .ok_or_else(|| format!("shared string {} out of range", index))?;
                CellValue::text(string.as_str())
            }
            CellType::Boolean => CellValue::Other(Scalar::Boolean(self.value.trim() == "1")),
            CellType::Number => match self.value.parse::<i64>() {
                Ok(integer) => CellValue::Other(Scalar::Integer(integer)),
                Err(_) => CellValue::Other(Scalar::Double(self.to_double()?)),
            },
            CellType::DateTime(system) => CellValue::Other(Scalar::Timestamp(self.to_datetime(system)?)),
            CellType::Date(system) => CellValue::Other(Scalar::Date(self.to_datetime(system)?.date())),
            CellType::Time(system) => CellValue::Other(Scalar::Time(self.to_datetime(system)?.time())),
            CellType::IsoDateTime => CellValue::Other(self.parse_iso_datetime()?),
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, String> {
        self.value
            .parse::<f64>()
            .map_err(|_| format!("parse '{}' to double failed", self.value))
    }

    fn to_datetime(&self, system: DateSystem) -> Result<NaiveDateTime, String> {
        system
            .to_datetime(self.to_double()?)
            .ok_or_else(|| format!("serial date '{}' out of range", self.value))
    }

    fn parse_iso_datetime(&self) -> Result<Scalar, String> {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&self.value, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(Scalar::Timestamp(datetime))
        } else if let Ok(date) = NaiveDate::parse_from_str(&self.value, "%Y-%m-%d") {
            Ok(Scalar::Date(date))
        } else if let Ok(time) = NaiveTime::parse_from_str(&self.value, "%H:%M:%S%.f") {
            Ok(Scalar::Time(time))
        } else {
            Err(format!("parse '{}' to iso datetime failed", self.value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn custom_number_formats() {
        let system = DateSystem::V1900;
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", system), CellType::Date(system));
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", system), CellType::Time(system));
        assert_eq!(
            CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", system),
            CellType::DateTime(system)
        );
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", system), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0", system), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("#,##0_);\\(#,##0\\)", system), CellType::Number);
    }

    #[test]
    fn builtin_number_formats() {
        let system = DateSystem::V1904;
        assert_eq!(CellType::parse_builtin_number_format_id("14", system), Some(CellType::Date(system)));
        assert_eq!(CellType::parse_builtin_number_format_id("22", system), Some(CellType::DateTime(system)));
        assert_eq!(CellType::parse_builtin_number_format_id("0", system), None);
    }

    #[test]
    fn serial_dates() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(DateSystem::V1900.to_datetime(45_000.0).unwrap().date(), date(2023, 3, 15));
        assert_eq!(DateSystem::V1900.to_datetime(1.0).unwrap().date(), date(1900, 1, 1));
        assert_eq!(DateSystem::V1904.to_datetime(0.0).unwrap().date(), date(1904, 1, 1));
        assert_eq!(
            DateSystem::V1900.to_datetime(45_000.5).unwrap().time(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap()
        );
        assert!(DateSystem::V1900.to_datetime(-1.0).is_none());
    }

    #[test]
    fn cell_values() {
        let shared = vec!["alpha".to_owned(), " padded".to_owned()];
        assert_eq!(
            cell(CellType::SharedString, "1").to_cell_value(&shared).unwrap(),
            CellValue::Text(" padded".to_owned())
        );
        assert!(cell(CellType::SharedString, "7").to_cell_value(&shared).is_err());
        assert_eq!(
            cell(CellType::Number, "42").to_cell_value(&shared).unwrap(),
            CellValue::Other(Scalar::Integer(42))
        );
        assert_eq!(
            cell(CellType::Number, "0.25").to_cell_value(&shared).unwrap(),
            CellValue::Other(Scalar::Double(0.25))
        );
        assert_eq!(
            cell(CellType::Boolean, "0").to_cell_value(&shared).unwrap(),
            CellValue::Other(Scalar::Boolean(false))
        );
        assert_eq!(cell(CellType::Error, "#N/A").to_cell_value(&shared).unwrap(), CellValue::Null);
        assert_eq!(
            cell(CellType::IsoDateTime, "2024-01-02").to_cell_value(&shared).unwrap(),
            CellValue::Other(Scalar::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
        );
        assert_eq!(cell(CellType::Number, "B2").reference(), "A1");
    }
}
