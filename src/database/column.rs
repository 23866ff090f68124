use crate::error::SheetIngestError;
use crate::table::{CellValue, Column, Scalar};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

/// Errors related to column type parsing and validation.
#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("Invalid column type '{0}'")]
    TypeError(String),
}

/// Column data types shared by the importer and database handlers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// 64-bit signed integers
    BigInt,
    /// Double-precision floating point numbers
    Double,
    /// Variable-length strings
    Varchar,
    /// Date and time with microsecond precision
    Timestamp,
    /// Date without time component
    Date,
    /// Time without date component
    Time,
}

/// A database column: name plus SQL type.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ColumnDefinition {
    pub(crate) name: String,
    pub(crate) kind: ColumnType,
}

impl ColumnDefinition {
    /// Infers the SQL type of a table column from its non-missing cells.
    pub(crate) fn infer(column: &Column) -> Self {
        let types = column.cells().iter().map(ColumnType::of).collect();
        ColumnDefinition {
            name: column.name().to_owned(),
            kind: ColumnType::detect(types),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = SheetIngestError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        ColumnType::parse(&name)
    }
}

impl ColumnType {
    /// Returns the string representation of the column type for DuckDB.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::BigInt => "bigint",
            ColumnType::Double => "double",
            ColumnType::Varchar => "varchar",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
        }
    }

    /// Parses a column type from a string representation.
    /// Supports various aliases for each type.
    pub fn parse(name: &str) -> Result<Self, SheetIngestError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Ok(Self::Boolean),
            "INT" | "BIGINT" | "INTEGER" => Ok(Self::BigInt),
            "FLOAT" | "DOUBLE" | "DECIMAL" | "NUMERIC" => Ok(Self::Double),
            "TEXT" | "STRING" | "VARCHAR" | "STR" => Ok(Self::Varchar),
            "DATETIME" | "TIMESTAMP" => Ok(Self::Timestamp),
            "DATE" => Ok(Self::Date),
            "TIME" => Ok(Self::Time),
            _ => Err(ColumnError::TypeError(name.to_string()))?,
        }
    }

    /// Infers the column type of a single cell; `None` for missing cells.
    pub(crate) fn of(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Empty | CellValue::Null => None,
            CellValue::Text(value) if value.is_empty() => None,
            CellValue::Text(_) => Some(ColumnType::Varchar),
            CellValue::Other(Scalar::Boolean(_)) => Some(ColumnType::Boolean),
            CellValue::Other(Scalar::Integer(_)) => Some(ColumnType::BigInt),
            CellValue::Other(Scalar::Double(_)) => Some(ColumnType::Double),
            CellValue::Other(Scalar::Timestamp(_)) => Some(ColumnType::Timestamp),
            CellValue::Other(Scalar::Date(_)) => Some(ColumnType::Date),
            CellValue::Other(Scalar::Time(_)) => Some(ColumnType::Time),
        }
    }

    /// Detects the most specific common type from a collection of candidate types.
    /// Falls back to VARCHAR if types are inconsistent or empty.
    pub(crate) fn detect(types: Vec<Option<ColumnType>>) -> ColumnType {
        let types: Vec<ColumnType> = types.into_iter().flatten().collect();
        if types.is_empty() {
            ColumnType::Varchar
        } else if types.iter().all(|kind| kind.is_boolean()) {
            ColumnType::Boolean
        } else if types.iter().all(|kind| kind.is_int()) {
            ColumnType::BigInt
        } else if types.iter().all(|kind| kind.is_float()) {
            ColumnType::Double
        } else if types.iter().all(|kind| kind.is_date()) {
            ColumnType::Date
        } else if types.iter().all(|kind| kind.is_time()) {
            ColumnType::Time
        } else if types.iter().all(|kind| kind.is_timestamp()) {
            ColumnType::Timestamp
        } else {
            ColumnType::Varchar
        }
    }

    /// Converts a cell to this type. Missing cells are returned unchanged.
    ///
    /// The error is a short description of the failed conversion; callers add
    /// the column and row.
    pub(crate) fn coerce(&self, cell: &CellValue) -> Result<CellValue, String> {
        if cell.is_missing() {
            return Ok(cell.to_owned());
        }
        let failed = || format!("parse '{}' to {} failed", cell, self.as_str());
        let scalar = match (self, cell) {
            (ColumnType::Varchar, CellValue::Text(_)) => return Ok(cell.to_owned()),
            (ColumnType::Varchar, other) => return Ok(CellValue::Text(other.to_string())),

            (ColumnType::Boolean, CellValue::Other(Scalar::Boolean(value))) => Scalar::Boolean(*value),
            (ColumnType::Boolean, CellValue::Other(Scalar::Integer(value))) => Scalar::Boolean(*value != 0),
            (ColumnType::Boolean, CellValue::Other(Scalar::Double(value))) => Scalar::Boolean(*value != 0.0),
            (ColumnType::Boolean, CellValue::Text(value)) => {
                Scalar::Boolean(parse_boolean(value).ok_or_else(failed)?)
            }

            (ColumnType::BigInt, CellValue::Other(Scalar::Integer(value))) => Scalar::Integer(*value),
            (ColumnType::BigInt, CellValue::Other(Scalar::Boolean(value))) => Scalar::Integer(*value as i64),
            (ColumnType::BigInt, CellValue::Other(Scalar::Double(value))) if value.fract() == 0.0 => {
                Scalar::Integer(*value as i64)
            }
            (ColumnType::BigInt, CellValue::Text(value)) => {
                let value = value.trim();
                match value.parse::<i64>() {
                    Ok(integer) => Scalar::Integer(integer),
                    Err(_) => value
                        .parse::<f64>()
                        .ok()
                        .filter(|double| double.fract() == 0.0)
                        .map(|double| Scalar::Integer(double as i64))
                        .ok_or_else(failed)?,
                }
            }

            (ColumnType::Double, CellValue::Other(Scalar::Double(value))) => Scalar::Double(*value),
            (ColumnType::Double, CellValue::Other(Scalar::Integer(value))) => Scalar::Double(*value as f64),
            (ColumnType::Double, CellValue::Text(value)) => {
                Scalar::Double(value.trim().parse::<f64>().map_err(|_| failed())?)
            }

            (ColumnType::Timestamp, CellValue::Other(Scalar::Timestamp(value))) => Scalar::Timestamp(*value),
            (ColumnType::Timestamp, CellValue::Other(Scalar::Date(value))) => {
                Scalar::Timestamp(value.and_time(NaiveTime::MIN))
            }
            (ColumnType::Timestamp, CellValue::Text(value)) => {
                Scalar::Timestamp(parse_timestamp(value.trim()).ok_or_else(failed)?)
            }

            (ColumnType::Date, CellValue::Other(Scalar::Date(value))) => Scalar::Date(*value),
            (ColumnType::Date, CellValue::Other(Scalar::Timestamp(value))) => Scalar::Date(value.date()),
            (ColumnType::Date, CellValue::Text(value)) => Scalar::Date(
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_timestamp(value.trim()).map(|timestamp| timestamp.date()))
                    .ok_or_else(failed)?,
            ),

            (ColumnType::Time, CellValue::Other(Scalar::Time(value))) => Scalar::Time(*value),
            (ColumnType::Time, CellValue::Other(Scalar::Timestamp(value))) => Scalar::Time(value.time()),
            (ColumnType::Time, CellValue::Text(value)) => Scalar::Time(
                NaiveTime::parse_from_str(value.trim(), "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M"))
                    .map_err(|_| failed())?,
            ),

            _ => Err(failed())?,
        };
        Ok(CellValue::Other(scalar))
    }

    /// Returns true if this column type represents boolean values.
    #[inline]
    pub(crate) fn is_boolean(&self) -> bool {
        matches!(self, ColumnType::Boolean)
    }

    /// Returns true if this column type represents integer values.
    #[inline]
    pub(crate) fn is_int(&self) -> bool {
        matches!(self, ColumnType::BigInt)
    }

    /// Returns true if this column type represents numeric values (integer or floating point).
    #[inline]
    pub(crate) fn is_float(&self) -> bool {
        matches!(self, ColumnType::BigInt | ColumnType::Double)
    }

    #[inline]
    pub(crate) fn is_date(&self) -> bool {
        matches!(self, ColumnType::Date)
    }

    #[inline]
    pub(crate) fn is_time(&self) -> bool {
        matches!(self, ColumnType::Time)
    }

    /// Returns true for timestamps and dates, which widen to timestamps.
    #[inline]
    pub(crate) fn is_timestamp(&self) -> bool {
        matches!(self, ColumnType::Timestamp | ColumnType::Date)
    }
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::text(value)
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(ColumnType::parse("int").unwrap(), ColumnType::BigInt);
        assert_eq!(ColumnType::parse(" Text ").unwrap(), ColumnType::Varchar);
        assert_eq!(ColumnType::parse("DATETIME").unwrap(), ColumnType::Timestamp);
        assert_eq!(
            ColumnType::parse("money").err().unwrap().to_string(),
            "Invalid column type 'money'"
        );
    }

    #[test]
    fn deserialize_from_name() {
        let kind: ColumnType = serde_json::from_str("\"double\"").unwrap();
        assert_eq!(kind, ColumnType::Double);
        assert!(serde_json::from_str::<ColumnType>("\"blob\"").is_err());
    }

    #[test]
    fn detect_common_type() {
        use ColumnType::*;
        assert_eq!(ColumnType::detect(vec![]), Varchar);
        assert_eq!(ColumnType::detect(vec![None, Some(BigInt), Some(BigInt)]), BigInt);
        assert_eq!(ColumnType::detect(vec![Some(BigInt), Some(Double)]), Double);
        assert_eq!(ColumnType::detect(vec![Some(Date), Some(Timestamp)]), Timestamp);
        assert_eq!(ColumnType::detect(vec![Some(Boolean), Some(BigInt)]), Varchar);
        assert_eq!(ColumnType::detect(vec![Some(Time), Some(Time)]), Time);
    }

    #[test]
    fn infer_definition() {
        let column = Column::new(
            "score",
            vec![CellValue::Other(Scalar::Integer(1)), CellValue::Empty, CellValue::Other(Scalar::Double(0.5))],
        );
        assert_eq!(
            ColumnDefinition::infer(&column),
            ColumnDefinition {
                name: "score".to_owned(),
                kind: ColumnType::Double
            }
        );
    }

    #[test]
    fn coerce_values() {
        assert_eq!(ColumnType::BigInt.coerce(&text(" 42 ")).unwrap(), CellValue::Other(Scalar::Integer(42)));
        assert_eq!(ColumnType::BigInt.coerce(&text("3.0")).unwrap(), CellValue::Other(Scalar::Integer(3)));
        assert_eq!(ColumnType::Boolean.coerce(&text("Yes")).unwrap(), CellValue::Other(Scalar::Boolean(true)));
        assert_eq!(
            ColumnType::Varchar.coerce(&CellValue::Other(Scalar::Double(2.5))).unwrap(),
            text("2.5")
        );
        assert_eq!(
            ColumnType::Date.coerce(&text("2024-02-29")).unwrap(),
            CellValue::Other(Scalar::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            ColumnType::Time.coerce(&text("08:30")).unwrap(),
            CellValue::Other(Scalar::Time(NaiveTime::from_hms_opt(8, 30, 0).unwrap()))
        );
        assert_eq!(ColumnType::Double.coerce(&CellValue::Null).unwrap(), CellValue::Null);
    }

    #[test]
    fn coerce_failures() {
        assert_eq!(
            ColumnType::BigInt.coerce(&text("3.5")).err().unwrap(),
            "parse '3.5' to bigint failed"
        );
        assert_eq!(
            ColumnType::Date.coerce(&CellValue::Other(Scalar::Boolean(true))).err().unwrap(),
            "parse 'true' to date failed"
        );
    }
}
