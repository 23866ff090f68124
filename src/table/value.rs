use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::Display;

/// Typed, non-textual cell content.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

/// The content of one table cell, tagged when the table is loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// Blank cell (no content at all)
    #[default]
    Empty,
    /// Explicit null, e.g. an error cell or a database NULL
    Null,
    Text(String),
    Other(Scalar),
}

impl CellValue {
    /// Wraps a string, mapping the empty string to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// True for blank cells, nulls and empty strings.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Null => true,
            CellValue::Text(value) => value.is_empty(),
            CellValue::Other(_) => false,
        }
    }

    /// Returns the string content of a non-empty text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<Scalar> for CellValue {
    fn from(value: Scalar) -> Self {
        CellValue::Other(value)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Boolean(value) => write!(f, "{}", value),
            Scalar::Integer(value) => write!(f, "{}", value),
            Scalar::Double(value) => write!(f, "{}", value),
            Scalar::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Scalar::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Scalar::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty | CellValue::Null => Ok(()),
            CellValue::Text(value) => write!(f, "{}", value),
            CellValue::Other(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells() {
        assert!(CellValue::Empty.is_missing());
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::Text(String::new()).is_missing());
        assert!(!CellValue::Text(" ".to_owned()).is_missing());
        assert!(!CellValue::Other(Scalar::Integer(0)).is_missing());
        assert!(!CellValue::Other(Scalar::Boolean(false)).is_missing());
    }

    #[test]
    fn text_constructor_normalizes_empty() {
        assert_eq!(CellValue::text(""), CellValue::Empty);
        assert_eq!(CellValue::from("a"), CellValue::Text("a".to_owned()));
        assert_eq!(CellValue::text("a").as_text(), Some("a"));
        assert_eq!(CellValue::Other(Scalar::Integer(1)).as_text(), None);
    }

    #[test]
    fn scalar_display() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Scalar::Double(1.5).to_string(), "1.5");
        assert_eq!(Scalar::Date(date).to_string(), "2024-02-29");
        assert_eq!(
            Scalar::Timestamp(date.and_hms_opt(13, 5, 0).unwrap()).to_string(),
            "2024-02-29 13:05:00"
        );
        assert_eq!(CellValue::Null.to_string(), "");
    }
}
