use thiserror::Error;

/// Main error type for the sheet ingestion crate.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum SheetIngestError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    TableError(#[from] crate::table::TableError),

    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    ValidationError(#[from] crate::validation::ValidationError),

    #[error("{0}")]
    ColumnError(#[from] crate::database::column::ColumnError),

    #[error("{0}")]
    DatabaseError(#[from] crate::database::DatabaseError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    ResourceError(#[from] crate::resource::ResourceError),
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetIngestError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetIngestError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_wraps_message() {
        let result: Result<(), SheetIngestError> =
            Err(SheetIngestError::WithContextError("boom".to_string()));
        let error = result.with_prefix("book.xlsx").unwrap_err();
        assert_eq!(error.to_string(), "book.xlsx: boom");
    }

    #[test]
    fn ok_none_else_only_replaces_none() {
        let none: Result<Option<u8>, SheetIngestError> = Ok(None);
        assert_eq!(none.ok_none_else(|| Ok(Some(1))).unwrap(), Some(1));

        let some: Result<Option<u8>, SheetIngestError> = Ok(Some(2));
        assert_eq!(some.ok_none_else(|| Ok(Some(1))).unwrap(), Some(2));
    }
}
