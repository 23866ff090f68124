//! # Resource
//!
//! A [`Resource`] ties one configured data set to an [`Importer`] and a
//! [`DatabaseHandler`]: load the input, validate it, insert it, read it back.
//!
//! ```no_run
//! use sheet_ingest::config::{DbCredentials, ResourceConfig};
//! use sheet_ingest::database::DuckDbHandler;
//! use sheet_ingest::resource::Resource;
//! use sheet_ingest::spreadsheet::XlsxImporter;
//!
//! # fn main() -> Result<(), sheet_ingest::SheetIngestError> {
//! let config = ResourceConfig::new("users").with_section("Users").with_required_fields(&["id", "email"]);
//! let mut resource = Resource::new(config);
//! resource.set_input_handler(XlsxImporter::new());
//! resource.set_db_handler(DuckDbHandler::new(DbCredentials::from_env()?));
//!
//! resource.load_input_data("users.xlsx")?;
//! resource.validate_data()?;
//! resource.connect_db()?;
//! resource.insert_data()?;
//! resource.load_db_data()?;
//! resource.close_db(false)?;
//! # Ok(())
//! # }
//! ```
use crate::config::ResourceConfig;
use crate::database::DatabaseHandler;
use crate::error::SheetIngestError;
use crate::spreadsheet::{Importer, Source};
use crate::table::{CellValue, Scalar, Table};
use crate::validation::{self, ValidationError, MANAGE_COLUMN};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by [`Resource`] when a step is called out of order.
#[derive(Error, Debug, PartialEq)]
pub enum ResourceError {
    #[error("Missing input handler. Try 'set_input_handler' first.")]
    MissingInputHandler,

    #[error("Missing db handler. Try 'set_db_handler' first.")]
    MissingDbHandler,

    #[error("Data not validated. Try 'validate_data' first.")]
    NotValidated,

    #[error("Missing db_data. Try 'load_db_data' first.")]
    MissingDbData,
}

/// One configured data set and its collaborators.
pub struct Resource {
    config: ResourceConfig,
    importer: Option<Box<dyn Importer>>,
    db_handler: Option<Box<dyn DatabaseHandler>>,
    input_data: Option<Table>,
    db_data: Option<Table>,
    validated_data: bool,
}

impl Resource {
    pub fn new(config: ResourceConfig) -> Self {
        Resource {
            config,
            importer: None,
            db_handler: None,
            input_data: None,
            db_data: None,
            validated_data: false,
        }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn resource_name(&self) -> &str {
        &self.config.resource_name
    }

    pub fn required_fields(&self) -> &[String] {
        &self.config.required_fields
    }

    /// True when the loaded input passed [`Resource::validate_data`].
    pub fn validated_data(&self) -> bool {
        self.validated_data
    }

    pub fn input_data(&self) -> Option<&Table> {
        self.input_data.as_ref()
    }

    pub fn db_data(&self) -> Option<&Table> {
        self.db_data.as_ref()
    }

    pub fn set_input_handler(&mut self, importer: impl Importer + 'static) {
        self.importer = Some(Box::new(importer));
    }

    pub fn set_db_handler(&mut self, db_handler: impl DatabaseHandler + 'static) {
        self.db_handler = Some(Box::new(db_handler));
    }

    pub fn db_handler_mut(&mut self) -> Result<&mut dyn DatabaseHandler, ResourceError> {
        match self.db_handler.as_mut() {
            Some(handler) => Ok(handler.as_mut()),
            None => Err(ResourceError::MissingDbHandler),
        }
    }

    /// Opens the database connection of the handler.
    pub fn connect_db(&mut self) -> Result<(), SheetIngestError> {
        self.db_handler_mut()?.connect_with_db()
    }

    /// Closes the database connection, committing unless `rollback` is set.
    pub fn close_db(&mut self, rollback: bool) -> Result<(), SheetIngestError> {
        self.db_handler_mut()?.close_db_connection(rollback)
    }

    /// Loads the configured section of `source`. When the table has a
    /// `manage` column only the enabled rows are kept.
    ///
    /// Any previous validation is discarded.
    pub fn load_input_data(&mut self, source: impl Into<Source>) -> Result<&Table, SheetIngestError> {
        let source = source.into();
        let importer = self.importer.as_ref().ok_or(ResourceError::MissingInputHandler)?;
        self.validated_data = false;
        self.input_data = None;

        let table = importer.load_data(&source, &self.config.section, self.config.column_types.as_ref())?;
        let table = if let Some(manage) = table.column(MANAGE_COLUMN) {
            let enabled: Vec<bool> = manage.cells().iter().map(is_enabled).collect();
            let managed = table.retain_rows(|row| enabled[row]);
            debug!(
                resource = %self.config.resource_name,
                enabled = managed.row_count(),
                total = table.row_count(),
                "Filtered rows by manage column"
            );
            managed
        } else {
            table
        };
        info!(resource = %self.config.resource_name, source = %source, rows = table.row_count(), "Input data loaded");
        Ok(self.input_data.insert(table))
    }

    /// Validates the loaded input against the required fields.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] describing every defect found.
    pub fn validate_data(&mut self) -> Result<(), SheetIngestError> {
        self.validated_data = false;
        match validation::validate(self.input_data.as_ref(), &self.config.required_fields) {
            Ok(()) => {
                self.validated_data = true;
                info!(resource = %self.config.resource_name, "Input data validated");
                Ok(())
            }
            Err(error) => {
                if let ValidationError::Defects(report) = &error {
                    warn!(resource = %self.config.resource_name, problems = report.count(), "Input data rejected");
                }
                Err(error.into())
            }
        }
    }

    /// Inserts the validated rows, without the `manage` column, through the
    /// database handler's open connection.
    pub fn insert_data(&mut self) -> Result<usize, SheetIngestError> {
        if !self.validated_data {
            Err(ResourceError::NotValidated)?
        }
        let data = self.stored_input()?;
        let name = self.config.resource_name.to_owned();
        let inserted = self.db_handler_mut()?.insert_resource_data(&name, &data)?;
        info!(resource = %name, rows = inserted, "Input data inserted");
        Ok(inserted)
    }

    /// Loads the database rows matching the loaded input rows; every row of
    /// the resource when no input is loaded.
    pub fn load_db_data(&mut self) -> Result<&Table, SheetIngestError> {
        let keys = match &self.input_data {
            Some(_) => self.stored_input()?,
            None => Table::default(),
        };
        let name = self.config.resource_name.to_owned();
        let table = self.db_handler_mut()?.load_resource_data(&name, &keys)?;
        info!(resource = %name, rows = table.row_count(), "Database data loaded");
        Ok(self.db_data.insert(table))
    }

    /// Renders the loaded input as a text grid.
    pub fn show_input_data(&self) -> Result<String, SheetIngestError> {
        let table = self.input_data.as_ref().ok_or(ValidationError::MissingInputData)?;
        Ok(table.to_string())
    }

    /// Renders the loaded database rows as a text grid.
    pub fn show_db_data(&self) -> Result<String, SheetIngestError> {
        let table = self.db_data.as_ref().ok_or(ResourceError::MissingDbData)?;
        Ok(table.to_string())
    }

    /// The input as it is stored: without the `manage` column.
    fn stored_input(&self) -> Result<Table, ValidationError> {
        let table = self.input_data.as_ref().ok_or(ValidationError::MissingInputData)?;
        Ok(table.without_column(MANAGE_COLUMN))
    }
}

/// Whether a `manage` cell enables its row.
fn is_enabled(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "x" | "yes" | "y" | "true" | "1"
        ),
        CellValue::Other(Scalar::Boolean(value)) => *value,
        CellValue::Other(Scalar::Integer(value)) => *value != 0,
        CellValue::Other(Scalar::Double(value)) => *value != 0.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbCredentials;
    use crate::database::column::ColumnType;
    use crate::database::DuckDbHandler;
    use crate::spreadsheet::xlsx::tests::build_xlsx;
    use crate::spreadsheet::{Section, XlsxImporter};
    use std::collections::HashMap;

    /// Returns a fixed table whatever the source.
    struct FixedImporter(Table);

    impl Importer for FixedImporter {
        fn load_data(
            &self,
            _source: &Source,
            _section: &Section,
            _types: Option<&HashMap<String, ColumnType>>,
        ) -> Result<Table, SheetIngestError> {
            Ok(self.0.clone())
        }
    }

    /// Keeps inserted tables in memory.
    #[derive(Default)]
    struct MemoryDb {
        connected: bool,
        tables: HashMap<String, Table>,
    }

    impl DatabaseHandler for MemoryDb {
        fn set_credentials(&mut self, _credentials: DbCredentials) {}

        fn connect_with_db(&mut self) -> Result<(), SheetIngestError> {
            self.connected = true;
            Ok(())
        }

        fn close_db_connection(&mut self, _rollback: bool) -> Result<(), SheetIngestError> {
            self.connected = false;
            Ok(())
        }

        fn insert_resource_data(&mut self, resource_name: &str, data: &Table) -> Result<usize, SheetIngestError> {
            if !self.connected {
                Err(crate::database::DatabaseError::NotConnected)?
            }
            self.tables.insert(resource_name.to_owned(), data.clone());
            Ok(data.row_count())
        }

        fn load_resource_data(&mut self, resource_name: &str, _keys: &Table) -> Result<Table, SheetIngestError> {
            Ok(self.tables.get(resource_name).cloned().unwrap_or_default())
        }
    }

    fn text_table(header: &[&str], rows: Vec<Vec<&str>>) -> Table {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::text).collect())
            .collect();
        Table::from_rows(header, rows).unwrap()
    }

    fn resource(table: Table, required: &[&str]) -> Resource {
        let mut resource = Resource::new(ResourceConfig::new("users").with_required_fields(required));
        resource.set_input_handler(FixedImporter(table));
        resource.set_db_handler(MemoryDb::default());
        resource
    }

    #[test]
    fn manage_cells() {
        assert!(is_enabled(&CellValue::text(" X ")));
        assert!(is_enabled(&CellValue::text("Yes")));
        assert!(is_enabled(&CellValue::Other(Scalar::Boolean(true))));
        assert!(is_enabled(&CellValue::Other(Scalar::Integer(1))));
        assert!(!is_enabled(&CellValue::text("no")));
        assert!(!is_enabled(&CellValue::Other(Scalar::Double(0.0))));
        assert!(!is_enabled(&CellValue::Empty));
    }

    #[test]
    fn handlers_are_required() {
        let mut resource = Resource::new(ResourceConfig::new("users"));
        assert_eq!(
            resource.load_input_data("users.xlsx").err().unwrap().to_string(),
            "Missing input handler. Try 'set_input_handler' first."
        );
        assert_eq!(
            resource.load_db_data().err().unwrap().to_string(),
            "Missing db handler. Try 'set_db_handler' first."
        );
    }

    #[test]
    fn validate_before_load() {
        let mut resource = Resource::new(ResourceConfig::new("users"));
        assert_eq!(
            resource.validate_data().err().unwrap().to_string(),
            "Missing input_data. Try 'load_input_data' first."
        );
    }

    #[test]
    fn manage_column_filters_rows() {
        let table = text_table(
            &["id", "manage"],
            vec![vec!["1", "x"], vec!["2", ""], vec!["3", "yes"]],
        );
        let mut resource = resource(table, &["id"]);

        let loaded = resource.load_input_data("users.xlsx").unwrap();

        assert_eq!(loaded.column("id").unwrap().cells(), &[CellValue::text("1"), CellValue::text("3")]);
    }

    #[test]
    fn no_managed_rows() {
        let table = text_table(&["id", "manage"], vec![vec!["1", "no"]]);
        let mut resource = resource(table, &["id"]);
        resource.load_input_data("users.xlsx").unwrap();

        assert_eq!(
            resource.validate_data().err().unwrap().to_string(),
            "No rows with data to manage. Check the manage column and enable some rows."
        );
        assert!(!resource.validated_data());
    }

    #[test]
    fn insert_requires_validation() {
        let table = text_table(&["id"], vec![vec!["1"]]);
        let mut resource = resource(table, &["id"]);
        resource.load_input_data("users.xlsx").unwrap();

        assert_eq!(
            resource.insert_data().err().unwrap().to_string(),
            "Data not validated. Try 'validate_data' first."
        );
    }

    #[test]
    fn failed_validation_keeps_config() {
        let table = text_table(&["id"], vec![vec!["1"]]);
        let mut resource = resource(table, &["id", "email"]);
        resource.load_input_data("users.xlsx").unwrap();

        let first = resource.validate_data().err().unwrap().to_string();
        let second = resource.validate_data().err().unwrap().to_string();

        assert_eq!(first, "Detected 1 problem(s):\n- Missing required field(s):\n   - email\n");
        assert_eq!(first, second);
        assert_eq!(resource.required_fields(), &["id".to_string(), "email".to_string()]);
        assert!(!resource.validated_data());
    }

    #[test]
    fn insert_and_load_without_manage_column() {
        let table = text_table(&["id", "manage"], vec![vec!["1", "x"], vec!["2", "x"]]);
        let mut resource = resource(table, &["id"]);
        resource.load_input_data("users.xlsx").unwrap();
        resource.validate_data().unwrap();
        resource.connect_db().unwrap();

        assert_eq!(resource.insert_data().unwrap(), 2);
        let loaded = resource.load_db_data().unwrap();

        assert_eq!(loaded.column_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(resource.show_db_data().unwrap(), "id\n--\n1\n2\n");
        resource.close_db(false).unwrap();
    }

    #[test]
    fn reload_discards_validation() {
        let table = text_table(&["id"], vec![vec!["1"]]);
        let mut resource = resource(table, &[]);
        resource.load_input_data("users.xlsx").unwrap();
        resource.validate_data().unwrap();
        assert!(resource.validated_data());

        resource.load_input_data("users.xlsx").unwrap();
        assert!(!resource.validated_data());
    }

    #[test]
    fn show_data() {
        let table = text_table(&["id", "name"], vec![vec!["1", "alpha"]]);
        let mut resource = resource(table, &[]);
        assert!(resource.show_input_data().is_err());
        assert_eq!(
            resource.show_db_data().err().unwrap().to_string(),
            "Missing db_data. Try 'load_db_data' first."
        );

        resource.load_input_data("users.xlsx").unwrap();
        assert_eq!(resource.show_input_data().unwrap(), "id | name\n---+------\n1  | alpha\n");
    }

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Some_data" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>value1</t></is></c><c r="B1" t="inlineStr"><is><t>value2</t></is></c><c r="C1" t="inlineStr"><is><t>manage</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Something</t></is></c><c r="B2" t="inlineStr"><is><t>Some value</t></is></c><c r="C2" t="inlineStr"><is><t>x</t></is></c></row>
<row r="3"><c r="A3" t="inlineStr"><is><t>Skipped</t></is></c><c r="B3"><v>12</v></c></row>
</sheetData></worksheet>"#;

    #[test]
    fn xlsx_to_duckdb() {
        let workbook = build_xlsx(&[
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/worksheets/sheet1.xml", SHEET),
        ]);
        let config = ResourceConfig::new("some_data")
            .with_section("Some_data")
            .with_required_fields(&["value1", "value2"])
            .with_column_type("value2", ColumnType::Varchar);
        let mut resource = Resource::new(config);
        resource.set_input_handler(XlsxImporter::new());
        resource.set_db_handler(DuckDbHandler::new(DbCredentials::default()));

        resource.load_input_data(workbook).unwrap();
        resource.validate_data().unwrap();
        resource.connect_db().unwrap();
        resource.insert_data().unwrap();
        let loaded = resource.load_db_data().unwrap().clone();
        resource.close_db(true).unwrap();

        assert_eq!(loaded.row_count(), 1);
        assert_eq!(loaded.column("value1").unwrap().cells(), &[CellValue::text("Something")]);
        assert_eq!(loaded.column("value2").unwrap().cells(), &[CellValue::text("Some value")]);
        assert!(!loaded.has_column("manage"));
    }
}
