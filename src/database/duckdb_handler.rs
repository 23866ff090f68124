use crate::config::DbCredentials;
use crate::database::column::ColumnDefinition;
use crate::database::{check_identifier, quote_identifier, DatabaseError, DatabaseHandler};
use crate::error::SheetIngestError;
use crate::table::{CellValue, Column, Scalar, Table};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use duckdb::{params_from_iter, Connection};
use tracing::{debug, info, warn};

/// Stores resources as DuckDB tables, one table per resource.
///
/// `credentials.database` is the database file; without it an in-memory
/// database is used. Every connection runs inside one transaction that is
/// committed or rolled back by [`DatabaseHandler::close_db_connection`].
pub struct DuckDbHandler {
    credentials: DbCredentials,
    connection: Option<Connection>,
}

impl DuckDbHandler {
    pub fn new(credentials: DbCredentials) -> Self {
        DuckDbHandler {
            credentials,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> Result<&Connection, DatabaseError> {
        self.connection.as_ref().ok_or(DatabaseError::NotConnected)
    }

    /// Column names of an existing table in declaration order, empty when the
    /// table does not exist.
    fn table_columns(&self, resource_name: &str) -> Result<Vec<String>, SheetIngestError> {
        let connection = self.connection()?;
        let mut statement = connection.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE lower(table_name) = lower(?) ORDER BY ordinal_position",
        )?;
        let names = statement
            .query_map([resource_name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn create_table(&self, resource_name: &str, data: &Table) -> Result<(), SheetIngestError> {
        let definitions: Vec<String> = data
            .columns()
            .iter()
            .map(ColumnDefinition::infer)
            .map(|definition| format!("{} {}", quote_identifier(&definition.name), definition.kind.as_str()))
            .collect();
        let sql = format!("CREATE TABLE {} ({})", quote_identifier(resource_name), definitions.join(", "));
        debug!(%sql, "Creating table");
        self.connection()?.execute_batch(&sql)?;
        Ok(())
    }
}

impl DatabaseHandler for DuckDbHandler {
    fn set_credentials(&mut self, credentials: DbCredentials) {
        self.credentials = credentials;
    }

    fn connect_with_db(&mut self) -> Result<(), SheetIngestError> {
        if self.connection.is_some() {
            warn!("Already connected, reusing the open connection");
            return Ok(());
        }
        let connection = match &self.credentials.database {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        connection.execute_batch("BEGIN TRANSACTION")?;
        info!(database = self.credentials.database.as_deref().unwrap_or(":memory:"), "Connected");
        self.connection = Some(connection);
        Ok(())
    }

    fn close_db_connection(&mut self, rollback: bool) -> Result<(), SheetIngestError> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        connection.execute_batch(if rollback { "ROLLBACK" } else { "COMMIT" })?;
        connection.close().map_err(|(_, error)| error)?;
        info!(rollback, "Connection closed");
        Ok(())
    }

    fn insert_resource_data(&mut self, resource_name: &str, data: &Table) -> Result<usize, SheetIngestError> {
        check_identifier(resource_name)?;
        for name in data.column_names() {
            check_identifier(name)?;
        }
        if data.columns().is_empty() {
            return Ok(0);
        }

        let existing = self.table_columns(resource_name)?;
        if existing.is_empty() {
            self.create_table(resource_name, data)?;
        } else if let Some(missing) = data
            .column_names()
            .find(|name| !existing.iter().any(|column| column.eq_ignore_ascii_case(name)))
        {
            Err(DatabaseError::UnknownColumn {
                resource: resource_name.to_owned(),
                column: missing.to_owned(),
            })?
        }

        let names: Vec<String> = data.column_names().map(quote_identifier).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(resource_name),
            names.join(", "),
            placeholders
        );
        let mut statement = self.connection()?.prepare(&sql)?;
        for row in 0..data.row_count() {
            let values = data.columns().iter().map(|column| to_value(&column.cells()[row]));
            statement.execute(params_from_iter(values))?;
        }
        info!(resource = resource_name, rows = data.row_count(), "Inserted rows");
        Ok(data.row_count())
    }

    fn load_resource_data(&mut self, resource_name: &str, keys: &Table) -> Result<Table, SheetIngestError> {
        check_identifier(resource_name)?;
        let names = self.table_columns(resource_name)?;
        if names.is_empty() {
            Err(DatabaseError::UnknownResource(resource_name.to_owned()))?
        }
        for name in keys.column_names() {
            check_identifier(name)?;
            if !names.iter().any(|column| column.eq_ignore_ascii_case(name)) {
                Err(DatabaseError::UnknownColumn {
                    resource: resource_name.to_owned(),
                    column: name.to_owned(),
                })?
            }
        }

        let (filter, values) = key_filter(keys);
        let selected: Vec<String> = names.iter().map(|name| quote_identifier(name)).collect();
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY rowid",
            selected.join(", "),
            quote_identifier(resource_name),
            filter.map(|filter| format!(" WHERE {}", filter)).unwrap_or_default()
        );
        debug!(%sql, "Loading rows");

        let mut statement = self.connection()?.prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(values))?;
        let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
        while let Some(row) = rows.next()? {
            for (index, column) in cells.iter_mut().enumerate() {
                column.push(from_value(row.get::<_, Value>(index)?));
            }
        }

        let columns = names.into_iter().zip(cells).map(|(name, cells)| Column::new(name, cells)).collect();
        let table = Table::new(columns)?;
        info!(resource = resource_name, rows = table.row_count(), "Loaded rows");
        Ok(table)
    }
}

/// Builds `(a = ? AND b = ?) OR (...)` over the non-missing cells of every key
/// row. `None` selects everything: no key rows, or a key row without values.
fn key_filter(keys: &Table) -> (Option<String>, Vec<Value>) {
    let mut clauses = Vec::with_capacity(keys.row_count());
    let mut values = Vec::new();
    for row in 0..keys.row_count() {
        let conditions: Vec<String> = keys
            .columns()
            .iter()
            .filter(|column| !column.cells()[row].is_missing())
            .map(|column| {
                values.push(to_value(&column.cells()[row]));
                format!("{} = ?", quote_identifier(column.name()))
            })
            .collect();
        if conditions.is_empty() {
            return (None, Vec::new());
        }
        clauses.push(format!("({})", conditions.join(" AND ")));
    }
    if clauses.is_empty() {
        (None, values)
    } else {
        (Some(clauses.join(" OR ")), values)
    }
}

/// Converts a cell to a bound parameter. Dates and times are bound as ISO
/// text and cast by DuckDB to the column type.
fn to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty | CellValue::Null => Value::Null,
        CellValue::Text(value) => Value::Text(value.to_owned()),
        CellValue::Other(Scalar::Boolean(value)) => Value::Boolean(*value),
        CellValue::Other(Scalar::Integer(value)) => Value::BigInt(*value),
        CellValue::Other(Scalar::Double(value)) => Value::Double(*value),
        CellValue::Other(Scalar::Timestamp(value)) => {
            Value::Timestamp(TimeUnit::Microsecond, value.and_utc().timestamp_micros())
        }
        CellValue::Other(scalar) => Value::Text(scalar.to_string()),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value * 1_000_000,
        TimeUnit::Millisecond => value * 1_000,
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Converts a fetched value back to a cell.
fn from_value(value: Value) -> CellValue {
    let scalar = match value {
        Value::Null => return CellValue::Null,
        Value::Text(text) => return CellValue::text(text),
        Value::Boolean(value) => Scalar::Boolean(value),
        Value::TinyInt(value) => Scalar::Integer(value as i64),
        Value::SmallInt(value) => Scalar::Integer(value as i64),
        Value::Int(value) => Scalar::Integer(value as i64),
        Value::BigInt(value) => Scalar::Integer(value),
        Value::UTinyInt(value) => Scalar::Integer(value as i64),
        Value::USmallInt(value) => Scalar::Integer(value as i64),
        Value::UInt(value) => Scalar::Integer(value as i64),
        Value::Float(value) => Scalar::Double(value as f64),
        Value::Double(value) => Scalar::Double(value),
        Value::Timestamp(unit, value) => match DateTime::from_timestamp_micros(to_micros(unit, value)) {
            Some(datetime) => Scalar::Timestamp(datetime.naive_utc()),
            None => return CellValue::Null,
        },
        Value::Date32(days) => match NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(Duration::days(days as i64)))
        {
            Some(date) => Scalar::Date(date),
            None => return CellValue::Null,
        },
        Value::Time64(unit, value) => {
            let micros = to_micros(unit, value);
            match NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            ) {
                Some(time) => Scalar::Time(time),
                None => return CellValue::Null,
            }
        }
        other => return CellValue::text(format!("{:?}", other)),
    };
    CellValue::Other(scalar)
}
