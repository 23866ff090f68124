//! Resource and database configuration, loadable from JSON files or the
//! environment.
use crate::database::column::ColumnType;
use crate::error::{ResultMessage, SheetIngestError};
use crate::spreadsheet::Section;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Prefix of the environment variables read by [`DbCredentials::from_env`]
pub const DB_ENV_PREFIX: &str = "SHEET_INGEST_DB_";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing resource name")]
    MissingResourceName,

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnvironmentValue { name: String, value: String },
}

/// Everything a [`crate::resource::Resource`] needs to know about one resource.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourceConfig {
    /// Name of the database table the resource is stored in
    pub resource_name: String,
    /// Sheet to read: a name, or a zero-based position
    pub section: Section,
    /// Columns that must be present and filled in every row
    pub required_fields: Vec<String>,
    /// Columns forced to a type at import
    pub column_types: Option<HashMap<String, ColumnType>>,
}

impl ResourceConfig {
    pub fn new(resource_name: &str) -> Self {
        ResourceConfig {
            resource_name: resource_name.to_owned(),
            ..ResourceConfig::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<Section>) -> Self {
        self.section = section.into();
        self
    }

    pub fn with_required_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.required_fields = fields.iter().map(|field| field.as_ref().to_owned()).collect();
        self
    }

    pub fn with_column_type(mut self, column: &str, kind: ColumnType) -> Self {
        self.column_types
            .get_or_insert_with(HashMap::new)
            .insert(column.to_owned(), kind);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, SheetIngestError> {
        let config: ResourceConfig = serde_json::from_str(json)?;
        if config.resource_name.trim().is_empty() {
            Err(ConfigError::MissingResourceName)?
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetIngestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(SheetIngestError::from)
            .with_prefix(&path.display().to_string())?;
        Self::from_json(&json).with_prefix(&path.display().to_string())
    }
}

/// Connection settings handed to a [`crate::database::DatabaseHandler`].
/// Handlers use the fields that apply to them; DuckDB only reads `database`.
#[derive(Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DbCredentials {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl DbCredentials {
    pub fn from_json(json: &str) -> Result<Self, SheetIngestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetIngestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(SheetIngestError::from)
            .with_prefix(&path.display().to_string())?;
        Self::from_json(&json).with_prefix(&path.display().to_string())
    }

    /// Reads `SHEET_INGEST_DB_HOST`, `_PORT`, `_DATABASE`, `_USER` and `_PASSWORD`.
    pub fn from_env() -> Result<Self, SheetIngestError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SheetIngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(&format!("{DB_ENV_PREFIX}{key}")).filter(|value| !value.is_empty());
        let port = match read("PORT") {
            Some(value) => Some(value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvironmentValue {
                name: format!("{DB_ENV_PREFIX}PORT"),
                value,
            })?),
            None => None,
        };
        Ok(DbCredentials {
            host: read("HOST"),
            port,
            database: read("DATABASE"),
            user: read("USER"),
            password: read("PASSWORD"),
        })
    }
}
