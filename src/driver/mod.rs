//! The capability surface a data-source driver presents to the sync engine.
//!
//! A driver adapts one kind of external source (a SQL database, a document
//! store) to the describe/sample operations the engine needs. Drivers own
//! their connections; the engine brackets each run with
//! [`Driver::begin_sync`] / [`Driver::end_sync`] and guarantees the release
//! call on every exit path.
//!
//! Optional operations are gated by [`Capability`] flags in
//! [`Driver::features`]; calling an unadvertised operation returns
//! [`DriverError::Unsupported`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{BaseType, Database, Field, Table};

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors from driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver does not advertise the capability behind this call.
    #[error("driver does not support {0}")]
    Unsupported(&'static str),

    /// Could not reach the external source.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The external source rejected or failed an operation.
    #[error("driver backend error: {0}")]
    Backend(String),
}

/// Optional driver features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `describe_table_fks` is implemented.
    ForeignKeys,
    /// `nested_field_types` is implemented for document columns.
    NestedFields,
    /// `table_rows` is implemented (metadata-table interpretation).
    MetadataRows,
}

/// Identity of a table as the driver reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdent {
    pub name: String,
    pub schema: Option<String>,
}

impl TableIdent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Result of describing a whole database: the set of tables it carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseDescription {
    pub tables: Vec<TableIdent>,
}

/// One column as the driver reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    pub base_type: BaseType,
    /// Whether this column is (part of) the primary key.
    #[serde(default)]
    pub pk: bool,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            name: name.into(),
            base_type,
            pk: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.pk = true;
        self
    }
}

/// Result of describing one table: its current columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDescription {
    pub fields: Vec<FieldDescription>,
}

/// One foreign key as the driver reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescription {
    /// Column of the described table that holds the reference.
    pub fk_column_name: String,
    /// Table the reference points into.
    pub dest_table: TableIdent,
    /// Column of `dest_table` the reference points at.
    pub dest_column_name: String,
}

/// A row of a driver-side metadata table, as loose JSON.
pub type MetadataRow = serde_json::Map<String, serde_json::Value>;

/// Adapter between the sync engine and one external data source.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Capabilities this driver advertises.
    fn features(&self) -> HashSet<Capability>;

    /// Whether a capability is advertised.
    fn has_feature(&self, capability: Capability) -> bool {
        self.features().contains(&capability)
    }

    /// Acquire whatever the driver needs for a sync run (connections,
    /// session settings). The engine pairs this with [`Self::end_sync`]
    /// on every exit path.
    async fn begin_sync(&self, _database: &Database) -> DriverResult<()> {
        Ok(())
    }

    /// Release resources acquired by [`Self::begin_sync`].
    async fn end_sync(&self, _database: &Database) -> DriverResult<()> {
        Ok(())
    }

    /// Enumerate the tables currently present in the source.
    async fn describe_database(&self, database: &Database)
        -> DriverResult<DatabaseDescription>;

    /// Enumerate the columns currently present in one table.
    async fn describe_table(
        &self,
        database: &Database,
        table: &Table,
    ) -> DriverResult<TableDescription>;

    /// Enumerate the foreign keys declared on one table.
    /// Requires [`Capability::ForeignKeys`].
    async fn describe_table_fks(
        &self,
        _database: &Database,
        _table: &Table,
    ) -> DriverResult<Vec<ForeignKeyDescription>> {
        Err(DriverError::Unsupported("foreign-keys"))
    }

    /// Fraction of sampled values of a field that are URLs, in `[0, 1]`.
    async fn field_percent_urls(&self, table: &Table, field: &Field) -> DriverResult<f64>;

    /// Average character length of sampled values of a field.
    async fn field_avg_length(&self, table: &Table, field: &Field) -> DriverResult<u64>;

    /// Up to `limit` sampled values of a field. `None` entries are rows
    /// where the column was null. Implementations may stream internally
    /// but must not return more than `limit` values.
    async fn field_sample_values(
        &self,
        table: &Table,
        field: &Field,
        limit: usize,
    ) -> DriverResult<Vec<Option<String>>>;

    /// Current subkey name → type map of a document column.
    /// Requires [`Capability::NestedFields`].
    async fn nested_field_types(
        &self,
        _table: &Table,
        _field: &Field,
    ) -> DriverResult<HashMap<String, BaseType>> {
        Err(DriverError::Unsupported("nested-fields"))
    }

    /// Rows of a named table, as loose JSON maps. Used only for the
    /// metadata side-table. Requires [`Capability::MetadataRows`].
    async fn table_rows(
        &self,
        _database: &Database,
        _table_name: &str,
    ) -> DriverResult<Vec<MetadataRow>> {
        Err(DriverError::Unsupported("metadata-rows"))
    }

    /// Driver-specific annotation hook, run before the generic
    /// classifiers. A returned patch is persisted and threaded into the
    /// rest of the pipeline.
    async fn sync_field_hook(
        &self,
        _table: &Table,
        _field: &Field,
    ) -> DriverResult<Option<crate::catalog::FieldPatch>> {
        Ok(None)
    }
}
